//! Application state shared across handlers.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use moka::future::Cache;
use shopfront_core::section::SectionRegistry;

use crate::backend::{BackendClient, BackendError};
use crate::config::StorefrontConfig;
use crate::sections;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the backend client and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    backend: BackendClient,
    sections: SectionRegistry,
    /// Customers with an order submission in flight.
    pending_checkouts: Mutex<HashSet<String>>,
    /// Fingerprint of the last cart each customer ordered.
    placed_carts: Cache<String, String>,
}

/// How long a placed cart is remembered for duplicate detection.
const PLACED_CART_TTL: Duration = Duration::from_secs(60 * 60);

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend HTTP client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, BackendError> {
        let backend = BackendClient::new(&config.backend)?;
        let sections = sections::registry(&config.backend.asset_url);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                sections,
                pending_checkouts: Mutex::new(HashSet::new()),
                placed_carts: Cache::builder()
                    .max_capacity(10_000)
                    .time_to_live(PLACED_CART_TTL)
                    .build(),
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the commerce backend client.
    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    /// Get the section renderer registry.
    #[must_use]
    pub fn sections(&self) -> &SectionRegistry {
        &self.inner.sections
    }

    /// Mark a checkout for `customer_id` as in flight.
    ///
    /// Returns `None` when one is already running. The flag is released when
    /// the returned permit is dropped.
    #[must_use]
    pub fn begin_checkout(&self, customer_id: &str) -> Option<CheckoutPermit> {
        let mut pending = self
            .inner
            .pending_checkouts
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !pending.insert(customer_id.to_owned()) {
            return None;
        }
        Some(CheckoutPermit {
            state: Arc::clone(&self.inner),
            customer_id: customer_id.to_owned(),
        })
    }
}

/// Held while an order submission is in flight.
pub struct CheckoutPermit {
    state: Arc<AppStateInner>,
    customer_id: String,
}

impl CheckoutPermit {
    /// Whether this customer already ordered the cart with `fingerprint`.
    ///
    /// A request that read the session before an earlier submission cleared
    /// the cart still carries that cart; this catches it.
    pub async fn already_placed(&self, fingerprint: &str) -> bool {
        self.state
            .placed_carts
            .get(&self.customer_id)
            .await
            .is_some_and(|placed| placed == fingerprint)
    }

    /// Remember that the cart with `fingerprint` was ordered.
    pub async fn record_placed(&self, fingerprint: String) {
        self.state
            .placed_carts
            .insert(self.customer_id.clone(), fingerprint)
            .await;
    }
}

impl Drop for CheckoutPermit {
    fn drop(&mut self) {
        self.state
            .pending_checkouts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.customer_id);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::config::BackendConfig;

    fn state() -> AppState {
        AppState::new(StorefrontConfig {
            database_url: None,
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            session_secret: SecretString::from("k".repeat(32)),
            backend: BackendConfig::new("http://localhost:9").unwrap(),
            sentry_dsn: None,
            sentry_environment: None,
        })
        .unwrap()
    }

    #[test]
    fn test_checkout_permit_blocks_second_submission() {
        let state = state();
        let permit = state.begin_checkout("c1").unwrap();
        assert!(state.begin_checkout("c1").is_none());
        // Other customers are unaffected.
        assert!(state.begin_checkout("c2").is_some());

        drop(permit);
        assert!(state.begin_checkout("c1").is_some());
    }

    #[tokio::test]
    async fn test_placed_cart_is_remembered_across_permits() {
        let state = state();
        let permit = state.begin_checkout("c1").unwrap();
        assert!(!permit.already_placed("p1x1@1").await);
        permit.record_placed("p1x1@1".to_owned()).await;
        drop(permit);

        let permit = state.begin_checkout("c1").unwrap();
        assert!(permit.already_placed("p1x1@1").await);
        assert!(!permit.already_placed("p1x1@2").await);
        drop(permit);

        // Scoped to the customer.
        assert!(!state.begin_checkout("c2").unwrap().already_placed("p1x1@1").await);
    }

    #[test]
    fn test_registry_is_populated() {
        let state = state();
        assert!(state.sections().contains("hero-default"));
        assert!(state.sections().contains("product-grid"));
    }
}
