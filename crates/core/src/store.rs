//! Store resolution: which tenant does this hostname belong to?
//!
//! Resolution is cached per client under `storeId`/`storeDomain`. The cache
//! is only trusted when the cached domain equals the normalized domain of
//! the current request; anything else is discarded and looked up again.
//! Lookup failures are surfaced as-is. There is no fallback store.

use std::future::Future;

use tracing::{debug, instrument, warn};

use crate::storage::{ClientStorage, keys};
use crate::types::StoreId;

/// Errors produced while resolving a domain to a store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// The request carried no usable hostname.
    #[error("no hostname on request")]
    MissingHost,

    /// The backend does not know this domain.
    #[error("domain {domain} is not connected to a store")]
    UnknownDomain {
        /// Normalized domain that was looked up.
        domain: String,
    },

    /// The lookup itself failed (network, decode, 5xx).
    #[error("failed to fetch store information: {0}")]
    Lookup(String),
}

/// Resolution outcome published to the rest of the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreContext {
    /// Resolved store, if any.
    pub store_id: Option<StoreId>,
    /// Normalized domain the request was made against.
    pub domain: String,
    /// True only before resolution has run.
    pub is_loading: bool,
    /// Why resolution failed, if it did.
    pub error: Option<ResolveError>,
}

impl StoreContext {
    /// Initial state for a domain that has not been resolved yet.
    #[must_use]
    pub fn loading(domain: impl Into<String>) -> Self {
        Self {
            store_id: None,
            domain: domain.into(),
            is_loading: true,
            error: None,
        }
    }

    fn resolved(domain: String, store_id: StoreId) -> Self {
        Self {
            store_id: Some(store_id),
            domain,
            is_loading: false,
            error: None,
        }
    }

    fn failed(domain: String, error: &ResolveError) -> Self {
        Self {
            store_id: None,
            domain,
            is_loading: false,
            error: Some(error.clone()),
        }
    }

    /// The store id, or the error that should be shown instead.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when resolution failed or never produced an id.
    pub fn require(&self) -> Result<&StoreId, ResolveError> {
        self.store_id.as_ref().ok_or_else(|| {
            self.error.clone().unwrap_or_else(|| ResolveError::UnknownDomain {
                domain: self.domain.clone(),
            })
        })
    }
}

/// Domain → store lookup, implemented by the backend client.
pub trait StoreDirectory {
    /// Look up the store connected to `domain`.
    fn lookup_store(&self, domain: &str) -> impl Future<Output = Result<StoreId, ResolveError>> + Send;
}

/// Normalize a raw `Host` header value.
///
/// Lowercases, drops any port and trailing dot, and strips one leading
/// `www.` so `www.shop.com:443` and `shop.com` resolve identically.
#[must_use]
pub fn normalize_domain(host: &str) -> String {
    let host = host.trim().to_ascii_lowercase();

    let without_port = if let Some(rest) = host.strip_prefix('[') {
        // IPv6 literal: keep the bracketed address, drop the port.
        rest.split_once(']')
            .map_or(host.as_str(), |(addr, _)| addr)
            .to_owned()
    } else {
        host.rsplit_once(':')
            .filter(|(_, port)| port.chars().all(|c| c.is_ascii_digit()))
            .map_or(host.as_str(), |(name, _)| name)
            .to_owned()
    };

    let trimmed = without_port.trim_end_matches('.');
    trimmed.strip_prefix("www.").unwrap_or(trimmed).to_owned()
}

/// Resolve the store for `host`, consulting and updating the client cache.
#[instrument(skip(storage, directory))]
pub async fn resolve_store<S, D>(storage: &mut S, directory: &D, host: &str) -> StoreContext
where
    S: ClientStorage + ?Sized,
    D: StoreDirectory + Sync,
{
    let domain = normalize_domain(host);
    if domain.is_empty() {
        return StoreContext::failed(domain, &ResolveError::MissingHost);
    }

    let cached_id = storage.get_item(keys::STORE_ID);
    let cached_domain = storage.get_item(keys::STORE_DOMAIN);

    if let Some(id) = cached_id.filter(|id| !id.is_empty())
        && cached_domain.as_deref() == Some(domain.as_str())
    {
        debug!(store_id = %id, "store resolved from client cache");
        return StoreContext::resolved(domain, StoreId::new(id));
    }

    forget_resolution(storage);

    match directory.lookup_store(&domain).await {
        Ok(store_id) => {
            if let Err(e) = storage.set_item(keys::STORE_ID, store_id.to_string()) {
                warn!(error = %e, "failed to cache store id");
            }
            if let Err(e) = storage.set_item(keys::STORE_DOMAIN, domain.clone()) {
                warn!(error = %e, "failed to cache store domain");
            }
            debug!(store_id = %store_id, "store resolved from backend");
            StoreContext::resolved(domain, store_id)
        }
        Err(e) => {
            warn!(error = %e, "store resolution failed");
            StoreContext::failed(domain, &e)
        }
    }
}

/// Drop the cached resolution so the next request looks the domain up again.
pub fn forget_resolution<S: ClientStorage + ?Sized>(storage: &mut S) {
    storage.remove_item(keys::STORE_ID);
    storage.remove_item(keys::STORE_DOMAIN);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::storage::MemoryStorage;

    struct FakeDirectory {
        answer: Result<StoreId, ResolveError>,
        calls: AtomicUsize,
    }

    impl FakeDirectory {
        fn ok(id: &str) -> Self {
            Self {
                answer: Ok(StoreId::new(id)),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(err: ResolveError) -> Self {
            Self {
                answer: Err(err),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl StoreDirectory for FakeDirectory {
        async fn lookup_store(&self, _domain: &str) -> Result<StoreId, ResolveError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.clone()
        }
    }

    fn cached(id: &str, domain: &str) -> MemoryStorage {
        let mut storage = MemoryStorage::new();
        storage.set_item(keys::STORE_ID, id.into()).unwrap();
        storage.set_item(keys::STORE_DOMAIN, domain.into()).unwrap();
        storage
    }

    #[test]
    fn test_normalize_domain() {
        assert_eq!(normalize_domain("www.shop.com"), "shop.com");
        assert_eq!(normalize_domain("WWW.Shop.COM:8080"), "shop.com");
        assert_eq!(normalize_domain("shop.com."), "shop.com");
        assert_eq!(normalize_domain("wwwshop.com"), "wwwshop.com");
        assert_eq!(normalize_domain("[::1]:3000"), "::1");
        assert_eq!(normalize_domain("  "), "");
    }

    #[tokio::test]
    async fn test_cache_hit_skips_lookup() {
        let mut storage = cached("A", "shop.com");
        let directory = FakeDirectory::ok("B");

        let ctx = resolve_store(&mut storage, &directory, "www.shop.com").await;

        assert_eq!(ctx.store_id, Some(StoreId::new("A")));
        assert_eq!(ctx.domain, "shop.com");
        assert!(!ctx.is_loading);
        assert_eq!(directory.calls(), 0);
    }

    #[tokio::test]
    async fn test_domain_change_invalidates_cache() {
        let mut storage = cached("A", "old.com");
        let directory = FakeDirectory::ok("B");

        let ctx = resolve_store(&mut storage, &directory, "new.com").await;

        assert_eq!(ctx.store_id, Some(StoreId::new("B")));
        assert_eq!(directory.calls(), 1);
        assert_eq!(storage.get_item(keys::STORE_ID).as_deref(), Some("B"));
        assert_eq!(storage.get_item(keys::STORE_DOMAIN).as_deref(), Some("new.com"));
    }

    #[tokio::test]
    async fn test_lookup_failure_publishes_error_and_clears_cache() {
        let mut storage = cached("A", "old.com");
        let directory = FakeDirectory::failing(ResolveError::UnknownDomain {
            domain: "new.com".into(),
        });

        let ctx = resolve_store(&mut storage, &directory, "new.com").await;

        assert!(ctx.store_id.is_none());
        assert_eq!(
            ctx.require(),
            Err(ResolveError::UnknownDomain {
                domain: "new.com".into()
            })
        );
        assert!(storage.get_item(keys::STORE_ID).is_none());
        assert!(storage.get_item(keys::STORE_DOMAIN).is_none());
    }

    #[tokio::test]
    async fn test_network_failure_stays_a_lookup_error() {
        let mut storage = MemoryStorage::new();
        let directory = FakeDirectory::failing(ResolveError::Lookup("timeout".into()));

        let ctx = resolve_store(&mut storage, &directory, "shop.com").await;

        assert_eq!(ctx.require(), Err(ResolveError::Lookup("timeout".into())));
    }

    #[tokio::test]
    async fn test_refresh_forces_new_lookup() {
        let mut storage = cached("A", "shop.com");
        let directory = FakeDirectory::ok("A2");

        forget_resolution(&mut storage);
        let ctx = resolve_store(&mut storage, &directory, "shop.com").await;

        assert_eq!(ctx.store_id, Some(StoreId::new("A2")));
        assert_eq!(directory.calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_host() {
        let mut storage = MemoryStorage::new();
        let directory = FakeDirectory::ok("A");

        let ctx = resolve_store(&mut storage, &directory, "").await;

        assert_eq!(ctx.require(), Err(ResolveError::MissingHost));
        assert_eq!(directory.calls(), 0);
    }
}
