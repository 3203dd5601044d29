//! Store scope extractor.
//!
//! Every storefront page belongs to the store connected to the request's
//! domain. [`StoreScope`] loads the visitor's client storage, resolves the
//! store (cached per visitor, checked against the current domain) and hands
//! both to the handler. Resolution failures reject the request with the
//! full-screen store error page.

use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header, request::Parts};
use tracing::Span;

use shopfront_core::StoreId;
use shopfront_core::store::resolve_store;

use crate::error::AppError;
use crate::session_storage::SessionStorage;
use crate::state::AppState;

/// Header set by reverse proxies carrying the original host.
pub const FORWARDED_HOST: &str = "x-forwarded-host";

/// Resolved store plus the visitor's storage snapshot.
#[derive(Debug)]
pub struct StoreScope {
    pub store_id: StoreId,
    /// Normalized domain the store was resolved for.
    pub domain: String,
    pub storage: SessionStorage,
}

impl StoreScope {
    /// Persist storage changes made during the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store rejects the write.
    pub async fn save(self) -> Result<(), AppError> {
        Ok(self.storage.save().await?)
    }
}

/// Hostname the visitor used: `X-Forwarded-Host` first, then `Host`.
#[must_use]
pub fn request_host(headers: &HeaderMap) -> String {
    [FORWARDED_HOST, header::HOST.as_str()]
        .iter()
        .find_map(|name| {
            headers
                .get(*name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        })
        .unwrap_or_default()
        .to_owned()
}

impl FromRequestParts<AppState> for StoreScope {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let host = request_host(&parts.headers);
        let mut storage = SessionStorage::from_request_parts(parts, state).await?;

        let context = resolve_store(&mut storage, state.backend(), &host).await;
        let store_id = match context.require() {
            Ok(id) => id.clone(),
            Err(e) => {
                // Persist the cleared cache so the next request looks up again.
                storage.save().await?;
                return Err(e.into());
            }
        };

        Span::current().record("store_id", store_id.as_str());
        sentry::configure_scope(|scope| scope.set_tag("store_id", store_id.as_str()));

        Ok(Self {
            store_id,
            domain: context.domain,
            storage,
        })
    }
}
