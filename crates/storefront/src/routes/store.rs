//! Store-level routes: resolver reset, footer store details and health.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use shopfront_core::StoreId;
use shopfront_core::storage::{ClientStorage, keys};
use shopfront_core::store::forget_resolution;

use crate::error::Result;
use crate::middleware::StoreScope;
use crate::routes::contact::StoreContact;
use crate::session_storage::SessionStorage;
use crate::state::AppState;

/// Forget the cached store for this visitor and start over.
///
/// Takes the bare storage rather than a [`StoreScope`] so it still works
/// from the store error page, where resolution has failed.
#[instrument(skip_all)]
pub async fn refresh(State(state): State<AppState>, mut storage: SessionStorage) -> Result<Response> {
    if let Some(store_id) = storage.get_item(keys::STORE_ID).filter(|id| !id.is_empty()) {
        state.backend().invalidate_store(&StoreId::new(store_id.as_str())).await;
        info!(store_id = %store_id, "store cache cleared on request");
    }
    forget_resolution(&mut storage);
    storage.save().await?;

    Ok(Redirect::to("/").into_response())
}

/// Query of the footer store fragment.
#[derive(Debug, Default, Deserialize)]
pub struct StoreContactQuery {
    /// `1` to include email, phone and address.
    #[serde(default)]
    pub contact: Option<String>,
}

impl StoreContactQuery {
    #[must_use]
    pub fn wants_contact(&self) -> bool {
        matches!(self.contact.as_deref(), Some("1" | "true"))
    }
}

/// Footer store details fragment (HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "fragments/store_contact.html")]
pub struct StoreContactTemplate {
    pub store_name: String,
    pub contact: Option<StoreContact>,
}

/// Store name and, on request, contact details for the footer.
#[instrument(skip_all, fields(store_id = %scope.store_id))]
pub async fn contact_fragment(
    State(state): State<AppState>,
    scope: StoreScope,
    Query(query): Query<StoreContactQuery>,
) -> Result<Response> {
    let preference = state.backend().store_preference(&scope.store_id).await;
    scope.save().await?;

    let template = match preference {
        Ok(preference) => StoreContactTemplate {
            store_name: preference.store_name.clone().unwrap_or_default(),
            contact: query.wants_contact().then(|| StoreContact::new(&preference)),
        },
        Err(e) => {
            warn!(error = %e, "store preference unavailable for footer");
            StoreContactTemplate {
                store_name: String::new(),
                contact: None,
            }
        }
    };
    Ok(template.into_response())
}

/// Liveness check. Does not touch the backend.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness check: the commerce backend must answer.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.backend().countries().await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wants_contact() {
        let query = |v: Option<&str>| StoreContactQuery {
            contact: v.map(str::to_owned),
        };
        assert!(query(Some("1")).wants_contact());
        assert!(query(Some("true")).wants_contact());
        assert!(!query(Some("0")).wants_contact());
        assert!(!query(None).wants_contact());
    }
}
