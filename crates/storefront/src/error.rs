//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`.
//!
//! Store resolution failures render a full-screen page with a way to retry;
//! everything else renders a short error page with the status code.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

use shopfront_core::storage::StorageError;
use shopfront_core::store::ResolveError;

use crate::backend::BackendError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Commerce backend call failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// The request's domain could not be mapped to a store.
    #[error("Store resolution failed: {0}")]
    Store(#[from] ResolveError),

    /// The store's layout could not be loaded.
    #[error("Theme unavailable: {0}")]
    Theme(String),

    /// Session store failure.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Client storage rejected a write.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Template rendering failed.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Full-screen page for an unrecognized or unreachable store.
#[derive(Template)]
#[template(path = "errors/store.html")]
pub struct StoreErrorTemplate<'a> {
    pub title: &'a str,
    pub message: &'a str,
}

/// Generic error page.
#[derive(Template)]
#[template(path = "errors/status.html")]
pub struct StatusErrorTemplate<'a> {
    pub status: u16,
    pub title: &'a str,
    pub message: &'a str,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Backend(BackendError::NotFound(_)) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Backend(_) => StatusCode::BAD_GATEWAY,
            Self::Store(ResolveError::MissingHost) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Store(ResolveError::UnknownDomain { .. }) => StatusCode::NOT_FOUND,
            Self::Store(ResolveError::Lookup(_)) | Self::Theme(_) => StatusCode::BAD_GATEWAY,
            Self::Session(_) | Self::Storage(_) | Self::Template(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn is_server_fault(&self) -> bool {
        matches!(
            self,
            Self::Session(_) | Self::Storage(_) | Self::Template(_) | Self::Internal(_)
        ) || matches!(self, Self::Backend(e) if !matches!(e, BackendError::NotFound(_)))
            || matches!(self, Self::Store(ResolveError::Lookup(_)) | Self::Theme(_))
    }

    fn render(&self, status: StatusCode) -> std::result::Result<String, askama::Error> {
        match self {
            Self::Store(ResolveError::UnknownDomain { domain }) => StoreErrorTemplate {
                title: "Store not found",
                message: &format!("The domain {domain} is not connected to any store."),
            }
            .render(),
            Self::Store(ResolveError::MissingHost) => StoreErrorTemplate {
                title: "Store not found",
                message: "This request did not name a store domain.",
            }
            .render(),
            Self::Store(ResolveError::Lookup(_)) => StoreErrorTemplate {
                title: "Store unavailable",
                message: "We could not load this store right now.",
            }
            .render(),
            Self::Theme(_) => StoreErrorTemplate {
                title: "Store layout unavailable",
                message: "We could not load this store's layout right now.",
            }
            .render(),
            _ => {
                // Don't expose internal error details to clients
                let message = match self {
                    Self::NotFound(what) => format!("We couldn't find {what}."),
                    Self::Backend(BackendError::NotFound(_)) => "We couldn't find that page.".to_owned(),
                    Self::BadRequest(msg) => msg.clone(),
                    Self::Backend(_) => "External service error".to_owned(),
                    _ => "Internal server error".to_owned(),
                };
                StatusErrorTemplate {
                    status: status.as_u16(),
                    title: status.canonical_reason().unwrap_or("Error"),
                    message: &message,
                }
                .render()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_fault() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        let status = self.status();
        match self.render(status) {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                tracing::error!(error = %e, "failed to render error page");
                (status, status.canonical_reason().unwrap_or("Error")).into_response()
            }
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for a signed-in customer.
pub fn set_sentry_user(customer_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(customer_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for customer actions.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
