//! Shopfront storefront library.
//!
//! This crate provides the storefront functionality as a library,
//! allowing it to be tested and reused.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod sections;
pub mod session_storage;
pub mod state;

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use axum::middleware::{from_fn, from_fn_with_state};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tower_sessions::{SessionManagerLayer, SessionStore};
use tracing::{field, info_span};

use crate::middleware::{
    RateLimitConfigError, SecurityPolicy, csp_nonce_middleware, request_id_middleware,
    security_headers_middleware,
};
use crate::state::AppState;

/// Directory served under `/static`.
pub const STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static");

/// Build the storefront application.
///
/// Layers run outermost first: Sentry, tracing, request id, CSP nonce,
/// security headers, then the session layer around the routes.
///
/// # Errors
///
/// Returns an error if a rate limiter cannot be configured.
pub fn app<S>(state: AppState, session_layer: SessionManagerLayer<S>) -> Result<Router, RateLimitConfigError>
where
    S: SessionStore + Clone,
{
    let policy = SecurityPolicy::new(&state.config().backend.asset_url);

    Ok(routes::routes()?
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .layer(session_layer)
        .with_state(state)
        .layer(from_fn_with_state(policy, security_headers_middleware))
        .layer(from_fn(csp_nonce_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = field::Empty,
                store_id = field::Empty,
            )
        }))
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction()))
}
