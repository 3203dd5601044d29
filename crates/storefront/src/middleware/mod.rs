//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. CSP nonce (generate per-request nonce for inline scripts)
//! 5. Security headers (CSP, frame, referrer, isolation)
//! 6. Session layer (tower-sessions, `PostgreSQL` or memory store)
//! 7. Rate limiting on form posts (governor)
//!
//! [`StoreScope`] is an extractor rather than a layer so that health checks
//! and static files never touch the backend.

pub mod csp;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;
pub mod store;

pub use csp::{CspNonce, csp_nonce_middleware};
pub use rate_limit::{RateLimitConfigError, auth_rate_limiter, form_rate_limiter};
pub use request_id::request_id_middleware;
pub use security_headers::{SecurityPolicy, security_headers_middleware};
pub use session::create_session_layer;
pub use store::{StoreScope, request_host};
