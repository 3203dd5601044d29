//! Security headers middleware for XSS, clickjacking, and isolation protection.
//!
//! Adds restrictive security headers to all responses. Start locked down and
//! loosen only when specific functionality requires it: product and theme
//! images come from the backend's asset host, and HTMX is loaded from unpkg.

use axum::{
    extract::{Request, State},
    http::{
        HeaderName, HeaderValue,
        header::{
            CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};
use url::Url;

use super::csp::CspNonce;

/// Origin HTMX is served from.
pub const SCRIPT_CDN: &str = "https://unpkg.com";

/// Per-deployment CSP inputs.
#[derive(Debug, Clone)]
pub struct SecurityPolicy {
    image_origin: String,
}

impl SecurityPolicy {
    /// Policy allowing images from the origin of `asset_url`.
    ///
    /// An unparsable URL falls back to same-origin images only.
    #[must_use]
    pub fn new(asset_url: &str) -> Self {
        let image_origin = Url::parse(asset_url)
            .ok()
            .map(|url| url.origin().ascii_serialization())
            .filter(|origin| origin != "null")
            .unwrap_or_default();
        Self { image_origin }
    }

    /// The `Content-Security-Policy` value for a request with `nonce`.
    #[must_use]
    pub fn content_security_policy(&self, nonce: &str) -> String {
        let nonce_source = if nonce.is_empty() {
            String::new()
        } else {
            format!(" 'nonce-{nonce}'")
        };
        let image_source = if self.image_origin.is_empty() {
            String::new()
        } else {
            format!(" {}", self.image_origin)
        };

        format!(
            "default-src 'none'; \
             script-src 'self' {SCRIPT_CDN}{nonce_source}; \
             style-src 'self'; \
             font-src 'self'; \
             img-src 'self' data:{image_source}; \
             connect-src 'self'; \
             frame-src 'none'; \
             object-src 'none'; \
             base-uri 'self'; \
             form-action 'self'; \
             frame-ancestors 'none'"
        )
    }
}

/// Add security headers to all responses.
///
/// Headers applied:
/// - `X-Frame-Options: DENY` - Prevent clickjacking
/// - `X-Content-Type-Options: nosniff` - Prevent MIME sniffing
/// - `Referrer-Policy: no-referrer` - Zero referrer leakage
/// - `Content-Security-Policy` - see [`SecurityPolicy::content_security_policy`]
/// - `Permissions-Policy` - Deny sensitive features
/// - `Cache-Control: no-store, max-age=0` - Prevent caching per-visitor pages
/// - `Cross-Origin-Opener-Policy: same-origin` - Process isolation
/// - `Cross-Origin-Embedder-Policy: credentialless` - Isolation that still
///   admits asset-host images without CORP headers
/// - `X-DNS-Prefetch-Control: off` - Prevent DNS prefetch leakage
///
/// Must run inside `csp_nonce_middleware` so the nonce is in the request
/// extensions.
pub async fn security_headers_middleware(
    State(policy): State<SecurityPolicy>,
    request: Request,
    next: Next,
) -> Response {
    let nonce = request
        .extensions()
        .get::<CspNonce>()
        .map(|n| n.value().to_owned())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(REFERRER_POLICY, HeaderValue::from_static("no-referrer"));

    match HeaderValue::from_str(&policy.content_security_policy(&nonce)) {
        Ok(value) => {
            headers.insert(CONTENT_SECURITY_POLICY, value);
        }
        Err(e) => tracing::error!(error = %e, "invalid CSP header value"),
    }

    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static(
            "accelerometer=(), \
             camera=(), \
             display-capture=(), \
             geolocation=(), \
             gyroscope=(), \
             magnetometer=(), \
             microphone=(), \
             payment=(), \
             usb=()",
        ),
    );

    headers.insert(
        HeaderName::from_static("cache-control"),
        HeaderValue::from_static("no-store, max-age=0"),
    );

    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin"),
    );

    headers.insert(
        HeaderName::from_static("cross-origin-embedder-policy"),
        HeaderValue::from_static("credentialless"),
    );

    headers.insert(
        HeaderName::from_static("x-dns-prefetch-control"),
        HeaderValue::from_static("off"),
    );

    response
}
