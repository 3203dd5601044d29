//! Rate limiting middleware using governor and `tower_governor`.
//!
//! - `auth_rate_limiter`: login and signup (~10/min per IP)
//! - `form_rate_limiter`: checkout and contact submissions (~30/min per IP)

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

// =============================================================================
// Client IP key extractor
// =============================================================================

/// Key extractor that trusts the usual proxy headers, then the socket peer.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

/// Single-address headers checked after `X-Forwarded-For`.
const FALLBACK_HEADERS: [&str; 2] = ["x-real-ip", "fly-client-ip"];

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let headers = req.headers();

        let header_ip = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
        };

        if let Some(ip) = header_ip("cf-connecting-ip") {
            return Ok(ip);
        }

        // First hop of X-Forwarded-For
        if let Some(ip) = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
        {
            return Ok(ip);
        }

        if let Some(ip) = FALLBACK_HEADERS.iter().find_map(|name| header_ip(name)) {
            return Ok(ip);
        }

        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

// =============================================================================
// Rate Limiter Configuration
// =============================================================================

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Rejected limiter parameters.
#[derive(Debug, thiserror::Error)]
#[error("invalid rate limiter configuration: replenish every {period_secs}s, burst {burst}")]
pub struct RateLimitConfigError {
    pub period_secs: u64,
    pub burst: u32,
}

fn limiter(period_secs: u64, burst: u32) -> Result<RateLimiterLayer, RateLimitConfigError> {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(period_secs)
        .burst_size(burst)
        .finish()
        .ok_or(RateLimitConfigError { period_secs, burst })?;
    Ok(GovernorLayer::new(Arc::new(config)))
}

/// Limiter for login and signup: one token every 6 seconds, burst of 5.
///
/// # Errors
///
/// Returns an error if governor rejects the parameters.
pub fn auth_rate_limiter() -> Result<RateLimiterLayer, RateLimitConfigError> {
    limiter(6, 5)
}

/// Limiter for order and contact submissions: one token every 2 seconds,
/// burst of 10.
///
/// # Errors
///
/// Returns an error if governor rejects the parameters.
pub fn form_rate_limiter() -> Result<RateLimiterLayer, RateLimitConfigError> {
    limiter(2, 10)
}
