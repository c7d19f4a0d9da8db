//! Rate limiting configuration for the Switchyard API.
//!
//! Requests are bucketed by the session cookie they carry, so each signed-in
//! user gets their own allowance. The cookie is hashed before it is used as a
//! key so that session material never sits in the limiter's map.
//!
//! Buckets are not checked against the cookie signature: a forged cookie only
//! buys its sender a fresh bucket, and the request is still rejected by the
//! session extractor.

use std::sync::Arc;

use axum::body::Body;
use governor::{clock::QuantaInstant, middleware::NoOpMiddleware};
use http::Request;
use tap::Pipe;
use tower_governor::{
    GovernorLayer, errors::GovernorError, governor::GovernorConfigBuilder,
    key_extractor::KeyExtractor,
};

use crate::cookies::{SessionCookie, request_cookies};

/// Key extractor that uses the session cookie.
///
/// Falls back to a constant "anonymous" key if no session cookie is present,
/// which creates a shared rate limit bucket for all unauthenticated requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionKeyExtractor {
    /// Number of characters to use from the hash prefix for bucketing.
    prefix_length: usize,
}

impl SessionKeyExtractor {
    pub const fn new(prefix_length: usize) -> Self {
        Self { prefix_length }
    }
}

impl Default for SessionKeyExtractor {
    fn default() -> Self {
        Self::new(16)
    }
}

impl KeyExtractor for SessionKeyExtractor {
    type Key = String;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        request_cookies(req.headers())
            .find(|cookie| cookie.name() == SessionCookie::NAME)
            .map(|cookie| {
                let hash = blake3::hash(cookie.value().as_bytes());
                let encoded = hex::encode(hash.as_bytes());
                let prefix = &encoded[..self.prefix_length.min(encoded.len())];
                format!("session:{prefix}")
            })
            .unwrap_or_else(|| String::from("anonymous"))
            .pipe(Ok)
    }
}

/// The default rate limiter layer is really just for protecting the API from
/// outright abuse or DOS attacks.
pub fn standard() -> GovernorLayer<SessionKeyExtractor, NoOpMiddleware<QuantaInstant>, Body> {
    GovernorConfigBuilder::default()
        .per_millisecond(1)
        .burst_size(1000)
        .key_extractor(SessionKeyExtractor::default())
        .finish()
        .expect("valid governor config")
        .pipe(Arc::new)
        .pipe(GovernorLayer::new)
}
