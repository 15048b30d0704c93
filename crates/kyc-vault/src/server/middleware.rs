//! Axum middleware layers applied to the router.
//!
//! Includes request tracing, timeout enforcement, body limits and response
//! compression.

use std::time::Duration;

/// Default per-request timeout applied to all routes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default cap on request bodies, sized for scanned document uploads.
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Tunables for the middleware stack.
#[derive(Debug, Clone, Copy)]
pub struct ServerSettings {
    pub request_timeout: Duration,
    pub max_body_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            request_timeout: REQUEST_TIMEOUT,
            max_body_bytes: MAX_UPLOAD_BYTES,
        }
    }
}
