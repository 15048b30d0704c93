//! Common error types shared across crates.

use thiserror::Error;

/// Top-level service error type.
///
/// Every customer-document operation fails with one of these variants. They map
/// to HTTP status codes returned to callers:
/// - [`ServiceError::EmptyInput`], [`ServiceError::Validation`] → 400
/// - [`ServiceError::NotFound`] → 404
/// - [`ServiceError::Encryption`], [`ServiceError::Decryption`],
///   [`ServiceError::Internal`] → 500
/// - [`ServiceError::Upstream`] → 502
/// - [`ServiceError::Unavailable`] → 503
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No entity records were supplied.
    #[error("no entity records supplied")]
    EmptyInput,

    /// A required identifier is missing or empty, or nothing updatable was supplied.
    #[error("validation failed: {0}")]
    Validation(String),

    /// No document matches the ownership filter.
    #[error("not found: {0}")]
    NotFound(String),

    /// Stored ciphertext is malformed or was produced under a different key.
    #[error("decryption failure: {0}")]
    Decryption(String),

    /// A field could not be encrypted.
    #[error("encryption failure: {0}")]
    Encryption(String),

    /// The extraction microservice failed or returned an unusable body.
    #[error("upstream failure: {0}")]
    Upstream(String),

    /// The document store is unreachable.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// An unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::EmptyInput | ServiceError::Validation(_) => 400,
            ServiceError::NotFound(_) => 404,
            ServiceError::Decryption(_)
            | ServiceError::Encryption(_)
            | ServiceError::Internal(_) => 500,
            ServiceError::Upstream(_) => 502,
            ServiceError::Unavailable(_) => 503,
        }
    }

    /// Short machine-readable code used in [`crate::protocol::ErrorResponse`].
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::EmptyInput => "empty_input",
            ServiceError::Validation(_) => "validation_error",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Decryption(_) => "decryption_failure",
            ServiceError::Encryption(_) => "encryption_failure",
            ServiceError::Upstream(_) => "upstream_failure",
            ServiceError::Unavailable(_) => "service_unavailable",
            ServiceError::Internal(_) => "internal_error",
        }
    }

    /// Message safe to expose to callers.
    ///
    /// Client errors carry their detail; server-side failures get a fixed,
    /// operation-neutral message so crypto and store internals never leak.
    pub fn public_message(&self) -> String {
        match self {
            ServiceError::EmptyInput
            | ServiceError::Validation(_)
            | ServiceError::NotFound(_) => self.to_string(),
            ServiceError::Decryption(_) | ServiceError::Encryption(_) => {
                "stored customer data could not be processed".into()
            }
            ServiceError::Upstream(_) => "document extraction failed".into(),
            ServiceError::Unavailable(_) => "document store unavailable".into(),
            ServiceError::Internal(_) => "an internal error occurred".into(),
        }
    }
}
