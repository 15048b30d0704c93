//! Client for the remote entity-extraction service.
//!
//! The service receives one scanned document plus its document-type label and
//! answers with the fields it recognised. Its output is plaintext and is only
//! relayed back to the caller; nothing here touches the document store.

pub mod client;

pub use client::HttpExtractor;

use async_trait::async_trait;
use bytes::Bytes;
use common::{EntityRecord, ServiceError};
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

/// One uploaded file forwarded to the extraction service.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Errors from the extraction service call.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The request could not be sent or the response not received.
    #[error("extraction request failed: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("extraction service returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body is not the expected shape.
    #[error("invalid extraction response: {0}")]
    InvalidResponse(String),
}

impl From<ExtractionError> for ServiceError {
    fn from(err: ExtractionError) -> Self {
        ServiceError::Upstream(err.to_string())
    }
}

/// Extracts entity records from a scanned document.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Return the records found in `file`, labelled as `document_type`.
    async fn extract(
        &self,
        file: UploadedFile,
        document_type: &str,
    ) -> Result<Vec<EntityRecord>, ExtractionError>;
}
