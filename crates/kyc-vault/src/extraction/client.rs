//! [`HttpExtractor`]: multipart HTTP client for the extraction service.

use async_trait::async_trait;
use common::EntityRecord;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::debug;

use super::{ExtractionError, Extractor, UploadedFile};

/// Path of the upload endpoint on the extraction service.
const UPLOAD_PATH: &str = "/uploadDetails";

/// Response member holding the extracted records.
const ENTITIES_FIELD: &str = "extracted_entities";

/// Extraction client backed by a pooled `reqwest` client.
#[derive(Clone, Debug)]
pub struct HttpExtractor {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpExtractor {
    /// Create a client for the service at `base_url` (e.g. `http://localhost:5000`).
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::Transport`] if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, ExtractionError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("kyc-vault/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ExtractionError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{}{UPLOAD_PATH}", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl Extractor for HttpExtractor {
    async fn extract(
        &self,
        file: UploadedFile,
        document_type: &str,
    ) -> Result<Vec<EntityRecord>, ExtractionError> {
        let size = file.bytes.len();
        let mut part = Part::bytes(file.bytes.to_vec()).file_name(file.file_name);
        if let Some(content_type) = file.content_type.as_deref() {
            part = part
                .mime_str(content_type)
                .map_err(|e| ExtractionError::Transport(e.to_string()))?;
        }
        let form = Form::new()
            .part("file", part)
            .text("document_type", document_type.to_owned());

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ExtractionError::Transport(e.to_string()))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| ExtractionError::InvalidResponse(e.to_string()))?;

        if !status.is_success() {
            let message = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("no error message")
                .to_owned();
            return Err(ExtractionError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let records = parse_extracted(body)?;
        debug!(document_type, bytes = size, records = records.len(), "document extracted");
        Ok(records)
    }
}

/// Pull the `extracted_entities` list out of a success body.
fn parse_extracted(mut body: Value) -> Result<Vec<EntityRecord>, ExtractionError> {
    let Some(Value::Array(items)) = body.get_mut(ENTITIES_FIELD).map(Value::take) else {
        return Err(ExtractionError::InvalidResponse(format!(
            "missing `{ENTITIES_FIELD}` list"
        )));
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(record) => Ok(record),
            _ => Err(ExtractionError::InvalidResponse(
                "extracted entity is not an object".into(),
            )),
        })
        .collect()
}
