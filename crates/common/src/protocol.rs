//! Request and response types exchanged over the public HTTP API.
//!
//! Every response body carries a `status` discriminator: `"success"` on 2xx,
//! `"error"` otherwise.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One extracted document's field set, in insertion order.
///
/// Before storage every value is a plaintext scalar or null; once stored, every
/// non-null value is an `{iv, cipherText}` object.
pub type EntityRecord = Map<String, Value>;

/// Status value used by every successful response.
pub const STATUS_SUCCESS: &str = "success";

/// Status value used by every error response.
pub const STATUS_ERROR: &str = "error";

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Request body for `POST /api/customerDetailsCustID`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchRequest {
    #[serde(default)]
    pub cust_id: String,
    #[serde(default)]
    pub user_id: String,
}

/// Request body for `PATCH /api/customer/:cust_id`.
///
/// `entities` is a flat field map, not a list of records: each entry replaces
/// one field of the customer's primary record. `name` may be any JSON value;
/// it is stored in its string form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatchRequest {
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub entities: Option<Map<String, Value>>,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Response body for `POST /api/saveDetails`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub status: String,
    /// Generated customer identifier.
    pub cust_id: String,
    /// Display name taken from the first record.
    pub name: String,
}

impl CreatedResponse {
    pub fn new(cust_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            status: STATUS_SUCCESS.into(),
            cust_id: cust_id.into(),
            name: name.into(),
        }
    }
}

/// Generic acknowledgement for mutations that return no payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub status: String,
    pub message: String,
}

impl MessageResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_SUCCESS.into(),
            message: message.into(),
        }
    }
}

/// Response carrying a list of plaintext entity records.
///
/// Elements are normally record objects; stored elements that are not records
/// are returned as they are.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordsResponse {
    pub status: String,
    pub data: Vec<Value>,
}

impl RecordsResponse {
    pub fn success(data: Vec<Value>) -> Self {
        Self {
            status: STATUS_SUCCESS.into(),
            data,
        }
    }
}

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always `"error"`.
    pub status: String,
    /// Short machine-readable error code (e.g. `"not_found"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: STATUS_ERROR.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&crate::ServiceError> for ErrorResponse {
    fn from(err: &crate::ServiceError) -> Self {
        Self::new(err.code(), err.public_message())
    }
}

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status: `"ok"`.
    pub status: String,
    /// Which document-store backend is active (`"mongodb"` or `"memory"`).
    pub store_backend: String,
}
