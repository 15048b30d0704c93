//! Axum request handlers for all service endpoints.

use std::collections::HashMap;

use axum::{
    extract::{
        multipart::{Field, MultipartRejection},
        rejection::JsonRejection,
        Multipart, Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::{
    CreatedResponse, ErrorResponse, FetchRequest, HealthResponse, MessageResponse, PatchRequest,
    RecordsResponse,
};
use common::{EntityRecord, ServiceError};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::state::AppState;
use crate::extraction::UploadedFile;

const FILE_PART: &str = "file";
const DOCUMENT_TYPE_PART: &str = "document_type";
const ENTITIES_PART: &str = "entities";
const USER_ID_PART: &str = "user_id";
const CUST_ID_PART: &str = "cust_id";

/// A [`ServiceError`] rendered as a JSON [`ErrorResponse`].
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            warn!(code = self.0.code(), error = %self.0, "request failed");
        } else {
            debug!(code = self.0.code(), error = %self.0, "request rejected");
        }
        (status, Json(ErrorResponse::from(&self.0))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// `POST /api/details`: run each uploaded document through the extraction
/// service and return the concatenated records. Nothing is stored.
///
/// Every `file` part must be paired with one `document_type` part, in order.
pub async fn extract_details(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<RecordsResponse>> {
    let mut multipart = multipart.map_err(malformed)?;
    let mut files = Vec::new();
    let mut document_types = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            FILE_PART => files.push(uploaded_file(field).await?),
            DOCUMENT_TYPE_PART => document_types.push(field.text().await.map_err(malformed)?),
            _ => {}
        }
    }

    if files.is_empty() || files.len() != document_types.len() {
        return Err(ServiceError::Validation(
            "each uploaded file needs exactly one document_type".into(),
        )
        .into());
    }

    let mut data = Vec::new();
    for (file, document_type) in files.into_iter().zip(&document_types) {
        let records = state
            .extractor
            .extract(file, document_type)
            .await
            .map_err(ServiceError::from)?;
        data.extend(records.into_iter().map(Value::Object));
    }

    info!(files = document_types.len(), records = data.len(), "documents extracted");
    Ok(Json(RecordsResponse::success(data)))
}

/// `POST /api/saveDetails`: store a new customer document.
pub async fn save_details(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<CreatedResponse>> {
    let parts = text_parts(multipart).await?;
    let entities = parse_entities(parts.get(ENTITIES_PART))?;
    let user_id = part_str(&parts, USER_ID_PART);

    let created = state.customers.create(&entities, user_id).await?;
    Ok(Json(CreatedResponse::new(created.cust_id, created.name)))
}

/// `POST /api/saveDetailsExisting`: append records to an owned document.
pub async fn save_details_existing(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let parts = text_parts(multipart).await?;
    let entities = parse_entities(parts.get(ENTITIES_PART))?;
    let cust_id = part_str(&parts, CUST_ID_PART);
    let user_id = part_str(&parts, USER_ID_PART);

    state.customers.append(cust_id, user_id, &entities).await?;
    Ok(Json(MessageResponse::success("entities added to existing customer")))
}

/// `PATCH /api/customer/:cust_id`: edit the display name and/or fields of the
/// primary record.
pub async fn patch_customer(
    State(state): State<AppState>,
    Path(cust_id): Path<String>,
    body: Result<Json<PatchRequest>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Json(req) = body.map_err(malformed)?;
    state.customers.patch(&cust_id, req.into()).await?;
    Ok(Json(MessageResponse::success("customer updated")))
}

/// `POST /api/customerDetailsCustID`: return the decrypted records of an
/// owned document.
pub async fn customer_details(
    State(state): State<AppState>,
    body: Result<Json<FetchRequest>, JsonRejection>,
) -> ApiResult<Json<RecordsResponse>> {
    let Json(req) = body.map_err(malformed)?;
    let data = state
        .customers
        .fetch_by_customer(&req.cust_id, &req.user_id)
        .await?;
    Ok(Json(RecordsResponse::success(data)))
}

/// `GET /health`: liveness check.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        store_backend: state.customers.backend().into(),
    })
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

// ---------------------------------------------------------------------------
// Request parsing helpers
// ---------------------------------------------------------------------------

fn malformed(err: impl std::fmt::Display) -> ApiError {
    ApiError(ServiceError::Validation(format!("malformed request: {err}")))
}

/// Collect the text parts of a multipart form, keyed by part name.
///
/// A repeated part keeps its last value.
async fn text_parts(
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<HashMap<String, String>> {
    let mut multipart = multipart.map_err(malformed)?;
    let mut parts = HashMap::new();
    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        let text = field.text().await.map_err(malformed)?;
        parts.insert(name, text);
    }
    Ok(parts)
}

fn part_str<'a>(parts: &'a HashMap<String, String>, name: &str) -> &'a str {
    parts.get(name).map(String::as_str).unwrap_or_default()
}

/// Parse the `entities` part: a JSON array of field maps. A missing or blank
/// part is an empty list.
fn parse_entities(raw: Option<&String>) -> ApiResult<Vec<EntityRecord>> {
    match raw.map(|s| s.trim()) {
        None | Some("") => Ok(Vec::new()),
        Some(raw) => serde_json::from_str(raw).map_err(|_| {
            ApiError(ServiceError::Validation(
                "entities must be a JSON array of objects".into(),
            ))
        }),
    }
}

async fn uploaded_file(field: Field<'_>) -> ApiResult<UploadedFile> {
    let file_name = field.file_name().unwrap_or("upload").to_owned();
    let content_type = field.content_type().map(str::to_owned);
    let bytes = field.bytes().await.map_err(malformed)?;
    Ok(UploadedFile {
        file_name,
        content_type,
        bytes,
    })
}
