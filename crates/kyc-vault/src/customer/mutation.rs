//! Write paths: create, append and patch.

use common::{protocol::PatchRequest, EntityRecord, ServiceError};
use serde_json::{Map, Value};
use tracing::{info, warn};
use uuid::Uuid;

use super::CustomerService;
use crate::entity::{encrypt_fields, encrypt_records, string_form};
use crate::store::{FieldUpdate, NewCustomer};

/// Field of the first record used as the document's display name.
const NAME_FIELD: &str = "name";

/// Result of a successful create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Created {
    pub cust_id: String,
    pub name: String,
}

/// Patch of a customer document.
///
/// `entities` is a flat field map edited into the primary record, not a list
/// of records.
#[derive(Debug, Clone, Default)]
pub struct CustomerPatch {
    pub name: Option<String>,
    pub entities: Option<Map<String, Value>>,
}

impl From<PatchRequest> for CustomerPatch {
    fn from(req: PatchRequest) -> Self {
        Self {
            name: req.name.as_ref().map(string_form),
            entities: req.entities,
        }
    }
}

impl CustomerService {
    /// Store a new customer document holding `records`, owned by `user_id`.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::EmptyInput`] if `records` is empty.
    /// - [`ServiceError::Validation`] if `user_id` is empty.
    /// - [`ServiceError::Encryption`] if any field fails to encrypt; nothing is
    ///   written in that case.
    pub async fn create(&self, records: &[EntityRecord], user_id: &str) -> Result<Created, ServiceError> {
        if records.is_empty() {
            return Err(ServiceError::EmptyInput);
        }
        require_id(user_id, "user_id")?;

        let entities = encrypt_records(&self.cipher, records)?;
        let cust_id = Uuid::new_v4().simple().to_string();
        let name = display_name(&records[0]);

        let doc = NewCustomer {
            cust_id: cust_id.clone(),
            name: name.clone(),
            user_id: user_id.to_owned(),
            entities,
        };
        self.store.session().await?.insert(&doc).await?;

        info!(cust_id = %cust_id, user_id, records = records.len(), "customer document created");
        Ok(Created { cust_id, name })
    }

    /// Append `records` to the document owned by `(cust_id, user_id)`.
    ///
    /// Existing records are left untouched; the push is one atomic update.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::EmptyInput`] if `records` is empty.
    /// - [`ServiceError::Validation`] if either identifier is empty.
    /// - [`ServiceError::NotFound`] if no document matches both identifiers.
    pub async fn append(
        &self,
        cust_id: &str,
        user_id: &str,
        records: &[EntityRecord],
    ) -> Result<(), ServiceError> {
        if records.is_empty() {
            return Err(ServiceError::EmptyInput);
        }
        require_id(cust_id, "cust_id")?;
        require_id(user_id, "user_id")?;

        let encrypted = encrypt_records(&self.cipher, records)?;
        let matched = self
            .store
            .session()
            .await?
            .push_entities(cust_id, user_id, &encrypted)
            .await?;

        if matched == 0 {
            warn!(cust_id, user_id, "append matched no document");
            return Err(not_found());
        }
        info!(cust_id, user_id, records = records.len(), "entity records appended");
        Ok(())
    }

    /// Apply `patch` to the document identified by `cust_id`.
    ///
    /// `name` replaces the plaintext display name. Each entry of `entities` is
    /// encrypted on its own and set inside the primary record (`entities[0]`),
    /// so the stored list shape is never replaced by a flat map.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Validation`] if `cust_id` is empty, nothing updatable
    ///   is supplied, or a field name cannot be addressed inside a record.
    /// - [`ServiceError::NotFound`] if no document matches `cust_id`.
    pub async fn patch(&self, cust_id: &str, patch: CustomerPatch) -> Result<(), ServiceError> {
        if cust_id.trim().is_empty() {
            return Err(ServiceError::Validation("cust_id cannot be null or empty".into()));
        }
        let fields = patch.entities.unwrap_or_default();
        if patch.name.is_none() && fields.is_empty() {
            return Err(ServiceError::Validation("no valid fields to update".into()));
        }
        for field in fields.keys() {
            validate_field_name(field)?;
        }

        let update = FieldUpdate {
            name: patch.name,
            primary_record: encrypt_fields(&self.cipher, &fields)?,
        };
        let matched = self.store.session().await?.set_fields(cust_id, &update).await?;

        if matched == 0 {
            warn!(cust_id, "patch matched no document");
            return Err(ServiceError::NotFound("customer not found".into()));
        }
        info!(cust_id, fields = fields.len(), renamed = update.name.is_some(), "customer document patched");
        Ok(())
    }
}

/// Display name for a new document: the first record's `name` in string form.
fn display_name(first: &EntityRecord) -> String {
    match first.get(NAME_FIELD) {
        None | Some(Value::Null) => String::new(),
        Some(value) => string_form(value),
    }
}

fn require_id(value: &str, what: &str) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::Validation(format!("{what} cannot be null or empty")));
    }
    Ok(())
}

/// Patched field names become path segments inside the primary record.
fn validate_field_name(field: &str) -> Result<(), ServiceError> {
    if field.is_empty() || field.contains('.') || field.starts_with('$') {
        return Err(ServiceError::Validation(format!(
            "field name `{field}` cannot be updated"
        )));
    }
    Ok(())
}

pub(super) fn not_found() -> ServiceError {
    ServiceError::NotFound("no customer found for the provided cust_id and user_id".into())
}
