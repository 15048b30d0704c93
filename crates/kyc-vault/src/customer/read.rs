//! Read path: fetch a customer's records and decrypt them.

use common::ServiceError;
use serde_json::Value;
use tracing::{debug, warn};

use super::{mutation::not_found, CustomerService};
use crate::crypto::FieldCipher;
use crate::entity::decrypt_record;

impl CustomerService {
    /// Return the plaintext entity records of the document owned by
    /// `(cust_id, user_id)`.
    ///
    /// Only the records are returned; `name`, `cust_id` and `user_id` are not.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::NotFound`] if no document matches both identifiers.
    /// - [`ServiceError::Decryption`] if a stored ciphertext fails to decrypt.
    pub async fn fetch_by_customer(&self, cust_id: &str, user_id: &str) -> Result<Vec<Value>, ServiceError> {
        let found = self.store.session().await?.find_owned(cust_id, user_id).await?;
        let Some(doc) = found else {
            warn!(cust_id, user_id, "fetch matched no document");
            return Err(not_found());
        };

        let records = decrypt_entities(&self.cipher, doc.entities)?;
        debug!(cust_id, records = records.len(), "customer records decrypted");
        Ok(records)
    }
}

/// Decrypt a stored `entities` attribute into a list of records.
///
/// - A list has each object element decrypted; other elements are returned
///   unchanged.
/// - A flat object (written by patch logic that predates record-level
///   patching) is decrypted as one record.
/// - A missing attribute yields no records.
fn decrypt_entities(cipher: &FieldCipher, entities: Value) -> Result<Vec<Value>, ServiceError> {
    match entities {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .into_iter()
            .map(|item| -> Result<Value, ServiceError> {
                match item {
                    Value::Object(record) => Ok(Value::Object(decrypt_record(cipher, &record)?)),
                    other => Ok(other),
                }
            })
            .collect(),
        Value::Object(record) => Ok(vec![Value::Object(decrypt_record(cipher, &record)?)]),
        other => Ok(vec![other]),
    }
}
