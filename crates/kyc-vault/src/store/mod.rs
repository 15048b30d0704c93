//! Document-store seam for customer documents.
//!
//! # Responsibilities
//!
//! - [`DocumentStore`] hands out a [`StoreSession`] scoped to one protocol
//!   call. Sessions release whatever they hold when dropped, so every exit
//!   path (including `?` on an error) gives the handle back.
//! - [`StoreSession`] exposes exactly the four single-document operations the
//!   protocols need: insert, find-first by ownership, `$push`-style append and
//!   `$set`-style field update. Each update is one atomic call against one
//!   document; update calls report how many documents matched.
//!
//! # Module invariants
//!
//! - **No crypto dependencies.** Values reaching this module are already
//!   encrypted; nothing here inspects or logs them.

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

use async_trait::async_trait;
use common::{EntityRecord, ServiceError};
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors from a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend cannot be reached.
    #[error("document store unavailable: {0}")]
    Unavailable(String),

    /// The backend rejected or failed the operation.
    #[error("document store operation failed: {0}")]
    Backend(String),

    /// The stored document does not have the shape the update expects.
    #[error("stored document has unexpected shape: {0}")]
    ShapeConflict(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(_) => ServiceError::Unavailable(err.to_string()),
            StoreError::Backend(_) | StoreError::ShapeConflict(_) => {
                ServiceError::Internal(err.to_string())
            }
        }
    }
}

/// A customer document as written by the create path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCustomer {
    pub cust_id: String,
    pub name: String,
    pub user_id: String,
    /// Encrypted entity records.
    pub entities: Vec<EntityRecord>,
}

/// A customer document as read back from the store.
///
/// `entities` is kept as raw JSON: documents written by older patch logic may
/// hold a flat map there instead of a list of records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredCustomer {
    #[serde(default)]
    pub cust_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub entities: Value,
}

impl From<NewCustomer> for StoredCustomer {
    fn from(doc: NewCustomer) -> Self {
        Self {
            cust_id: doc.cust_id,
            name: doc.name,
            user_id: doc.user_id,
            entities: Value::Array(doc.entities.into_iter().map(Value::Object).collect()),
        }
    }
}

/// One `$set`-style update of a customer document.
#[derive(Debug, Clone, Default)]
pub struct FieldUpdate {
    /// New plaintext display name, if any.
    pub name: Option<String>,
    /// Already-encrypted fields to set inside the primary record (`entities[0]`).
    pub primary_record: EntityRecord,
}

/// Source of scoped store sessions.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name reported by the health endpoint.
    fn backend(&self) -> &'static str;

    /// Acquire a session for the duration of one protocol call.
    async fn session(&self) -> Result<Box<dyn StoreSession>, StoreError>;
}

/// Single-document operations against the customer collection.
#[async_trait]
pub trait StoreSession: Send + Sync {
    /// Insert a new customer document.
    async fn insert(&self, doc: &NewCustomer) -> Result<(), StoreError>;

    /// Find the first document matching both `cust_id` and `user_id`.
    async fn find_owned(
        &self,
        cust_id: &str,
        user_id: &str,
    ) -> Result<Option<StoredCustomer>, StoreError>;

    /// Append `records` to the `entities` list of the document matching both
    /// identifiers. Returns the matched count.
    async fn push_entities(
        &self,
        cust_id: &str,
        user_id: &str,
        records: &[EntityRecord],
    ) -> Result<u64, StoreError>;

    /// Apply `update` to the document matching `cust_id`. Returns the matched
    /// count.
    async fn set_fields(&self, cust_id: &str, update: &FieldUpdate) -> Result<u64, StoreError>;
}
