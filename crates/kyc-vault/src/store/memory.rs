//! In-memory [`DocumentStore`] used by tests and `STORE_BACKEND=memory`.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use common::EntityRecord;
use serde_json::Value;
use tokio::sync::Mutex;

use super::{DocumentStore, FieldUpdate, NewCustomer, StoreError, StoreSession, StoredCustomer};

/// Process-local customer collection.
///
/// Cloning shares the same underlying documents. Each operation takes the
/// mutex once, which gives the same single-document atomicity the MongoDB
/// backend provides.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    docs: Arc<Mutex<Vec<StoredCustomer>>>,
    open_sessions: Arc<AtomicUsize>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions acquired and not yet dropped.
    #[cfg(test)]
    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }

    /// Copy of every stored document, in insertion order.
    #[cfg(test)]
    pub async fn snapshot(&self) -> Vec<StoredCustomer> {
        self.docs.lock().await.clone()
    }

    /// Store `doc` exactly as given, bypassing the create path.
    #[cfg(test)]
    pub async fn insert_raw(&self, doc: StoredCustomer) {
        self.docs.lock().await.push(doc);
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn session(&self) -> Result<Box<dyn StoreSession>, StoreError> {
        self.open_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySession {
            docs: Arc::clone(&self.docs),
            open_sessions: Arc::clone(&self.open_sessions),
        }))
    }
}

struct MemorySession {
    docs: Arc<Mutex<Vec<StoredCustomer>>>,
    open_sessions: Arc<AtomicUsize>,
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.open_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl StoreSession for MemorySession {
    async fn insert(&self, doc: &NewCustomer) -> Result<(), StoreError> {
        self.docs.lock().await.push(doc.clone().into());
        Ok(())
    }

    async fn find_owned(
        &self,
        cust_id: &str,
        user_id: &str,
    ) -> Result<Option<StoredCustomer>, StoreError> {
        let docs = self.docs.lock().await;
        Ok(docs
            .iter()
            .find(|d| d.cust_id == cust_id && d.user_id == user_id)
            .cloned())
    }

    async fn push_entities(
        &self,
        cust_id: &str,
        user_id: &str,
        records: &[EntityRecord],
    ) -> Result<u64, StoreError> {
        let mut docs = self.docs.lock().await;
        let Some(doc) = docs
            .iter_mut()
            .find(|d| d.cust_id == cust_id && d.user_id == user_id)
        else {
            return Ok(0);
        };

        if doc.entities.is_null() {
            doc.entities = Value::Array(Vec::new());
        }
        let Value::Array(items) = &mut doc.entities else {
            return Err(StoreError::ShapeConflict(
                "cannot append to a non-list entities attribute".into(),
            ));
        };
        items.extend(records.iter().cloned().map(Value::Object));
        Ok(1)
    }

    async fn set_fields(&self, cust_id: &str, update: &FieldUpdate) -> Result<u64, StoreError> {
        let mut docs = self.docs.lock().await;
        let Some(doc) = docs.iter_mut().find(|d| d.cust_id == cust_id) else {
            return Ok(0);
        };

        if !update.primary_record.is_empty() {
            let items = list_for_update(&mut doc.entities)?;
            if items.is_empty() {
                items.push(Value::Object(EntityRecord::new()));
            }
            let Value::Object(primary) = &mut items[0] else {
                return Err(StoreError::ShapeConflict(
                    "primary entity record is not an object".into(),
                ));
            };
            for (field, value) in &update.primary_record {
                primary.insert(field.clone(), value.clone());
            }
        }

        if let Some(name) = &update.name {
            doc.name = name.clone();
        }
        Ok(1)
    }
}

/// Bring `entities` into list shape before a record-level edit: a legacy flat
/// map becomes the only record of the list, a missing attribute an empty list.
fn list_for_update(entities: &mut Value) -> Result<&mut Vec<Value>, StoreError> {
    if entities.is_null() {
        *entities = Value::Array(Vec::new());
    } else if entities.is_object() {
        let legacy = entities.take();
        *entities = Value::Array(vec![legacy]);
    }
    match entities {
        Value::Array(items) => Ok(items),
        _ => Err(StoreError::ShapeConflict(
            "cannot set record fields on a scalar entities attribute".into(),
        )),
    }
}
