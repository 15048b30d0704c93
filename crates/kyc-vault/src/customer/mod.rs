//! Customer document protocols: create, append, patch and read.
//!
//! Every operation encrypts or decrypts through [`crate::entity`] and talks to
//! the store through a session acquired for that call only. Sessions are
//! dropped before the operation returns, on success and on every error path.

pub mod mutation;
pub mod read;

use std::sync::Arc;

use crate::crypto::FieldCipher;
use crate::store::DocumentStore;

/// Entry point for every customer-document operation.
///
/// Cheap to clone: the store and the codec are both shared handles.
#[derive(Clone)]
pub struct CustomerService {
    store: Arc<dyn DocumentStore>,
    cipher: FieldCipher,
}

impl CustomerService {
    pub fn new(store: Arc<dyn DocumentStore>, cipher: FieldCipher) -> Self {
        Self { store, cipher }
    }

    /// Name of the active store backend.
    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use common::EntityRecord;
    use serde_json::Value;

    use super::CustomerService;
    use crate::crypto::{EncryptionKey, FieldCipher};
    use crate::store::MemoryStore;

    pub fn service() -> (CustomerService, MemoryStore) {
        let store = MemoryStore::new();
        let cipher = FieldCipher::new(EncryptionKey::generate());
        (CustomerService::new(Arc::new(store.clone()), cipher), store)
    }

    pub fn record(value: Value) -> EntityRecord {
        value.as_object().cloned().expect("test record must be an object")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use common::ServiceError;
    use serde_json::json;

    use super::test_support::record;
    use super::*;
    use crate::crypto::EncryptionKey;
    use crate::store::{MockDocumentStore, StoreError};

    fn unavailable_service() -> CustomerService {
        let mut store = MockDocumentStore::new();
        store
            .expect_session()
            .returning(|| Err(StoreError::Unavailable("connection refused".into())));
        CustomerService::new(Arc::new(store), FieldCipher::new(EncryptionKey::generate()))
    }

    #[tokio::test]
    async fn unreachable_store_is_unavailable() {
        let service = unavailable_service();
        let err = service
            .create(&[record(json!({"name": "Alice"}))], "u1")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unavailable(_)));

        let err = service.fetch_by_customer("c1", "u1").await.unwrap_err();
        assert_eq!(err.http_status(), 503);
    }
}
