//! MongoDB [`DocumentStore`] backend.
//!
//! The driver's [`Client`] owns the connection pool; a session only holds a
//! cloned collection handle, which returns its checked-out connection when
//! each call completes and is itself released on drop.

use async_trait::async_trait;
use common::EntityRecord;
use mongodb::{
    bson::{self, doc, Document},
    error::{Error as MongoError, ErrorKind},
    options::ClientOptions,
    Client, Collection,
};
use tracing::info;

use super::{DocumentStore, FieldUpdate, NewCustomer, StoreError, StoreSession, StoredCustomer};

/// Name reported to the server in the client handshake.
const APP_NAME: &str = "kyc-vault";

/// Customer collection backed by MongoDB.
#[derive(Clone, Debug)]
pub struct MongoStore {
    collection: Collection<Document>,
}

impl MongoStore {
    /// Parse `uri`, build a pooled client and bind to `database.collection`.
    ///
    /// No round trip is made here; the first operation surfaces connectivity
    /// problems as [`StoreError::Unavailable`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the URI cannot be parsed.
    pub async fn connect(uri: &str, database: &str, collection: &str) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(uri).await.map_err(map_driver_error)?;
        options.app_name = Some(APP_NAME.into());
        let client = Client::with_options(options).map_err(map_driver_error)?;
        info!(database, collection, "mongodb client initialised");
        Ok(Self {
            collection: client.database(database).collection(collection),
        })
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    fn backend(&self) -> &'static str {
        "mongodb"
    }

    async fn session(&self) -> Result<Box<dyn StoreSession>, StoreError> {
        Ok(Box::new(MongoSession {
            collection: self.collection.clone(),
        }))
    }
}

struct MongoSession {
    collection: Collection<Document>,
}

#[async_trait]
impl StoreSession for MongoSession {
    async fn insert(&self, doc: &NewCustomer) -> Result<(), StoreError> {
        let document = bson::to_document(doc).map_err(|e| StoreError::Backend(e.to_string()))?;
        self.collection
            .insert_one(document, None)
            .await
            .map_err(map_driver_error)?;
        Ok(())
    }

    async fn find_owned(
        &self,
        cust_id: &str,
        user_id: &str,
    ) -> Result<Option<StoredCustomer>, StoreError> {
        let found = self
            .collection
            .find_one(owner_filter(cust_id, user_id), None)
            .await
            .map_err(map_driver_error)?;
        found
            .map(bson::from_document::<StoredCustomer>)
            .transpose()
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn push_entities(
        &self,
        cust_id: &str,
        user_id: &str,
        records: &[EntityRecord],
    ) -> Result<u64, StoreError> {
        let records = bson::to_bson(records).map_err(|e| StoreError::Backend(e.to_string()))?;
        let result = self
            .collection
            .update_one(
                owner_filter(cust_id, user_id),
                doc! { "$push": { "entities": { "$each": records } } },
                None,
            )
            .await
            .map_err(map_driver_error)?;
        Ok(result.matched_count)
    }

    async fn set_fields(&self, cust_id: &str, update: &FieldUpdate) -> Result<u64, StoreError> {
        let edits_record = !update.primary_record.is_empty();
        if edits_record {
            self.collection
                .update_one(doc! { "cust_id": cust_id }, list_shape_pipeline(), None)
                .await
                .map_err(map_driver_error)?;
        }

        let set = set_document(update)?;
        let result = self
            .collection
            .update_one(set_filter(cust_id, edits_record), doc! { "$set": set }, None)
            .await
            .map_err(map_driver_error)?;

        if result.matched_count == 0 && edits_record {
            let exists = self
                .collection
                .count_documents(doc! { "cust_id": cust_id }, None)
                .await
                .map_err(map_driver_error)?;
            if exists > 0 {
                return Err(StoreError::ShapeConflict(
                    "cannot set record fields on a scalar entities attribute".into(),
                ));
            }
        }
        Ok(result.matched_count)
    }
}

fn owner_filter(cust_id: &str, user_id: &str) -> Document {
    doc! { "cust_id": cust_id, "user_id": user_id }
}

/// Filter for the `$set` update. Record edits only apply where `entities` is
/// a list, so a dotted `entities.0.<field>` path never lands inside a map.
fn set_filter(cust_id: &str, edits_record: bool) -> Document {
    let mut filter = doc! { "cust_id": cust_id };
    if edits_record {
        filter.insert("entities", doc! { "$type": "array" });
    }
    filter
}

/// Update pipeline bringing `entities` into list shape: a legacy flat map
/// becomes `[map]`, a null or absent attribute `[]`. Lists and other values
/// are written back unchanged.
fn list_shape_pipeline() -> Vec<Document> {
    vec![doc! {
        "$set": {
            "entities": {
                "$switch": {
                    "branches": [
                        { "case": { "$isArray": "$entities" }, "then": "$entities" },
                        {
                            "case": { "$eq": [ { "$type": "$entities" }, "object" ] },
                            "then": [ "$entities" ],
                        },
                        {
                            "case": { "$in": [ { "$type": "$entities" }, [ "missing", "null" ] ] },
                            "then": [],
                        },
                    ],
                    "default": "$entities",
                }
            }
        }
    }]
}

/// Build the `$set` body: plaintext `name` plus one dotted path per field of
/// the primary record (`entities.0.<field>`).
fn set_document(update: &FieldUpdate) -> Result<Document, StoreError> {
    let mut set = Document::new();
    if let Some(name) = &update.name {
        set.insert("name", name.as_str());
    }
    for (field, value) in &update.primary_record {
        let value = bson::to_bson(value).map_err(|e| StoreError::Backend(e.to_string()))?;
        set.insert(format!("entities.0.{field}"), value);
    }
    Ok(set)
}

fn map_driver_error(err: MongoError) -> StoreError {
    match *err.kind {
        ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) => StoreError::Unavailable(err.to_string()),
        _ => StoreError::Backend(err.to_string()),
    }
}
