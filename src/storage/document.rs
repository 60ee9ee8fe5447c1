use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{self, doc, oid::ObjectId, Bson, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::{Client, Database};
use serde_json::Value;
use tracing::{debug, info};

use super::{Collection, Entity, Persistence, StorageError};

/// MongoDB's native identifier field
const ID_FIELD: &str = "_id";

/// Server error code for a unique index violation
const DUPLICATE_KEY: i32 = 11000;

/// One MongoDB collection per resource, keyed by the native ObjectId.
///
/// Identifiers cross the API boundary as 24-digit hex strings.
#[derive(Clone)]
pub struct DocumentStore {
    db: Database,
}

impl DocumentStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, StorageError> {
        let client = Client::with_uri_str(uri).await?;
        info!("Connected to document store, using database {}", database);
        Ok(Self::new(client.database(database)))
    }

    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn collection(&self, collection: Collection) -> mongodb::Collection<Document> {
        self.db.collection::<Document>(collection.name())
    }
}

/// Path ids that are not valid ObjectIds cannot match any document
fn parse_id(collection: Collection, id: &str) -> Result<ObjectId, StorageError> {
    ObjectId::parse_str(id).map_err(|_| StorageError::not_found(collection, id))
}

/// Convert an API entity to a document, keeping `_id` only when it is a valid ObjectId
fn to_document(mut entity: Entity) -> Result<Document, StorageError> {
    let client_id = entity
        .remove(ID_FIELD)
        .and_then(|v| v.as_str().and_then(|s| ObjectId::parse_str(s).ok()));

    let mut document = bson::to_document(&entity)?;

    if let Some(oid) = client_id {
        document.insert(ID_FIELD, oid);
    }
    Ok(document)
}

/// Convert a stored document to an API entity with `_id` as a hex string
fn from_document(mut document: Document) -> Entity {
    let id = document.remove(ID_FIELD);

    let mut entity = match Bson::Document(document).into_relaxed_extjson() {
        Value::Object(map) => map,
        _ => Entity::new(),
    };

    if let Some(id) = id {
        let id = match id {
            Bson::ObjectId(oid) => Value::String(oid.to_hex()),
            other => other.into_relaxed_extjson(),
        };
        entity.insert(ID_FIELD.to_string(), id);
    }
    entity
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY
    )
}

#[async_trait]
impl Persistence for DocumentStore {
    async fn list_all(&self, collection: Collection) -> Result<Vec<Entity>, StorageError> {
        let cursor = self.collection(collection).find(None, None).await?;
        let documents: Vec<Document> = cursor.try_collect().await?;
        Ok(documents.into_iter().map(from_document).collect())
    }

    async fn insert(&self, collection: Collection, entity: Entity) -> Result<Entity, StorageError> {
        let mut document = to_document(entity)?;

        let result = match self.collection(collection).insert_one(&document, None).await {
            Ok(result) => result,
            Err(e) if is_duplicate_key(&e) => {
                let id = document
                    .get_object_id(ID_FIELD)
                    .map(|oid| oid.to_hex())
                    .unwrap_or_default();
                return Err(StorageError::conflict(collection, id));
            }
            Err(e) => return Err(e.into()),
        };

        debug!("Inserted {} into {}", result.inserted_id, collection);
        document.insert(ID_FIELD, result.inserted_id);
        Ok(from_document(document))
    }

    async fn update_by_id(
        &self,
        collection: Collection,
        id: &str,
        entity: Entity,
    ) -> Result<Entity, StorageError> {
        let oid = parse_id(collection, id)?;

        // The identifier is immutable; replace everything else
        let mut replacement = to_document(entity)?;
        replacement.remove(ID_FIELD);

        let result = self
            .collection(collection)
            .replace_one(doc! { "_id": oid }, &replacement, None)
            .await?;

        if result.matched_count != 1 {
            return Err(StorageError::not_found(collection, id));
        }

        replacement.insert(ID_FIELD, oid);
        Ok(from_document(replacement))
    }

    async fn delete_by_id(&self, collection: Collection, id: &str) -> Result<(), StorageError> {
        let oid = parse_id(collection, id)?;

        let result = self
            .collection(collection)
            .delete_one(doc! { "_id": oid }, None)
            .await?;

        if result.deleted_count != 1 {
            return Err(StorageError::not_found(collection, id));
        }
        Ok(())
    }

    async fn health(&self) -> Result<(), StorageError> {
        self.db.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "mongodb"
    }
}
