//! Persistence layer shared by every resource handler.
//!
//! Handlers only see the [`Persistence`] trait; the backing store is chosen at
//! startup and can be either a single JSON file ([`FileStore`]) or a MongoDB
//! database ([`DocumentStore`]).

pub mod document;
pub mod file;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub use document::DocumentStore;
pub use file::FileStore;

/// A single stored record. Attributes beyond the identifier are free-form.
pub type Entity = Map<String, Value>;

/// The named resource collections exposed by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Books,
    Filters,
    Bingo,
}

impl Collection {
    pub const ALL: [Collection; 3] = [Collection::Books, Collection::Filters, Collection::Bingo];

    /// Key in the data file and collection name in the document store
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Books => "books",
            Collection::Filters => "filters",
            Collection::Bingo => "bingo",
        }
    }

    /// Human label for a single entity, used in client messages
    pub fn label(&self) -> &'static str {
        match self {
            Collection::Books => "Book",
            Collection::Filters => "Filter",
            Collection::Bingo => "Bingo item",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{} {id} not found", .collection.label())]
    NotFound { collection: Collection, id: String },

    #[error("{} {id} already exists", .collection.label())]
    Conflict { collection: Collection, id: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Document encoding error: {0}")]
    Encoding(#[from] mongodb::bson::ser::Error),

    #[error("Blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Document store error: {0}")]
    Mongo(#[from] mongodb::error::Error),
}

impl StorageError {
    pub fn not_found(collection: Collection, id: impl Into<String>) -> Self {
        StorageError::NotFound {
            collection,
            id: id.into(),
        }
    }

    pub fn conflict(collection: Collection, id: impl Into<String>) -> Self {
        StorageError::Conflict {
            collection,
            id: id.into(),
        }
    }
}

/// Uniform data-access contract over a backing store.
///
/// Every call round-trips to the store; callers never cache entities.
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Every entity currently stored in `collection`
    async fn list_all(&self, collection: Collection) -> Result<Vec<Entity>, StorageError>;

    /// Store a new entity, assigning an identifier when it carries none.
    /// Returns only after the write is durable.
    async fn insert(&self, collection: Collection, entity: Entity) -> Result<Entity, StorageError>;

    /// Replace the entity with identifier `id` wholesale
    async fn update_by_id(
        &self,
        collection: Collection,
        id: &str,
        entity: Entity,
    ) -> Result<Entity, StorageError>;

    async fn delete_by_id(&self, collection: Collection, id: &str) -> Result<(), StorageError>;

    async fn health(&self) -> Result<(), StorageError>;

    /// Short backend name reported by the health endpoint
    fn backend(&self) -> &'static str;
}
