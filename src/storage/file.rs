use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use super::{Collection, Entity, Persistence, StorageError};

/// Key every entity in the data file is identified by
const ID_FIELD: &str = "id";

/// On-disk layout: one top-level array per collection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Dataset {
    #[serde(default)]
    books: Vec<Entity>,
    #[serde(default)]
    filters: Vec<Entity>,
    #[serde(default)]
    bingo: Vec<Entity>,
    /// Unknown top-level keys are carried through rewrites untouched
    #[serde(flatten)]
    other: Map<String, Value>,
}

impl Dataset {
    fn entities(&self, collection: Collection) -> &Vec<Entity> {
        match collection {
            Collection::Books => &self.books,
            Collection::Filters => &self.filters,
            Collection::Bingo => &self.bingo,
        }
    }

    fn entities_mut(&mut self, collection: Collection) -> &mut Vec<Entity> {
        match collection {
            Collection::Books => &mut self.books,
            Collection::Filters => &mut self.filters,
            Collection::Bingo => &mut self.bingo,
        }
    }
}

/// Whole dataset held in memory and rewritten to a single JSON file on every
/// mutation.
///
/// Mutations are staged on a copy of the dataset and only committed to memory
/// once the file has been atomically replaced, so a failed write never leaves
/// memory ahead of disk.
pub struct FileStore {
    path: PathBuf,
    data: Arc<Mutex<Dataset>>,
}

impl FileStore {
    /// Load the data file, starting empty when it does not exist yet
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();

        let data = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Dataset::default(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("Data file {} not found, starting with an empty dataset", path.display());
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent).await?;
                }
                Dataset::default()
            }
            Err(e) => return Err(e.into()),
        };

        info!(
            books = data.books.len(),
            filters = data.filters.len(),
            bingo = data.bingo.len(),
            "Loaded data file {}",
            path.display()
        );

        Ok(Self {
            path,
            data: Arc::new(Mutex::new(data)),
        })
    }

    /// Apply `mutate` to a staged copy, persist it, then swap it in.
    ///
    /// The owned lock moves into the blocking task together with the staged
    /// dataset, so the write and the swap happen as one unit even if the
    /// caller stops waiting for the result.
    async fn commit<T, F>(&self, mutate: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut Dataset) -> Result<T, StorageError>,
    {
        let mut current = Arc::clone(&self.data).lock_owned().await;

        let mut staged = current.clone();
        let output = mutate(&mut staged)?;

        let bytes = serde_json::to_vec_pretty(&staged)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            write_atomically(&path, &bytes)?;
            *current = staged;
            Ok::<_, StorageError>(())
        })
        .await??;

        Ok(output)
    }
}

/// Write to a temp file beside `path`, fsync, then rename over it
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Identifier of a stored entity. Numeric ids compare by their decimal form.
fn entity_id(entity: &Entity) -> Option<String> {
    match entity.get(ID_FIELD)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn position_of(entities: &[Entity], id: &str) -> Option<usize> {
    entities
        .iter()
        .position(|e| entity_id(e).as_deref() == Some(id))
}

#[async_trait]
impl Persistence for FileStore {
    async fn list_all(&self, collection: Collection) -> Result<Vec<Entity>, StorageError> {
        let data = self.data.lock().await;
        Ok(data.entities(collection).clone())
    }

    async fn insert(
        &self,
        collection: Collection,
        mut entity: Entity,
    ) -> Result<Entity, StorageError> {
        let id = match entity_id(&entity) {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4().to_string();
                entity.insert(ID_FIELD.to_string(), Value::String(id.clone()));
                id
            }
        };

        self.commit(move |data| {
            let entities = data.entities_mut(collection);
            if position_of(entities, &id).is_some() {
                return Err(StorageError::conflict(collection, id));
            }
            entities.push(entity.clone());
            Ok(entity)
        })
        .await
    }

    async fn update_by_id(
        &self,
        collection: Collection,
        id: &str,
        mut entity: Entity,
    ) -> Result<Entity, StorageError> {
        self.commit(move |data| {
            let entities = data.entities_mut(collection);
            let index = position_of(entities, id)
                .ok_or_else(|| StorageError::not_found(collection, id))?;

            // Keep the stored identifier whatever the body says
            let stored_id = entities[index]
                .get(ID_FIELD)
                .cloned()
                .unwrap_or_else(|| Value::String(id.to_string()));
            entity.insert(ID_FIELD.to_string(), stored_id);

            entities[index] = entity.clone();
            Ok(entity)
        })
        .await
    }

    async fn delete_by_id(&self, collection: Collection, id: &str) -> Result<(), StorageError> {
        self.commit(move |data| {
            let entities = data.entities_mut(collection);
            let index = position_of(entities, id)
                .ok_or_else(|| StorageError::not_found(collection, id))?;
            entities.remove(index);
            Ok(())
        })
        .await
    }

    async fn health(&self) -> Result<(), StorageError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        tokio::fs::metadata(&dir).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity(value: Value) -> Entity {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    async fn temp_store() -> (tempfile::TempDir, FileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("books.json")).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn insert_then_list_contains_entity_once() {
        let (_dir, store) = temp_store().await;
        let book = entity(json!({"id": "b1", "title": "Dune"}));

        let stored = store.insert(Collection::Books, book.clone()).await.unwrap();
        assert_eq!(stored, book);

        let books = store.list_all(Collection::Books).await.unwrap();
        assert_eq!(books.iter().filter(|b| **b == book).count(), 1);
        assert!(store.list_all(Collection::Bingo).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn insert_assigns_id_when_missing() {
        let (_dir, store) = temp_store().await;
        let stored = store
            .insert(Collection::Bingo, entity(json!({"square": "Read a classic"})))
            .await
            .unwrap();

        let id = stored.get("id").and_then(Value::as_str).unwrap();
        assert!(Uuid::parse_str(id).is_ok());
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_id() {
        let (_dir, store) = temp_store().await;
        store.insert(Collection::Books, entity(json!({"id": "b1"}))).await.unwrap();

        let err = store
            .insert(Collection::Books, entity(json!({"id": "b1", "title": "Other"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict { .. }));
        assert_eq!(store.list_all(Collection::Books).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_replaces_entity_wholesale() {
        let (_dir, store) = temp_store().await;
        store
            .insert(
                Collection::Books,
                entity(json!({"id": "b1", "title": "Dune", "author": "Herbert"})),
            )
            .await
            .unwrap();

        let updated = store
            .update_by_id(
                Collection::Books,
                "b1",
                entity(json!({"id": "b1", "title": "Dune Messiah"})),
            )
            .await
            .unwrap();
        assert_eq!(updated, entity(json!({"id": "b1", "title": "Dune Messiah"})));

        let books = store.list_all(Collection::Books).await.unwrap();
        assert_eq!(books, vec![updated]);
    }

    #[tokio::test]
    async fn update_keeps_path_identifier() {
        let (_dir, store) = temp_store().await;
        store.insert(Collection::Bingo, entity(json!({"id": "x"}))).await.unwrap();

        let updated = store
            .update_by_id(Collection::Bingo, "x", entity(json!({"id": "y", "done": true})))
            .await
            .unwrap();
        assert_eq!(updated.get("id"), Some(&json!("x")));
    }

    #[tokio::test]
    async fn missing_id_is_not_found_without_side_effects() {
        let (_dir, store) = temp_store().await;
        store.insert(Collection::Books, entity(json!({"id": "b1"}))).await.unwrap();
        let before = store.list_all(Collection::Books).await.unwrap();

        let err = store
            .update_by_id(Collection::Books, "zzz", entity(json!({"title": "x"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));

        let err = store.delete_by_id(Collection::Books, "zzz").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));

        assert_eq!(store.list_all(Collection::Books).await.unwrap(), before);
    }

    #[tokio::test]
    async fn second_delete_is_not_found() {
        let (_dir, store) = temp_store().await;
        store.insert(Collection::Bingo, entity(json!({"id": "sq1"}))).await.unwrap();

        store.delete_by_id(Collection::Bingo, "sq1").await.unwrap();
        let err = store.delete_by_id(Collection::Bingo, "sq1").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn numeric_ids_match_by_decimal_form() {
        let (_dir, store) = temp_store().await;
        store.insert(Collection::Books, entity(json!({"id": 7}))).await.unwrap();

        let updated = store
            .update_by_id(Collection::Books, "7", entity(json!({"title": "Seven"})))
            .await
            .unwrap();
        assert_eq!(updated.get("id"), Some(&json!(7)));
    }

    #[tokio::test]
    async fn mutations_survive_reopen() {
        let (dir, store) = temp_store().await;
        store
            .insert(Collection::Books, entity(json!({"id": "b1", "title": "Dune"})))
            .await
            .unwrap();
        store.insert(Collection::Bingo, entity(json!({"id": "sq1"}))).await.unwrap();
        drop(store);

        let reopened = FileStore::open(dir.path().join("books.json")).await.unwrap();
        assert_eq!(reopened.list_all(Collection::Books).await.unwrap().len(), 1);
        assert_eq!(reopened.list_all(Collection::Bingo).await.unwrap().len(), 1);
        assert!(reopened.list_all(Collection::Filters).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn file_layout_has_one_key_per_collection() {
        let (dir, store) = temp_store().await;
        store.insert(Collection::Books, entity(json!({"id": "b1"}))).await.unwrap();

        let raw = std::fs::read_to_string(dir.path().join("books.json")).unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["books"], json!([{"id": "b1"}]));
        assert_eq!(value["filters"], json!([]));
        assert_eq!(value["bingo"], json!([]));
    }

    #[tokio::test]
    async fn loads_existing_file_and_keeps_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("books.json");
        let raw = json!({
            "books": [{"id": "b1"}],
            "filters": [{"id": "f1", "name": "Sci-fi"}],
            "version": 2
        });
        std::fs::write(&path, raw.to_string()).unwrap();

        let store = FileStore::open(&path).await.unwrap();
        assert_eq!(store.list_all(Collection::Filters).await.unwrap().len(), 1);
        assert!(store.list_all(Collection::Bingo).await.unwrap().is_empty());

        store.delete_by_id(Collection::Books, "b1").await.unwrap();
        let value: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["version"], json!(2));
    }

    #[tokio::test]
    async fn failed_write_leaves_memory_unchanged() {
        let (dir, store) = temp_store().await;
        store.insert(Collection::Books, entity(json!({"id": "b1"}))).await.unwrap();

        // Removing the directory makes the temp file creation fail
        std::fs::remove_dir_all(dir.path()).unwrap();

        let result = store.insert(Collection::Books, entity(json!({"id": "b2"}))).await;
        assert!(matches!(result, Err(StorageError::Io(_))));

        let result = store.delete_by_id(Collection::Books, "b1").await;
        assert!(matches!(result, Err(StorageError::Io(_))));

        let books = store.list_all(Collection::Books).await.unwrap();
        assert_eq!(books, vec![entity(json!({"id": "b1"}))]);
    }

    #[tokio::test]
    async fn malformed_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("books.json");
        std::fs::write(&path, "{not json").unwrap();

        let result = FileStore::open(&path).await;
        assert!(matches!(result, Err(StorageError::Serialization(_))));
    }

    fn books_on_disk(path: &Path) -> Vec<Value> {
        let value: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        value["books"].as_array().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn dropped_insert_still_lands_in_memory_and_on_disk() {
        let (dir, store) = temp_store().await;
        let book = entity(json!({"id": "b1", "title": "Dune"}));

        // One poll takes the lock and hands the write to the blocking pool
        let mut pending = Box::pin(store.insert(Collection::Books, book.clone()));
        let _ = futures::poll!(&mut pending);
        drop(pending);

        // Waits on the lock until the abandoned commit has finished
        let in_memory = store.list_all(Collection::Books).await.unwrap();
        let on_disk = books_on_disk(&dir.path().join("books.json"));
        assert_eq!(in_memory, vec![book]);
        assert_eq!(on_disk, vec![Value::Object(in_memory[0].clone())]);
    }

    #[tokio::test]
    async fn dropped_delete_keeps_memory_and_disk_in_step() {
        let (dir, store) = temp_store().await;
        store.insert(Collection::Books, entity(json!({"id": "b1"}))).await.unwrap();

        let mut pending = Box::pin(store.delete_by_id(Collection::Books, "b1"));
        let _ = futures::poll!(&mut pending);
        drop(pending);

        let in_memory: Vec<Value> = store
            .list_all(Collection::Books)
            .await
            .unwrap()
            .into_iter()
            .map(Value::Object)
            .collect();
        assert_eq!(in_memory, books_on_disk(&dir.path().join("books.json")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_inserts_are_all_kept() {
        const WRITERS: usize = 16;
        let (dir, store) = temp_store().await;
        let store = Arc::new(store);

        let tasks: Vec<_> = (0..WRITERS)
            .map(|n| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .insert(Collection::Books, entity(json!({"id": format!("b{n}")})))
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(store.list_all(Collection::Books).await.unwrap().len(), WRITERS);
        assert_eq!(books_on_disk(&dir.path().join("books.json")).len(), WRITERS);

        let reopened = FileStore::open(dir.path().join("books.json")).await.unwrap();
        let mut ids: Vec<String> = reopened
            .list_all(Collection::Books)
            .await
            .unwrap()
            .iter()
            .filter_map(|b| b.get("id").and_then(Value::as_str).map(str::to_string))
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), WRITERS);
    }
}
