use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::{StorageBackendKind, StorageConfig};
use crate::database::backend::{FileBackend, MemoryBackend, StorageBackend};
use crate::database::record::{decode_collection, encode_collection, Document};
use crate::types::{Collection, Operation};

/// Errors from the document store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable ({context}): {source}")]
    StorageUnavailable {
        collection: Option<Collection>,
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt data in '{collection}': {detail}")]
    CorruptData { collection: Collection, detail: String },

    #[error("{collection} record not found: {key}")]
    NotFound { collection: Collection, key: String },

    #[error("{collection} record already exists: {id}")]
    DuplicateId { collection: Collection, id: String },
}

impl StoreError {
    pub fn unavailable(
        collection: Option<Collection>,
        context: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        StoreError::StorageUnavailable {
            collection,
            context: context.into(),
            source,
        }
    }
}

/// Durable collection store shared by every request handler.
///
/// Reads take no lock and always decode the last fully persisted document.
/// Every mutation runs load-modify-persist under the collection's own mutex, so
/// mutations of one collection are serialized while the other collection stays free.
#[derive(Debug)]
pub struct DocumentStore {
    backend: Arc<dyn StorageBackend>,
    users_lock: Mutex<()>,
    products_lock: Mutex<()>,
}

impl DocumentStore {
    /// Open the store once per process using the configured backend
    pub async fn open(config: &StorageConfig) -> Result<Arc<Self>, StoreError> {
        let backend: Arc<dyn StorageBackend> = match config.backend {
            StorageBackendKind::File => Arc::new(FileBackend::new(&config.data_dir).await?),
            StorageBackendKind::Memory => Arc::new(MemoryBackend::new()),
        };

        let store = Arc::new(Self::with_backend(backend));
        store.health_check().await?;
        info!(backend = %store.backend.describe(), "Document store opened");
        Ok(store)
    }

    pub fn with_backend(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            users_lock: Mutex::new(()),
            products_lock: Mutex::new(()),
        }
    }

    /// Wait for in-flight mutations to finish, then release the store
    pub async fn close(&self) {
        let _users = self.users_lock.lock().await;
        let _products = self.products_lock.lock().await;
        info!(backend = %self.backend.describe(), "Document store closed");
    }

    fn lock(&self, collection: Collection) -> &Mutex<()> {
        match collection {
            Collection::Users => &self.users_lock,
            Collection::Products => &self.products_lock,
        }
    }

    /// Load the whole collection, persisting its seed on first use
    pub async fn load<T: Document>(&self) -> Result<Vec<T>, StoreError> {
        match self.backend.read(T::COLLECTION).await? {
            Some(bytes) => decode_collection(&bytes),
            None => {
                let _guard = self.lock(T::COLLECTION).lock().await;
                self.load_locked().await
            }
        }
    }

    /// Caller must hold the collection lock
    async fn load_locked<T: Document>(&self) -> Result<Vec<T>, StoreError> {
        if let Some(bytes) = self.backend.read(T::COLLECTION).await? {
            return decode_collection(&bytes);
        }

        let seed = T::seed();
        self.persist(&seed).await?;
        info!(collection = %T::COLLECTION, records = seed.len(), op = ?Operation::Seed, "Seeded collection");
        Ok(seed)
    }

    async fn persist<T: Document>(&self, records: &[T]) -> Result<(), StoreError> {
        let bytes = encode_collection(records)?;
        self.backend.write(T::COLLECTION, &bytes).await
    }

    /// Read-modify-write of one collection under its mutation lock.
    ///
    /// The closure sees the latest persisted snapshot. When it returns `Ok` the
    /// modified list is persisted as a whole; when it returns `Err` nothing is written.
    pub async fn transact<T, R, E, F>(&self, op: Operation, mutate: F) -> Result<R, E>
    where
        T: Document,
        E: From<StoreError>,
        F: FnOnce(&mut Vec<T>) -> Result<R, E>,
    {
        let _guard = self.lock(T::COLLECTION).lock().await;

        let mut records = self.load_locked::<T>().await?;
        let outcome = mutate(&mut records)?;
        self.persist(&records).await?;

        debug!(collection = %T::COLLECTION, op = ?op, records = records.len(), "Collection updated");
        Ok(outcome)
    }

    /// Verify every persisted collection can be read and parsed
    pub async fn health_check(&self) -> Result<(), StoreError> {
        for collection in Collection::ALL {
            if let Some(bytes) = self.backend.read(collection).await? {
                serde_json::from_slice::<serde_json::Value>(&bytes).map_err(|e| {
                    StoreError::CorruptData {
                        collection,
                        detail: format!("invalid JSON: {}", e),
                    }
                })?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{Product, User};

    fn memory_store() -> DocumentStore {
        DocumentStore::with_backend(Arc::new(MemoryBackend::new()))
    }

    #[tokio::test]
    async fn first_load_persists_seed_once() {
        let store = memory_store();
        let users: Vec<User> = store.load().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].email, "test@example.com");

        // Remove the seed; it must not come back on the next load
        store
            .transact::<User, _, StoreError, _>(Operation::Delete, |users| {
                users.clear();
                Ok(())
            })
            .await
            .unwrap();

        let users: Vec<User> = store.load().await.unwrap();
        assert!(users.is_empty());
    }

    #[tokio::test]
    async fn corrupt_document_surfaces_instead_of_reseeding() {
        let backend = MemoryBackend::with_document(Collection::Users, "{\"users\": [ {");
        let store = DocumentStore::with_backend(Arc::new(backend));

        let err = store.load::<User>().await.unwrap_err();
        assert!(matches!(err, StoreError::CorruptData { .. }), "got {:?}", err);

        let err = store.health_check().await.unwrap_err();
        assert!(matches!(err, StoreError::CorruptData { .. }), "got {:?}", err);
    }

    #[tokio::test]
    async fn failed_transaction_writes_nothing() {
        let store = memory_store();
        let result = store
            .transact::<Product, (), StoreError, _>(Operation::Insert, |products| {
                products.clear();
                Err(StoreError::NotFound {
                    collection: Collection::Products,
                    key: "nope".into(),
                })
            })
            .await;
        assert!(result.is_err());

        // Seed (empty) was persisted by the load, the failed closure changed nothing
        let products: Vec<Product> = store.load().await.unwrap();
        assert!(products.is_empty());
    }

    #[tokio::test]
    async fn file_store_reopens_with_persisted_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = crate::config::AppConfig::for_data_root(dir.path()).storage;
        config.backend = StorageBackendKind::File;

        let store = DocumentStore::open(&config).await.unwrap();
        store
            .transact::<User, _, StoreError, _>(Operation::Update, |users| {
                users[0].username = "renamed".to_string();
                Ok(())
            })
            .await
            .unwrap();
        store.close().await;

        let reopened = DocumentStore::open(&config).await.unwrap();
        let users: Vec<User> = reopened.load().await.unwrap();
        assert_eq!(users[0].username, "renamed");
    }
}
