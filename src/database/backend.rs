use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::database::manager::StoreError;
use crate::types::Collection;

/// Durable medium holding one serialized document per collection.
///
/// `read` returns `None` when nothing has ever been persisted for the collection.
/// `write` must replace the document atomically: a concurrent or later `read`
/// observes either the previous document or the new one, never a partial write.
#[async_trait]
pub trait StorageBackend: Send + Sync + std::fmt::Debug {
    async fn read(&self, collection: Collection) -> Result<Option<Vec<u8>>, StoreError>;

    async fn write(&self, collection: Collection, bytes: &[u8]) -> Result<(), StoreError>;

    /// Short human-readable description for logs
    fn describe(&self) -> String;
}

/// One JSON file per collection under a data directory.
#[derive(Debug, Clone)]
pub struct FileBackend {
    data_dir: PathBuf,
}

impl FileBackend {
    pub async fn new(data_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)
            .await
            .map_err(|e| StoreError::unavailable(None, format!("create {}", data_dir.display()), e))?;

        info!(path = %data_dir.display(), "File storage initialized");
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn document_path(&self, collection: Collection) -> PathBuf {
        self.data_dir.join(format!("{}.json", collection.name()))
    }

    fn temp_path(&self, collection: Collection) -> PathBuf {
        self.data_dir
            .join(format!(".{}.json.{}.tmp", collection.name(), Uuid::new_v4().simple()))
    }

    async fn write_temp(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut file = fs::File::create(path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for FileBackend {
    async fn read(&self, collection: Collection) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.document_path(collection);
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::unavailable(
                Some(collection),
                format!("read {}", path.display()),
                e,
            )),
        }
    }

    async fn write(&self, collection: Collection, bytes: &[u8]) -> Result<(), StoreError> {
        let target = self.document_path(collection);
        let temp = self.temp_path(collection);

        if let Err(e) = Self::write_temp(&temp, bytes).await {
            let _ = fs::remove_file(&temp).await;
            return Err(StoreError::unavailable(
                Some(collection),
                format!("write {}", temp.display()),
                e,
            ));
        }

        // rename within one directory is atomic on POSIX filesystems
        if let Err(e) = fs::rename(&temp, &target).await {
            if let Err(cleanup) = fs::remove_file(&temp).await {
                warn!(path = %temp.display(), "Failed to remove temp document: {}", cleanup);
            }
            return Err(StoreError::unavailable(
                Some(collection),
                format!("rename onto {}", target.display()),
                e,
            ));
        }

        debug!(collection = %collection, size = bytes.len(), "Persisted document");
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file:{}", self.data_dir.display())
    }
}

/// Process-local storage. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    documents: RwLock<HashMap<Collection, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-populated with raw document bytes
    pub fn with_document(collection: Collection, bytes: impl Into<Vec<u8>>) -> Self {
        let mut documents = HashMap::new();
        documents.insert(collection, bytes.into());
        Self {
            documents: RwLock::new(documents),
        }
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn read(&self, collection: Collection) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.documents.read().await.get(&collection).cloned())
    }

    async fn write(&self, collection: Collection, bytes: &[u8]) -> Result<(), StoreError> {
        self.documents.write().await.insert(collection, bytes.to_vec());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_document_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path()).await.unwrap();
        assert!(backend.read(Collection::Users).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn write_replaces_document_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path()).await.unwrap();

        backend.write(Collection::Products, b"{\"products\":[]}").await.unwrap();
        backend.write(Collection::Products, b"{\"products\":[1]}").await.unwrap();

        let bytes = backend.read(Collection::Products).await.unwrap().unwrap();
        assert_eq!(bytes, b"{\"products\":[1]}");

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["products.json".to_string()]);
    }

    #[tokio::test]
    async fn unreadable_document_is_storage_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path()).await.unwrap();
        // A directory where the document should be cannot be read as a file
        std::fs::create_dir(backend.document_path(Collection::Users)).unwrap();

        let err = backend.read(Collection::Users).await.unwrap_err();
        assert!(matches!(err, StoreError::StorageUnavailable { .. }), "got {:?}", err);
    }

    #[tokio::test]
    async fn memory_backend_keeps_collections_apart() {
        let backend = MemoryBackend::new();
        backend.write(Collection::Users, b"u").await.unwrap();
        assert_eq!(backend.read(Collection::Users).await.unwrap().unwrap(), b"u");
        assert!(backend.read(Collection::Products).await.unwrap().is_none());
    }
}
