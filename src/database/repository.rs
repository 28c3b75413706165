use std::marker::PhantomData;
use std::sync::Arc;

use tracing::info;

use crate::database::manager::{DocumentStore, StoreError};
use crate::database::record::Document;
use crate::types::Operation;

/// Record-level access to one collection of the document store.
///
/// Lookups are linear scans over the loaded snapshot.
pub struct Repository<T> {
    store: Arc<DocumentStore>,
    _phantom: PhantomData<T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _phantom: PhantomData,
        }
    }
}

impl<T: Document> Repository<T> {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    pub async fn select_all(&self) -> Result<Vec<T>, StoreError> {
        self.store.load().await
    }

    pub async fn find_by_id(&self, id: &str) -> Result<T, StoreError> {
        self.select_all()
            .await?
            .into_iter()
            .find(|record| record.id() == id)
            .ok_or_else(|| StoreError::NotFound {
                collection: T::COLLECTION,
                key: format!("id={}", id),
            })
    }

    /// First record matching `predicate`
    pub async fn find_by<P>(&self, predicate: P) -> Result<T, StoreError>
    where
        P: Fn(&T) -> bool,
    {
        self.select_all()
            .await?
            .into_iter()
            .find(|record| predicate(record))
            .ok_or_else(|| StoreError::NotFound {
                collection: T::COLLECTION,
                key: "predicate".to_string(),
            })
    }

    /// Append a new record
    pub async fn save(&self, record: T) -> Result<T, StoreError> {
        let saved = self
            .store
            .transact(Operation::Insert, |records: &mut Vec<T>| {
                if records.iter().any(|r| r.id() == record.id()) {
                    return Err(StoreError::DuplicateId {
                        collection: T::COLLECTION,
                        id: record.id().to_string(),
                    });
                }
                records.push(record.clone());
                Ok(record)
            })
            .await?;

        info!(collection = %T::COLLECTION, id = %saved.id(), "Record saved");
        Ok(saved)
    }

    /// Overwrite the record with `id` in place, keeping its position
    pub async fn replace(&self, id: &str, record: T) -> Result<T, StoreError> {
        let replaced = self
            .store
            .transact(Operation::Replace, |records: &mut Vec<T>| -> Result<T, StoreError> {
                let slot = records
                    .iter_mut()
                    .find(|r| r.id() == id)
                    .ok_or_else(|| StoreError::NotFound {
                        collection: T::COLLECTION,
                        key: format!("id={}", id),
                    })?;
                *slot = record.clone();
                Ok(record)
            })
            .await?;

        info!(collection = %T::COLLECTION, id = %id, "Record replaced");
        Ok(replaced)
    }

    /// Remove the record with `id`. Absent ids are a no-op; returns whether one was removed.
    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let removed = self
            .store
            .transact(Operation::Delete, |records: &mut Vec<T>| {
                let before = records.len();
                records.retain(|r| r.id() != id);
                Ok::<_, StoreError>(records.len() != before)
            })
            .await?;

        if removed {
            info!(collection = %T::COLLECTION, id = %id, "Record deleted");
        }
        Ok(removed)
    }

    /// Arbitrary read-modify-write, e.g. check-then-insert under the collection lock
    pub async fn transact<R, E, F>(&self, mutate: F) -> Result<R, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut Vec<T>) -> Result<R, E>,
    {
        self.store.transact(Operation::Update, mutate).await
    }
}
