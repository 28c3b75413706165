use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::database::manager::StoreError;
use crate::types::Collection;

/// A record type persisted as one element of a collection document.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection the record lives in
    const COLLECTION: Collection;

    /// Unique id of this record within its collection
    fn id(&self) -> &str;

    /// Records written the first time the collection is loaded and nothing is persisted yet
    fn seed() -> Vec<Self> {
        Vec::new()
    }
}

/// Encode records as `{ "<collection>": [ ... ] }`
pub fn encode_collection<T: Document>(records: &[T]) -> Result<Vec<u8>, StoreError> {
    let list = serde_json::to_value(records).map_err(|e| StoreError::CorruptData {
        collection: T::COLLECTION,
        detail: format!("failed to encode records: {}", e),
    })?;

    let mut document = Map::new();
    document.insert(T::COLLECTION.name().to_string(), list);

    serde_json::to_vec_pretty(&Value::Object(document)).map_err(|e| StoreError::CorruptData {
        collection: T::COLLECTION,
        detail: format!("failed to encode document: {}", e),
    })
}

/// Decode a persisted collection document. Anything unparseable is `CorruptData`.
pub fn decode_collection<T: Document>(bytes: &[u8]) -> Result<Vec<T>, StoreError> {
    let collection = T::COLLECTION;
    let mut document: Value = serde_json::from_slice(bytes).map_err(|e| StoreError::CorruptData {
        collection,
        detail: format!("invalid JSON: {}", e),
    })?;

    let list = document
        .get_mut(collection.name())
        .map(Value::take)
        .ok_or_else(|| StoreError::CorruptData {
            collection,
            detail: format!("missing top-level '{}' array", collection.name()),
        })?;

    serde_json::from_value(list).map_err(|e| StoreError::CorruptData {
        collection,
        detail: format!("invalid record: {}", e),
    })
}
