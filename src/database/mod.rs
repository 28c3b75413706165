pub mod backend;
pub mod manager;
pub mod models;
pub mod record;
pub mod repository;

pub use backend::{FileBackend, MemoryBackend, StorageBackend};
pub use manager::{DocumentStore, StoreError};
pub use record::Document;
pub use repository::Repository;
