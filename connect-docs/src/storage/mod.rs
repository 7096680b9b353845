//! Snapshot persistence for the document collection.
//!
//! Architecture:
//! ```text
//! ┌──────────────┐   save(&[Document])   ┌────────────────────────┐
//! │ DocumentStore│ ────────────────────► │ SnapshotRepository     │
//! │ (in-memory)  │ ◄──────────────────── │  ├─ MemoryRepository   │
//! └──────────────┘   load() on open      │  └─ RocksRepository    │
//!                                        └────────────────────────┘
//! ```
//!
//! The whole collection is written on every mutation as one JSON array under
//! a single key. There is no schema version tag: a blob that fails to parse
//! is reported as [`StoreError::Malformed`] and the store regenerates its
//! synthetic dataset.

pub mod memory;
pub mod rocks;

use std::sync::Arc;

use connect_core::Document;
use thiserror::Error;

pub use memory::MemoryRepository;
pub use rocks::{RocksConfig, RocksRepository, SnapshotMetadata};

/// Storage errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("malformed snapshot: {0}")]
    Malformed(String),
    #[error("compression error: {0}")]
    Compression(String),
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<rocksdb::Error> for StoreError {
    fn from(e: rocksdb::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// Load/save of the full document snapshot.
pub trait SnapshotRepository: Send + Sync {
    /// `Ok(None)` when nothing has been stored yet.
    fn load(&self) -> Result<Option<Vec<Document>>, StoreError>;

    fn save(&self, documents: &[Document]) -> Result<(), StoreError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

impl<T: SnapshotRepository + ?Sized> SnapshotRepository for Arc<T> {
    fn load(&self) -> Result<Option<Vec<Document>>, StoreError> {
        (**self).load()
    }

    fn save(&self, documents: &[Document]) -> Result<(), StoreError> {
        (**self).save(documents)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<T: SnapshotRepository + ?Sized> SnapshotRepository for Box<T> {
    fn load(&self) -> Result<Option<Vec<Document>>, StoreError> {
        (**self).load()
    }

    fn save(&self, documents: &[Document]) -> Result<(), StoreError> {
        (**self).save(documents)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Serialize the collection as a JSON array.
pub fn encode_snapshot(documents: &[Document]) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(documents).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Parse a JSON array of documents; timestamps come back as `DateTime<Utc>`.
pub fn decode_snapshot(bytes: &[u8]) -> Result<Vec<Document>, StoreError> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Malformed(e.to_string()))
}
