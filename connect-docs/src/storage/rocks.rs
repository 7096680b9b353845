//! RocksDB-backed snapshot repository.
//!
//! Keys (default column family):
//! - `{namespace}`: the document collection as a JSON array (LZ4 compressed)
//! - `{namespace}:meta`: `SnapshotMetadata` as JSON (counts, sizes, saved_at)
//!
//! Snapshot and metadata are written in one `WriteBatch`, so a reader never
//! sees a snapshot paired with metadata from a different save.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use connect_core::Document;
use rocksdb::{BlockBasedOptions, DBCompressionType, Options, WriteBatch, WriteOptions, DB};
use serde::{Deserialize, Serialize};

use super::{decode_snapshot, encode_snapshot, SnapshotRepository, StoreError};

/// Repository configuration.
#[derive(Debug, Clone)]
pub struct RocksConfig {
    /// Database directory path
    pub path: PathBuf,
    /// Key holding the snapshot (default: "documents")
    pub namespace: String,
    /// fsync on every save (default: false)
    pub sync_writes: bool,
    /// LZ4-compress the JSON blob (default: true)
    pub compress: bool,
}

impl Default for RocksConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("connect_data"),
            namespace: "documents".to_string(),
            sync_writes: false,
            compress: true,
        }
    }
}

impl RocksConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Config for tests: synced writes so a reopen in the same test sees them.
    pub fn for_testing(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            namespace: "documents".to_string(),
            sync_writes: true,
            compress: true,
        }
    }
}

/// Stored next to each snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    pub document_count: usize,
    /// Uncompressed JSON size in bytes
    pub raw_size: u64,
    /// Bytes actually written under the namespace key
    pub stored_size: u64,
    pub compressed: bool,
    pub saved_at: DateTime<Utc>,
}

pub struct RocksRepository {
    db: DB,
    config: RocksConfig,
}

impl RocksRepository {
    /// Open (or create) the database at `config.path`.
    pub fn open(config: RocksConfig) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_keep_log_file_num(5);

        let mut block_opts = BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        opts.set_block_based_table_factory(&block_opts);
        // Values are already LZ4 framed when `compress` is on.
        opts.set_compression_type(if config.compress {
            DBCompressionType::None
        } else {
            DBCompressionType::Lz4
        });

        let db = DB::open(&opts, &config.path)?;
        log::info!(
            "opened snapshot database at {} (namespace {:?})",
            config.path.display(),
            config.namespace
        );
        Ok(Self { db, config })
    }

    pub fn config(&self) -> &RocksConfig {
        &self.config
    }

    fn meta_key(&self) -> String {
        format!("{}:meta", self.config.namespace)
    }

    /// Metadata of the last save, if any.
    pub fn metadata(&self) -> Result<Option<SnapshotMetadata>, StoreError> {
        match self.db.get(self.meta_key())? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StoreError::Malformed(e.to_string())),
            None => Ok(None),
        }
    }

    /// Overwrite the snapshot key with arbitrary bytes and drop its metadata.
    pub fn put_raw(&self, bytes: &[u8]) -> Result<(), StoreError> {
        let mut batch = WriteBatch::default();
        batch.put(self.config.namespace.as_bytes(), bytes);
        batch.delete(self.meta_key());
        self.write(batch)
    }

    /// Remove the snapshot and its metadata.
    pub fn clear(&self) -> Result<(), StoreError> {
        let mut batch = WriteBatch::default();
        batch.delete(self.config.namespace.as_bytes());
        batch.delete(self.meta_key());
        self.write(batch)
    }

    /// Force memtables to disk.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    fn write(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(self.config.sync_writes);
        self.db.write_opt(batch, &write_opts)?;
        Ok(())
    }

    fn unpack(&self, stored: &[u8]) -> Result<Vec<u8>, StoreError> {
        // Metadata wins over the current config so toggling `compress`
        // does not strand an existing snapshot.
        let compressed = match self.metadata() {
            Ok(Some(meta)) => meta.compressed,
            _ => self.config.compress,
        };
        if compressed {
            lz4_flex::decompress_size_prepended(stored)
                .map_err(|e| StoreError::Compression(e.to_string()))
        } else {
            Ok(stored.to_vec())
        }
    }
}

impl SnapshotRepository for RocksRepository {
    fn load(&self) -> Result<Option<Vec<Document>>, StoreError> {
        let Some(stored) = self.db.get(self.config.namespace.as_bytes())? else {
            return Ok(None);
        };
        let json = self.unpack(&stored)?;
        decode_snapshot(&json).map(Some)
    }

    fn save(&self, documents: &[Document]) -> Result<(), StoreError> {
        let json = encode_snapshot(documents)?;
        let stored = if self.config.compress {
            lz4_flex::compress_prepend_size(&json)
        } else {
            json.clone()
        };

        let meta = SnapshotMetadata {
            document_count: documents.len(),
            raw_size: json.len() as u64,
            stored_size: stored.len() as u64,
            compressed: self.config.compress,
            saved_at: Utc::now(),
        };
        let meta_bytes =
            serde_json::to_vec(&meta).map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut batch = WriteBatch::default();
        batch.put(self.config.namespace.as_bytes(), &stored);
        batch.put(self.meta_key(), &meta_bytes);
        self.write(batch)?;

        log::debug!(
            "saved {} documents ({} -> {} bytes)",
            meta.document_count,
            meta.raw_size,
            meta.stored_size
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "rocksdb"
    }
}
