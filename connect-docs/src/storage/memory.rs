//! In-process key-value snapshot storage.
//!
//! Behaves like browser local storage: string values under string keys,
//! lost when the process exits. Share one instance between stores through
//! `Arc<MemoryRepository>` to simulate a reload within the same process.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use connect_core::Document;

use super::{decode_snapshot, encode_snapshot, SnapshotRepository, StoreError};

pub const DEFAULT_KEY: &str = "documents";

#[derive(Debug)]
pub struct MemoryRepository {
    key: String,
    slots: Mutex<HashMap<String, String>>,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::with_key(DEFAULT_KEY)
    }

    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Raw stored text, if any.
    pub fn raw(&self) -> Option<String> {
        self.slots().get(&self.key).cloned()
    }

    /// Overwrite the stored text verbatim (no validation).
    pub fn put_raw(&self, text: impl Into<String>) {
        let key = self.key.clone();
        self.slots().insert(key, text.into());
    }

    pub fn clear(&self) {
        let key = self.key.clone();
        self.slots().remove(&key);
    }
}

impl SnapshotRepository for MemoryRepository {
    fn load(&self) -> Result<Option<Vec<Document>>, StoreError> {
        match self.raw() {
            Some(text) => decode_snapshot(text.as_bytes()).map(Some),
            None => Ok(None),
        }
    }

    fn save(&self, documents: &[Document]) -> Result<(), StoreError> {
        let bytes = encode_snapshot(documents)?;
        let text = String::from_utf8(bytes).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.put_raw(text);
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connect_core::{DocumentCategory, DocumentType};

    #[test]
    fn test_empty_repository_loads_none() {
        let repo = MemoryRepository::new();
        assert_eq!(repo.load().unwrap(), None);
    }

    #[test]
    fn test_save_then_load() {
        let repo = MemoryRepository::with_key("crm.documents");
        let docs = vec![Document::new("Q3 Report", DocumentType::Report, DocumentCategory::Financial, "lisa.park")];
        repo.save(&docs).unwrap();
        assert_eq!(repo.load().unwrap(), Some(docs));
        assert!(repo.raw().unwrap().contains("Q3 Report"));
    }

    #[test]
    fn test_corrupt_text_is_malformed() {
        let repo = MemoryRepository::new();
        repo.put_raw("[{\"id\":1}");
        assert!(matches!(repo.load(), Err(StoreError::Malformed(_))));
        repo.clear();
        assert_eq!(repo.load().unwrap(), None);
    }
}
