//! Persistence integration tests.
//!
//! Verifies:
//! - Snapshot save/reload through a fresh store session (memory and RocksDB)
//! - Timestamps come back as equal `DateTime<Utc>` values
//! - Malformed snapshots fall back to the synthetic dataset
//! - Every mutation is written through

use std::sync::Arc;

use connect_core::{AccessAction, Document, DocumentCategory, DocumentType};
use connect_docs::seed;
use connect_docs::{
    DocumentStore, MemoryRepository, RocksConfig, RocksRepository, SnapshotRepository,
    StoreConfig,
};
use tempfile::tempdir;

// ─── Memory repository ───────────────────────────────────────────────────────

#[test]
fn test_fresh_session_sees_same_collection() {
    let repo = Arc::new(MemoryRepository::new());
    let first = DocumentStore::open(repo.clone(), StoreConfig::default());
    let before = first.documents().to_vec();
    first.dispose();

    let second = DocumentStore::open(repo, StoreConfig { seed: 999, ..StoreConfig::default() });
    assert_eq!(second.documents(), before.as_slice());
    assert_eq!(second.documents()[0].uploaded_at, before[0].uploaded_at);
}

#[test]
fn test_each_mutation_is_written_through() {
    let repo = Arc::new(MemoryRepository::new());
    let mut store = DocumentStore::open(repo.clone(), StoreConfig::for_testing());
    let doc = store.create(Document::new("Plan", DocumentType::Report, DocumentCategory::Internal, "x"));
    assert_eq!(repo.load().unwrap().unwrap().len(), 1);

    store.record_access(&doc.id, "y", AccessAction::Download, None);
    let stored = repo.load().unwrap().unwrap();
    assert_eq!(stored[0].access_log.len(), 1);

    store.delete(&doc.id);
    assert!(repo.load().unwrap().unwrap().is_empty());
}

#[test]
fn test_malformed_snapshot_regenerates_seed() {
    let repo = Arc::new(MemoryRepository::new());
    repo.put_raw("{\"this is\": \"not a document list\"");

    let store = DocumentStore::open(repo.clone(), StoreConfig::default());
    let expected = seed::generate_documents(48, 42);
    let ids: Vec<_> = store.documents().iter().map(|d| d.id.clone()).collect();
    let expected_ids: Vec<_> = expected.iter().map(|d| d.id.clone()).collect();
    assert_eq!(ids, expected_ids);
    assert_eq!(repo.load().unwrap().unwrap().len(), 48);
}

// ─── RocksDB repository ──────────────────────────────────────────────────────

#[test]
fn test_rocks_reopen_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db");

    let before = {
        let repo = RocksRepository::open(RocksConfig::for_testing(&path)).unwrap();
        let mut store = DocumentStore::open(repo, StoreConfig::default());
        let nda = store.workflow_template(seed::NDA_WORKFLOW).unwrap().instantiate();
        let doc = store.create(
            Document::new("Reopen NDA", DocumentType::Nda, DocumentCategory::Legal, "sarah.chen")
                .with_content("body"),
        );
        store.attach_workflow(&doc.id, nda);
        store.approve(&doc.id, "legal.team", None);
        let snapshot = store.documents().to_vec();
        store.dispose();
        snapshot
    };

    let repo = RocksRepository::open(RocksConfig::for_testing(&path)).unwrap();
    let meta = repo.metadata().unwrap().unwrap();
    assert_eq!(meta.document_count, before.len());

    let store = DocumentStore::open(repo, StoreConfig::default());
    assert_eq!(store.documents(), before.as_slice());
    let reopened = &store.documents()[0];
    assert_eq!(reopened.name, "Reopen NDA");
    let workflow = reopened.approval_workflow.as_ref().unwrap();
    assert_eq!(workflow.completed_at, before[0].approval_workflow.as_ref().unwrap().completed_at);
}

#[test]
fn test_rocks_garbage_falls_back_to_seed() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("db");
    {
        let repo = RocksRepository::open(RocksConfig::for_testing(&path)).unwrap();
        repo.put_raw(b"\x08\x00\x00\x00\xff\xff\xff").unwrap();
    }

    let repo = RocksRepository::open(RocksConfig::for_testing(&path)).unwrap();
    let store = DocumentStore::open(repo, StoreConfig::default());
    assert_eq!(store.len(), 48);

    drop(store);
    let repo = RocksRepository::open(RocksConfig::for_testing(&path)).unwrap();
    assert_eq!(repo.load().unwrap().map(|d| d.len()), Some(48));
}
