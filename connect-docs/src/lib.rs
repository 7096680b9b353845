//! # connect-docs: Document services for the WorldAPI Connect console
//!
//! Stateful layer over `connect-core`: the document store with write-through
//! snapshot persistence, the in-process event bus and the partner onboarding
//! sync adapter.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐  DocumentCatalog  ┌─────────────────┐
//! │ UnifiedSync      │ ────────────────► │ DocumentStore   │
//! │ Adapter          │                   │ (in-memory)     │
//! └────────┬─────────┘                   └──┬───────────┬──┘
//!          │ onboarding_status_update       │ save/load │ document_approved
//!          ▼                                ▼           │ document_rejected
//! ┌──────────────────┐              ┌───────────────┐   │
//! │ EventBus         │ ◄─────────── │ Snapshot      │   │
//! │ (tokio broadcast)│ ◄────────────┼───────────────┼───┘
//! └──────────────────┘              │ Repository    │
//!                                   │ memory│rocksdb│
//!                                   └───────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`store`]: `DocumentStore`: CRUD, workflow actions, templates, folders
//! - [`storage`]: `SnapshotRepository` with memory and RocksDB backends
//! - [`events`]: Broadcast event bus for console listeners
//! - [`sync`]: Partner upload ingestion with workflow attachment
//! - [`seed`]: Deterministic synthetic dataset and built-in templates

pub mod events;
pub mod seed;
pub mod storage;
pub mod store;
pub mod sync;

// Re-exports for convenience
pub use events::{ConsoleEvent, EventBus, EventStats, NotificationLevel};
pub use storage::{
    MemoryRepository, RocksConfig, RocksRepository, SnapshotMetadata, SnapshotRepository,
    StoreError,
};
pub use store::{BatchResult, DocumentStats, DocumentStore, StoreConfig};
pub use sync::{
    resolve_workflow_name, DocumentCatalog, PartnerUpload, SyncConfig, SyncError, SyncReceipt,
    UnifiedSyncAdapter,
};
