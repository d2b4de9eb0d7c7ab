//! Write-work orchestration for local full-text indexes.
//!
//! This crate serializes every mutation of a local index behind a single
//! processor, groups mutations into worksets with commit and refresh
//! strategies, and contains failures to the workset they happen in. The
//! Tantivy engine is the default backend (feature-gated); an in-memory engine
//! is always available.
//!
//! # Features
//!
//! - `fts-tantivy`: Tantivy index writer and the local index manager (default)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      quarry-fts                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  LocalIndexManager (document + workspace operations)        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  WriteWorkOrchestrator (bounded queue, one worker task)     │
//! │  WorkSet: SingleWorkSet, ChangesetWorkSet                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  WriteWorkProcessor (batches, worksets, commit/refresh)     │
//! │  WriteWork: add, update, delete, purge, flush, refresh      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  IndexWriterHandle trait                                    │
//! │  ├── TantivyIndexWriter (Tantivy index)                     │
//! │  └── InMemoryIndexWriter (maps, failure injection)          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Consistency
//!
//! | Commit | Refresh | After a successful workset |
//! |--------|---------|----------------------------|
//! | `None` | `None` | changes committed at the end of the batch |
//! | `Force` | `None` | changes committed |
//! | any | `Force` | changes committed and visible to searches |
//!
//! A failed workset is never committed by itself; changes applied before the
//! failure are committed with the rest of the batch.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use quarry_core::LoggingErrorHandler;
//! use quarry_fts::{DocumentCommitStrategy, DocumentRefreshStrategy, IndexDocument, IndexSettings, LocalIndexManager};
//!
//! let manager = LocalIndexManager::open(&IndexSettings::in_memory("books"), Arc::new(LoggingErrorHandler))?;
//! manager
//!     .add(
//!         IndexDocument::builder().id("b-1").field("title", "Dune").build(),
//!         DocumentCommitStrategy::None,
//!         DocumentRefreshStrategy::Force,
//!     )
//!     .await?;
//! manager.close().await?;
//! ```

// Core modules (always available)
pub mod document;
pub mod memory;
pub mod orchestrator;
pub mod processor;
pub mod settings;
pub mod types;
pub mod work;
pub mod workset;
pub mod writer;

// Feature-gated Tantivy modules
#[cfg(feature = "fts-tantivy")]
pub mod schema;

#[cfg(feature = "fts-tantivy")]
pub mod tantivy_writer;

#[cfg(feature = "fts-tantivy")]
pub mod manager;

// Re-exports
pub use document::{IndexDocument, IndexDocumentBuilder};
pub use memory::{InMemoryIndexProbe, InMemoryIndexWriter, WriterEvent};
pub use orchestrator::WriteWorkOrchestrator;
pub use processor::WriteWorkProcessor;
pub use settings::IndexSettings;
pub use types::{
    DocumentCommitStrategy, DocumentRefreshStrategy, WorkOutcome, WorkSetFuture, WorkSetResult,
};
pub use work::{
    AddDocumentWork, DeleteDocumentWork, DocumentWork, FlushWork, PurgeWork, RefreshWork,
    UpdateDocumentWork, WriteWork, WriteWorkExecutionContext,
};
pub use workset::{ChangesetWorkSet, SingleWorkSet, WorkSet, WorkSetReceiver};
pub use writer::{IndexWriterHandle, Opstamp};

#[cfg(feature = "fts-tantivy")]
pub use schema::IndexSchema;

#[cfg(feature = "fts-tantivy")]
pub use tantivy_writer::TantivyIndexWriter;

#[cfg(feature = "fts-tantivy")]
pub use manager::LocalIndexManager;
