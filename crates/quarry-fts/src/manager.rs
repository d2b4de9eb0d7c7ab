//! Local index manager.
//!
//! `LocalIndexManager` owns everything needed to write one Tantivy index: the
//! writer (inside a processor driven by an orchestrator) and a reader sharing
//! the writer's refreshes. Document operations (add, update, delete) and
//! workspace operations (purge, flush, refresh) are queued as work sets and
//! resolve when their work set completes.
//!
//! Reads reload the reader once it is older than the refresh interval, so
//! committed changes become visible without a forced refresh. With the
//! default interval of zero every read sees the last commit.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use quarry_core::LoggingErrorHandler;
//! use quarry_fts::{
//!     DocumentCommitStrategy, DocumentRefreshStrategy, IndexDocument, IndexSettings,
//!     LocalIndexManager,
//! };
//!
//! let manager = LocalIndexManager::open(&IndexSettings::in_memory("books"), Arc::new(LoggingErrorHandler))?;
//! manager
//!     .add(
//!         IndexDocument::builder().id("b-1").field("title", "Dune").build(),
//!         DocumentCommitStrategy::Force,
//!         DocumentRefreshStrategy::Force,
//!     )
//!     .await?;
//! assert_eq!(manager.document_count(), 1);
//! manager.close().await?;
//! ```

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use quarry_core::{ErrorHandler, EventContext, Result};
use tantivy::IndexReader;

use crate::document::IndexDocument;
use crate::orchestrator::WriteWorkOrchestrator;
use crate::processor::WriteWorkProcessor;
use crate::settings::IndexSettings;
use crate::tantivy_writer::TantivyIndexWriter;
use crate::types::{DocumentCommitStrategy, DocumentRefreshStrategy, WorkSetResult};
use crate::work::{
    AddDocumentWork, DeleteDocumentWork, DocumentWork, FlushWork, PurgeWork, RefreshWork,
    UpdateDocumentWork,
};
use crate::writer::Opstamp;

/// Manager of one local Tantivy index.
pub struct LocalIndexManager {
    name: String,
    orchestrator: WriteWorkOrchestrator,
    reader: IndexReader,
    refresh_interval: Duration,
    last_reload: Mutex<Instant>,
}

impl LocalIndexManager {
    /// Open (or create) the index described by `settings`.
    ///
    /// Must be called from within a tokio runtime: the index's write worker
    /// is spawned on it.
    pub fn open(settings: &IndexSettings, error_handler: Arc<dyn ErrorHandler>) -> Result<Self> {
        settings.validate()?;

        let writer = TantivyIndexWriter::open(settings)?;
        let reader = writer.reader();

        let processor = WriteWorkProcessor::new(
            EventContext::index(settings.name.clone()),
            Box::new(writer),
            error_handler,
        )
        .with_commit_interval(settings.commit_interval());
        let orchestrator = WriteWorkOrchestrator::start(processor, settings.queue_size);

        log::info!(
            "Opened index '{}' ({})",
            settings.name,
            settings
                .index_path
                .as_ref()
                .map_or_else(|| "in memory".to_string(), |p| p.display().to_string())
        );

        Ok(Self {
            name: settings.name.clone(),
            orchestrator,
            reader,
            refresh_interval: settings.refresh_interval(),
            last_reload: Mutex::new(Instant::now()),
        })
    }

    /// Name of the index.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a document.
    pub async fn add(
        &self,
        document: IndexDocument,
        commit_strategy: DocumentCommitStrategy,
        refresh_strategy: DocumentRefreshStrategy,
    ) -> WorkSetResult<Opstamp> {
        self.orchestrator
            .submit(AddDocumentWork::new(document), commit_strategy, refresh_strategy)
            .await
    }

    /// Replace the document sharing `document.id`, or add it.
    pub async fn update(
        &self,
        document: IndexDocument,
        commit_strategy: DocumentCommitStrategy,
        refresh_strategy: DocumentRefreshStrategy,
    ) -> WorkSetResult<Opstamp> {
        self.orchestrator
            .submit(UpdateDocumentWork::new(document), commit_strategy, refresh_strategy)
            .await
    }

    /// Delete the document with `id`.
    pub async fn delete(
        &self,
        id: impl Into<String>,
        commit_strategy: DocumentCommitStrategy,
        refresh_strategy: DocumentRefreshStrategy,
    ) -> WorkSetResult<Opstamp> {
        self.orchestrator
            .submit(DeleteDocumentWork::new(id), commit_strategy, refresh_strategy)
            .await
    }

    /// Apply several document works as one workset.
    ///
    /// If one work fails, the works after it are skipped and the outcome is
    /// the failure; works before it stay applied.
    pub async fn apply_changeset(
        &self,
        works: Vec<DocumentWork>,
        commit_strategy: DocumentCommitStrategy,
        refresh_strategy: DocumentRefreshStrategy,
    ) -> WorkSetResult<()> {
        self.orchestrator
            .submit_changeset(works, commit_strategy, refresh_strategy)
            .await
    }

    /// Delete every document, then commit and refresh.
    pub async fn purge(&self) -> WorkSetResult<()> {
        self.orchestrator
            .submit(
                PurgeWork,
                DocumentCommitStrategy::Force,
                DocumentRefreshStrategy::Force,
            )
            .await
            .map(drop)
    }

    /// Commit every change applied so far.
    pub async fn flush(&self) -> WorkSetResult<()> {
        self.orchestrator
            .submit(
                FlushWork,
                DocumentCommitStrategy::Force,
                DocumentRefreshStrategy::None,
            )
            .await
    }

    /// Make every change applied so far visible to searches.
    pub async fn refresh(&self) -> WorkSetResult<()> {
        self.orchestrator
            .submit(
                RefreshWork,
                DocumentCommitStrategy::None,
                DocumentRefreshStrategy::Force,
            )
            .await
    }

    /// Number of documents visible to searches.
    pub fn document_count(&self) -> u64 {
        self.reader().searcher().num_docs()
    }

    /// Reader seeing the index, reloaded first if older than the refresh
    /// interval.
    pub fn reader(&self) -> &IndexReader {
        self.reload_if_stale();
        &self.reader
    }

    fn reload_if_stale(&self) {
        let mut last_reload = self
            .last_reload
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if last_reload.elapsed() < self.refresh_interval {
            return;
        }
        match self.reader.reload() {
            Ok(()) => *last_reload = Instant::now(),
            Err(e) => log::warn!("Failed to reload the reader of index '{}': {e}", self.name),
        }
    }

    /// Drain queued work, commit pending changes and release the index.
    pub async fn close(self) -> Result<()> {
        let Self {
            name, orchestrator, ..
        } = self;

        orchestrator
            .close()
            .await
            .inspect_err(|e| log::warn!("Failed to close index '{name}': {e}"))?;

        log::info!("Closed index '{name}'");
        Ok(())
    }
}

impl fmt::Debug for LocalIndexManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalIndexManager")
            .field("name", &self.name)
            .field("orchestrator", &self.orchestrator)
            .field("refresh_interval", &self.refresh_interval)
            .finish_non_exhaustive()
    }
}
