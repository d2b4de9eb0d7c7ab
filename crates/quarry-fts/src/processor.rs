//! Write work processor.
//!
//! The processor serializes every mutation of one index. Callers drive it
//! through a batch/workset protocol:
//!
//! ```text
//! begin_batch
//!   before_work_set(commit, refresh)
//!     submit(work) ...
//!   after_work_set(future, value)
//!   ...more worksets...
//! end_batch
//! ```
//!
//! Failures never escape a workset: the first failing work opens a
//! [`ContextualErrorHandler`], every later work of the same workset is
//! skipped, and the workset's future is failed with the original cause.
//! Commits are forced per workset when its strategies ask for it and are
//! otherwise deferred to the end of the batch.
//!
//! The processor is not internally synchronized; exactly one executor may
//! drive it (see [`WriteWorkOrchestrator`](crate::WriteWorkOrchestrator)).

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use quarry_core::{
    Closer, ContextualErrorHandler, Error, ErrorHandler, EventContext, Result, SharedError,
};

use crate::types::{
    DocumentCommitStrategy, DocumentRefreshStrategy, WorkOutcome, WorkSetFuture, WorkSetResult,
};
use crate::work::{WriteWork, WriteWorkExecutionContext};
use crate::writer::IndexWriterHandle;

/// State of the workset currently open.
struct WorkSetState {
    commit_strategy: DocumentCommitStrategy,
    refresh_strategy: DocumentRefreshStrategy,
    errors: Option<ContextualErrorHandler>,
}

impl WorkSetState {
    fn needs_commit(&self) -> bool {
        self.commit_strategy == DocumentCommitStrategy::Force
            || self.refresh_strategy == DocumentRefreshStrategy::Force
    }
}

/// Executes write works against a single index writer.
pub struct WriteWorkProcessor {
    event_context: EventContext,
    writer: Box<dyn IndexWriterHandle>,
    error_handler: Arc<dyn ErrorHandler>,
    commit_interval: Duration,
    last_commit: Option<Instant>,
    has_uncommitted_changes: bool,
    batch_open: bool,
    work_set: Option<WorkSetState>,
}

impl WriteWorkProcessor {
    /// Create a processor owning `writer`.
    pub fn new(
        event_context: EventContext,
        writer: Box<dyn IndexWriterHandle>,
        error_handler: Arc<dyn ErrorHandler>,
    ) -> Self {
        Self {
            event_context,
            writer,
            error_handler,
            commit_interval: Duration::ZERO,
            last_commit: None,
            has_uncommitted_changes: false,
            batch_open: false,
            work_set: None,
        }
    }

    /// Defer end-of-batch commits until `interval` has elapsed since the
    /// previous commit.
    ///
    /// A zero interval (the default) commits at the end of every batch that
    /// left changes uncommitted.
    pub fn with_commit_interval(mut self, interval: Duration) -> Self {
        self.commit_interval = interval;
        self
    }

    /// Identity of the index this processor writes to.
    pub fn event_context(&self) -> &EventContext {
        &self.event_context
    }

    /// Returns `true` if changes were applied since the last commit attempt.
    pub fn has_pending_changes(&self) -> bool {
        self.has_uncommitted_changes
    }

    /// Open a batch.
    pub fn begin_batch(&mut self) -> Result<()> {
        if self.batch_open {
            return Err(Error::illegal_state(format!(
                "A batch is already open on {}",
                self.event_context
            )));
        }
        self.batch_open = true;
        Ok(())
    }

    /// Open a workset with the given strategies.
    pub fn before_work_set(
        &mut self,
        commit_strategy: DocumentCommitStrategy,
        refresh_strategy: DocumentRefreshStrategy,
    ) -> Result<()> {
        if self.work_set.is_some() {
            return Err(Error::illegal_state(format!(
                "A workset is already open on {}",
                self.event_context
            )));
        }
        self.work_set = Some(WorkSetState {
            commit_strategy,
            refresh_strategy,
            errors: None,
        });
        Ok(())
    }

    /// Execute one work of the current workset.
    ///
    /// Work failures are not returned: they are recorded for the workset and
    /// reported as [`WorkOutcome::Failed`]. Once a work has failed, the
    /// remaining works of the workset are not executed.
    pub fn submit<K>(&mut self, work: &K) -> Result<WorkOutcome<K::Output>>
    where
        K: WriteWork + ?Sized,
    {
        let Some(work_set) = self.work_set.as_mut() else {
            return Err(Error::illegal_state(format!(
                "No workset is open on {}",
                self.event_context
            )));
        };

        if let Some(errors) = work_set.errors.as_mut() {
            errors.mark_as_skipped(work.info());
            return Ok(WorkOutcome::Skipped);
        }

        let mut context =
            WriteWorkExecutionContext::new(self.writer.as_mut(), &self.event_context);
        match work.execute(&mut context) {
            Ok(value) => {
                self.has_uncommitted_changes = true;
                Ok(WorkOutcome::Executed(value))
            }
            Err(e) => {
                log::debug!("Work '{}' failed on {}: {e}", work.info(), self.event_context);
                let mut errors = ContextualErrorHandler::new(
                    Arc::clone(&self.error_handler),
                    self.event_context.clone(),
                );
                errors.mark_as_failed(work.info(), Arc::new(e));
                work_set.errors = Some(errors);
                Ok(WorkOutcome::Failed)
            }
        }
    }

    /// Close the current workset and resolve its future.
    ///
    /// `value` is what the future resolves to on success. A failed workset
    /// resolves its future with the cause of the first failing work and is
    /// never committed or refreshed.
    pub fn after_work_set<T>(&mut self, future: WorkSetFuture<T>, value: Option<T>) -> Result<()> {
        let Some(work_set) = self.work_set.take() else {
            return Err(Error::illegal_state(format!(
                "No workset is open on {}",
                self.event_context
            )));
        };

        let needs_commit = work_set.needs_commit();
        let WorkSetState {
            refresh_strategy,
            errors,
            ..
        } = work_set;

        if let Some(errors) = errors {
            let cause = errors
                .originating_cause()
                .cloned()
                .unwrap_or_else(|| Arc::new(Error::operation("Workset failed")));
            errors.handle();
            self.complete(future, Err(cause));
            return Ok(());
        }

        if needs_commit {
            if let Err(e) = self.commit_now() {
                let error: SharedError = Arc::new(e);
                let mut errors = ContextualErrorHandler::new(
                    Arc::clone(&self.error_handler),
                    self.event_context.clone(),
                );
                errors.add_error(Arc::clone(&error));
                errors.handle();
                self.complete(future, Err(error));
                return Ok(());
            }
            if refresh_strategy == DocumentRefreshStrategy::Force {
                self.refresh();
            }
        }

        match value {
            Some(value) => {
                self.complete(future, Ok(value));
                Ok(())
            }
            None => {
                let message = format!(
                    "Workset on {} succeeded without producing a value",
                    self.event_context
                );
                self.complete(future, Err(Arc::new(Error::illegal_state(message.clone()))));
                Err(Error::illegal_state(message))
            }
        }
    }

    /// Close the current batch, committing changes left pending.
    ///
    /// A commit failure here has no workset to fail; it is reported through
    /// [`ErrorHandler::handle_exception`] and not returned.
    pub fn end_batch(&mut self) -> Result<()> {
        if !self.batch_open {
            return Err(Error::illegal_state(format!(
                "No batch is open on {}",
                self.event_context
            )));
        }
        if self.work_set.is_some() {
            return Err(Error::illegal_state(format!(
                "Cannot end a batch on {} while a workset is open",
                self.event_context
            )));
        }
        self.batch_open = false;

        if matches!(self.pending_commit_delay(), Some(delay) if delay.is_zero()) {
            self.commit_pending();
        }
        Ok(())
    }

    /// How long a deferred commit may still wait, or `None` if nothing is
    /// pending.
    pub fn pending_commit_delay(&self) -> Option<Duration> {
        if !self.has_uncommitted_changes {
            return None;
        }
        let elapsed = self
            .last_commit
            .map_or(self.commit_interval, |last| last.elapsed());
        Some(self.commit_interval.saturating_sub(elapsed))
    }

    /// Commit pending changes now, reporting a failure to the error handler.
    pub fn commit_pending(&mut self) {
        if !self.has_uncommitted_changes {
            return;
        }
        if let Err(e) = self.commit_now() {
            let message = e.to_string();
            self.error_handler.handle_exception(&message, Arc::new(e));
        }
    }

    /// Commit pending changes, then close the writer.
    ///
    /// Both steps run even if the first fails; failures are aggregated.
    pub fn close(mut self) -> Result<()> {
        let message = format!("Failed to shut down {}", self.event_context);
        if self.work_set.is_some() {
            log::warn!("Closing {} with a workset still open", self.event_context);
        }

        let mut closer = Closer::new();
        if self.has_uncommitted_changes {
            closer.push(|| self.commit_now());
        }
        closer.push(|| self.writer.close());
        if closer.failure_count() > 0 {
            log::warn!(
                "{} release step(s) of {} failed",
                closer.failure_count(),
                self.event_context
            );
        }
        closer.finish(message)
    }

    /// Attempt a commit. The pending flag is cleared whatever the outcome.
    fn commit_now(&mut self) -> Result<()> {
        self.has_uncommitted_changes = false;
        self.last_commit = Some(Instant::now());
        match self.writer.commit() {
            Ok(opstamp) => {
                log::debug!("Committed {} at opstamp {opstamp}", self.event_context);
                Ok(())
            }
            Err(e) => Err(Error::commit(self.event_context.clone(), e)),
        }
    }

    fn refresh(&mut self) {
        if let Err(e) = self.writer.refresh() {
            log::warn!("Unable to refresh readers of {}: {e}", self.event_context);
        }
    }

    fn complete<T>(&self, future: WorkSetFuture<T>, result: WorkSetResult<T>) {
        if future.send(result).is_err() {
            log::debug!(
                "Outcome of a workset on {} was dropped by its submitter",
                self.event_context
            );
        }
    }
}

impl fmt::Debug for WriteWorkProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteWorkProcessor")
            .field("event_context", &self.event_context)
            .field("commit_interval", &self.commit_interval)
            .field("has_uncommitted_changes", &self.has_uncommitted_changes)
            .field("batch_open", &self.batch_open)
            .field("work_set_open", &self.work_set.is_some())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
