//! Work sets.
//!
//! A work set is what callers queue: one or more works sharing a commit and a
//! refresh strategy, plus the channel its outcome is delivered on.

use quarry_core::{Result, SharedError};
use tokio::sync::oneshot;

use crate::processor::WriteWorkProcessor;
use crate::types::{DocumentCommitStrategy, DocumentRefreshStrategy, WorkSetFuture, WorkSetResult};
use crate::work::{DocumentWork, WriteWork};

/// Receiving half of a work set's outcome.
pub type WorkSetReceiver<T> = oneshot::Receiver<WorkSetResult<T>>;

/// A unit of queued work.
pub trait WorkSet: Send {
    /// Run the work set as one workset of the processor's current batch.
    ///
    /// Work failures resolve the work set's outcome; only protocol violations
    /// are returned.
    fn submit_to(self: Box<Self>, processor: &mut WriteWorkProcessor) -> Result<()>;

    /// Resolve the outcome with `error` without running anything.
    fn fail(self: Box<Self>, error: SharedError);
}

/// A work set holding a single work; its outcome is the work's output.
pub struct SingleWorkSet<K: WriteWork> {
    work: K,
    commit_strategy: DocumentCommitStrategy,
    refresh_strategy: DocumentRefreshStrategy,
    future: WorkSetFuture<K::Output>,
}

impl<K: WriteWork> SingleWorkSet<K> {
    /// Create a work set and the receiver its outcome will be sent to.
    pub fn new(
        work: K,
        commit_strategy: DocumentCommitStrategy,
        refresh_strategy: DocumentRefreshStrategy,
    ) -> (Self, WorkSetReceiver<K::Output>) {
        let (future, receiver) = oneshot::channel();
        let work_set = Self {
            work,
            commit_strategy,
            refresh_strategy,
            future,
        };
        (work_set, receiver)
    }
}

impl<K: WriteWork> WorkSet for SingleWorkSet<K> {
    fn submit_to(self: Box<Self>, processor: &mut WriteWorkProcessor) -> Result<()> {
        let Self {
            work,
            commit_strategy,
            refresh_strategy,
            future,
        } = *self;

        processor.before_work_set(commit_strategy, refresh_strategy)?;
        let outcome = processor.submit(&work)?;
        processor.after_work_set(future, outcome.into_option())
    }

    fn fail(self: Box<Self>, error: SharedError) {
        let _ = self.future.send(Err(error));
    }
}

/// Several document works applied as one workset; its outcome is `()`.
pub struct ChangesetWorkSet {
    works: Vec<DocumentWork>,
    commit_strategy: DocumentCommitStrategy,
    refresh_strategy: DocumentRefreshStrategy,
    future: WorkSetFuture<()>,
}

impl ChangesetWorkSet {
    /// Create a work set and the receiver its outcome will be sent to.
    pub fn new(
        works: Vec<DocumentWork>,
        commit_strategy: DocumentCommitStrategy,
        refresh_strategy: DocumentRefreshStrategy,
    ) -> (Self, WorkSetReceiver<()>) {
        let (future, receiver) = oneshot::channel();
        let work_set = Self {
            works,
            commit_strategy,
            refresh_strategy,
            future,
        };
        (work_set, receiver)
    }

    /// Number of works in the changeset.
    pub fn len(&self) -> usize {
        self.works.len()
    }

    /// Returns `true` if the changeset holds no work.
    pub fn is_empty(&self) -> bool {
        self.works.is_empty()
    }
}

impl WorkSet for ChangesetWorkSet {
    fn submit_to(self: Box<Self>, processor: &mut WriteWorkProcessor) -> Result<()> {
        let Self {
            works,
            commit_strategy,
            refresh_strategy,
            future,
        } = *self;

        processor.before_work_set(commit_strategy, refresh_strategy)?;
        for work in &works {
            // Failures and skips are tracked by the processor for the workset.
            let _outcome = processor.submit(work)?;
        }
        processor.after_work_set(future, Some(()))
    }

    fn fail(self: Box<Self>, error: SharedError) {
        let _ = self.future.send(Err(error));
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::document::IndexDocument;
    use crate::memory::{InMemoryIndexProbe, InMemoryIndexWriter};
    use crate::work::AddDocumentWork;
    use quarry_core::{CollectingErrorHandler, Error, EventContext};

    fn processor() -> (WriteWorkProcessor, InMemoryIndexProbe, Arc<CollectingErrorHandler>) {
        let writer = InMemoryIndexWriter::new();
        let probe = writer.probe();
        let handler = Arc::new(CollectingErrorHandler::new());
        let processor =
            WriteWorkProcessor::new(EventContext::index("books"), Box::new(writer), handler.clone());
        (processor, probe, handler)
    }

    #[test]
    fn test_single_work_set_yields_work_output() {
        let (mut processor, probe, _) = processor();
        let (work_set, mut receiver) = SingleWorkSet::new(
            AddDocumentWork::new(IndexDocument::new("a")),
            DocumentCommitStrategy::Force,
            DocumentRefreshStrategy::None,
        );

        processor.begin_batch().unwrap();
        Box::new(work_set).submit_to(&mut processor).unwrap();
        processor.end_batch().unwrap();

        assert_eq!(receiver.try_recv().unwrap().unwrap(), 1);
        assert_eq!(probe.commit_count(), 1);
    }

    #[test]
    fn test_single_work_set_failure() {
        let (mut processor, probe, handler) = processor();
        probe.fail_document("a");
        let (work_set, mut receiver) = SingleWorkSet::new(
            AddDocumentWork::new(IndexDocument::new("a")),
            DocumentCommitStrategy::Force,
            DocumentRefreshStrategy::None,
        );

        processor.begin_batch().unwrap();
        Box::new(work_set).submit_to(&mut processor).unwrap();
        processor.end_batch().unwrap();

        let err = receiver.try_recv().unwrap().unwrap_err();
        assert!(err.to_string().contains("Injected failure"));
        assert_eq!(probe.commit_count(), 0);
        assert_eq!(handler.reports().len(), 1);
    }

    #[test]
    fn test_changeset_skips_after_failure() {
        let (mut processor, probe, handler) = processor();
        probe.fail_document("b");
        let (work_set, mut receiver) = ChangesetWorkSet::new(
            vec![
                DocumentWork::add(IndexDocument::new("a")),
                DocumentWork::add(IndexDocument::new("b")),
                DocumentWork::delete("c"),
            ],
            DocumentCommitStrategy::None,
            DocumentRefreshStrategy::None,
        );
        assert_eq!(work_set.len(), 3);

        processor.begin_batch().unwrap();
        Box::new(work_set).submit_to(&mut processor).unwrap();
        processor.end_batch().unwrap();

        assert!(receiver.try_recv().unwrap().is_err());
        let reports = handler.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].failed[0].info.as_str(), "add document 'b'");
        assert_eq!(reports[0].skipped[0].as_str(), "delete document 'c'");

        // "a" was applied before the failure and is committed at batch end.
        assert_eq!(probe.committed_ids(), vec!["a"]);
    }

    #[test]
    fn test_fail_resolves_outcome() {
        let (work_set, mut receiver) =
            ChangesetWorkSet::new(Vec::new(), DocumentCommitStrategy::None, DocumentRefreshStrategy::None);
        assert!(work_set.is_empty());

        Box::new(work_set).fail(Arc::new(Error::closed(EventContext::index("books"))));
        let err = receiver.try_recv().unwrap().unwrap_err();
        assert!(err.to_string().contains("is closed"));
    }
}
