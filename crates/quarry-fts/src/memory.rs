//! In-memory index engine.
//!
//! `InMemoryIndexWriter` keeps three generations of documents (staged,
//! committed, visible) in ordered maps, which is enough to observe the
//! commit and refresh behavior of the write path without an index on disk.
//! An [`InMemoryIndexProbe`] shares the writer's state, so the writer can be
//! moved into a processor while tests keep inspecting it and injecting
//! failures.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use quarry_core::{Error, Result};

use crate::document::IndexDocument;
use crate::writer::{IndexWriterHandle, Opstamp};

/// A successful call made on an [`InMemoryIndexWriter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriterEvent {
    /// A document was staged.
    Add(String),
    /// A document deletion was staged.
    Delete(String),
    /// Deletion of all documents was staged.
    DeleteAll,
    /// Staged changes were committed.
    Commit,
    /// Committed changes were made visible.
    Refresh,
    /// The writer was closed.
    Close,
}

#[derive(Debug, Default)]
struct State {
    staged: BTreeMap<String, IndexDocument>,
    committed: BTreeMap<String, IndexDocument>,
    visible: BTreeMap<String, IndexDocument>,
    opstamp: Opstamp,
    events: Vec<WriterEvent>,
    failing_ids: HashSet<String>,
    failing_commits: usize,
    failing_refresh: bool,
    failing_close: bool,
    closed: bool,
}

impl State {
    fn next_opstamp(&mut self) -> Opstamp {
        self.opstamp += 1;
        self.opstamp
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::illegal_state("In-memory writer is closed"));
        }
        Ok(())
    }
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Map-backed index writer.
#[derive(Debug, Default)]
pub struct InMemoryIndexWriter {
    state: Arc<Mutex<State>>,
}

impl InMemoryIndexWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a probe sharing this writer's state.
    pub fn probe(&self) -> InMemoryIndexProbe {
        InMemoryIndexProbe {
            state: Arc::clone(&self.state),
        }
    }
}

impl IndexWriterHandle for InMemoryIndexWriter {
    fn add_document(&mut self, document: &IndexDocument) -> Result<Opstamp> {
        let mut state = lock(&self.state);
        state.ensure_open()?;
        if state.failing_ids.contains(&document.id) {
            return Err(Error::engine(format!(
                "Injected failure for document '{}'",
                document.id
            )));
        }
        state
            .staged
            .insert(document.id.clone(), document.clone());
        state.events.push(WriterEvent::Add(document.id.clone()));
        Ok(state.next_opstamp())
    }

    fn delete_document(&mut self, id: &str) -> Result<Opstamp> {
        let mut state = lock(&self.state);
        state.ensure_open()?;
        if state.failing_ids.contains(id) {
            return Err(Error::engine(format!(
                "Injected failure for document '{id}'"
            )));
        }
        state.staged.remove(id);
        state.events.push(WriterEvent::Delete(id.to_string()));
        Ok(state.next_opstamp())
    }

    fn delete_all(&mut self) -> Result<Opstamp> {
        let mut state = lock(&self.state);
        state.ensure_open()?;
        state.staged.clear();
        state.events.push(WriterEvent::DeleteAll);
        Ok(state.next_opstamp())
    }

    fn commit(&mut self) -> Result<Opstamp> {
        let mut state = lock(&self.state);
        state.ensure_open()?;
        if state.failing_commits > 0 {
            state.failing_commits -= 1;
            return Err(Error::engine("Injected commit failure"));
        }
        state.committed = state.staged.clone();
        state.events.push(WriterEvent::Commit);
        Ok(state.next_opstamp())
    }

    fn refresh(&mut self) -> Result<()> {
        let mut state = lock(&self.state);
        state.ensure_open()?;
        if state.failing_refresh {
            return Err(Error::engine("Injected refresh failure"));
        }
        state.visible = state.committed.clone();
        state.events.push(WriterEvent::Refresh);
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<()> {
        let mut state = lock(&self.state);
        state.ensure_open()?;
        state.closed = true;
        if state.failing_close {
            return Err(Error::engine("Injected close failure"));
        }
        // Uncommitted changes are lost, like with a real engine.
        state.staged = state.committed.clone();
        state.events.push(WriterEvent::Close);
        Ok(())
    }
}

/// Shared view of an [`InMemoryIndexWriter`]'s state.
#[derive(Debug, Clone)]
pub struct InMemoryIndexProbe {
    state: Arc<Mutex<State>>,
}

impl InMemoryIndexProbe {
    /// Every successful call made on the writer, in order.
    pub fn events(&self) -> Vec<WriterEvent> {
        lock(&self.state).events.clone()
    }

    /// Number of successful commits.
    pub fn commit_count(&self) -> usize {
        self.count(|event| matches!(event, WriterEvent::Commit))
    }

    /// Number of successful refreshes.
    pub fn refresh_count(&self) -> usize {
        self.count(|event| matches!(event, WriterEvent::Refresh))
    }

    /// Ids of committed documents, sorted.
    pub fn committed_ids(&self) -> Vec<String> {
        lock(&self.state).committed.keys().cloned().collect()
    }

    /// Number of documents visible to readers.
    pub fn visible_count(&self) -> usize {
        lock(&self.state).visible.len()
    }

    /// Number of documents in the working copy, committed or not.
    pub fn staged_count(&self) -> usize {
        lock(&self.state).staged.len()
    }

    /// Whether the writer has been closed.
    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }

    /// Make every add or delete of `id` fail.
    pub fn fail_document(&self, id: impl Into<String>) {
        lock(&self.state).failing_ids.insert(id.into());
    }

    /// Make the next `count` commits fail.
    pub fn fail_next_commits(&self, count: usize) {
        lock(&self.state).failing_commits = count;
    }

    /// Make refreshes fail (or succeed again).
    pub fn fail_refresh(&self, failing: bool) {
        lock(&self.state).failing_refresh = failing;
    }

    /// Make closing fail.
    pub fn fail_close(&self, failing: bool) {
        lock(&self.state).failing_close = failing;
    }

    fn count(&self, predicate: impl Fn(&WriterEvent) -> bool) -> usize {
        lock(&self.state)
            .events
            .iter()
            .filter(|event| predicate(event))
            .count()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str) -> IndexDocument {
        IndexDocument::builder().id(id).field("title", id).build()
    }

    #[test]
    fn test_changes_need_commit_and_refresh() {
        let mut writer = InMemoryIndexWriter::new();
        let probe = writer.probe();

        writer.add_document(&doc("a")).unwrap();
        writer.add_document(&doc("b")).unwrap();
        assert_eq!(probe.staged_count(), 2);
        assert!(probe.committed_ids().is_empty());

        writer.commit().unwrap();
        assert_eq!(probe.committed_ids(), vec!["a", "b"]);
        assert_eq!(probe.visible_count(), 0);

        writer.refresh().unwrap();
        assert_eq!(probe.visible_count(), 2);
        assert_eq!(probe.commit_count(), 1);
        assert_eq!(probe.refresh_count(), 1);
    }

    #[test]
    fn test_delete_and_delete_all() {
        let mut writer = InMemoryIndexWriter::new();
        let probe = writer.probe();

        writer.add_document(&doc("a")).unwrap();
        writer.add_document(&doc("b")).unwrap();
        writer.delete_document("a").unwrap();
        writer.commit().unwrap();
        assert_eq!(probe.committed_ids(), vec!["b"]);

        writer.delete_all().unwrap();
        writer.commit().unwrap();
        assert!(probe.committed_ids().is_empty());
        assert_eq!(
            probe.events(),
            vec![
                WriterEvent::Add("a".to_string()),
                WriterEvent::Add("b".to_string()),
                WriterEvent::Delete("a".to_string()),
                WriterEvent::Commit,
                WriterEvent::DeleteAll,
                WriterEvent::Commit,
            ]
        );
    }

    #[test]
    fn test_opstamps_increase() {
        let mut writer = InMemoryIndexWriter::new();
        let first = writer.add_document(&doc("a")).unwrap();
        let second = writer.commit().unwrap();
        assert!(second > first);
    }

    #[test]
    fn test_injected_failures() {
        let mut writer = InMemoryIndexWriter::new();
        let probe = writer.probe();

        probe.fail_document("bad");
        assert!(writer.add_document(&doc("bad")).is_err());
        assert!(writer.delete_document("bad").is_err());

        probe.fail_next_commits(1);
        assert!(writer.commit().is_err());
        assert!(writer.commit().is_ok());

        probe.fail_refresh(true);
        assert!(writer.refresh().is_err());
        probe.fail_refresh(false);
        assert!(writer.refresh().is_ok());

        assert_eq!(probe.commit_count(), 1);
    }

    #[test]
    fn test_close_discards_uncommitted_changes() {
        let mut writer = InMemoryIndexWriter::new();
        let probe = writer.probe();

        writer.add_document(&doc("a")).unwrap();
        writer.commit().unwrap();
        writer.add_document(&doc("b")).unwrap();

        Box::new(writer).close().unwrap();
        assert!(probe.is_closed());
        assert_eq!(probe.staged_count(), 1);
        assert_eq!(probe.events().last(), Some(&WriterEvent::Close));
    }

    #[test]
    fn test_closed_writer_rejects_calls() {
        let writer = InMemoryIndexWriter::new();
        let probe = writer.probe();
        probe.fail_close(true);

        let mut other = InMemoryIndexWriter {
            state: Arc::clone(&probe.state),
        };
        assert!(Box::new(writer).close().is_err());
        assert!(probe.is_closed());

        let err = other.add_document(&doc("a")).unwrap_err();
        assert!(err.is_illegal_state());
    }
}
