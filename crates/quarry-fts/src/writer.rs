//! Index writer handle.
//!
//! `IndexWriterHandle` is the only view the write path has of the index
//! engine. Implementations:
//!
//! - `TantivyIndexWriter`: Tantivy-backed writer (requires `fts-tantivy`)
//! - `InMemoryIndexWriter`: map-backed writer with failure injection

use quarry_core::Result;

use crate::document::IndexDocument;

/// Operation stamp returned by the engine for each accepted change.
pub type Opstamp = u64;

/// Mutating access to one index.
///
/// A handle is exclusively owned by one processor and is never used from two
/// threads at once. Changes are staged until [`commit`] makes them durable;
/// [`refresh`] makes committed changes visible to readers.
///
/// [`commit`]: IndexWriterHandle::commit
/// [`refresh`]: IndexWriterHandle::refresh
pub trait IndexWriterHandle: Send {
    /// Stage a document.
    fn add_document(&mut self, document: &IndexDocument) -> Result<Opstamp>;

    /// Stage the deletion of every document with the given id.
    fn delete_document(&mut self, id: &str) -> Result<Opstamp>;

    /// Stage the deletion of every document.
    fn delete_all(&mut self) -> Result<Opstamp>;

    /// Make staged changes durable.
    fn commit(&mut self) -> Result<Opstamp>;

    /// Make committed changes visible to readers.
    fn refresh(&mut self) -> Result<()>;

    /// Release the engine's resources.
    ///
    /// Uncommitted changes are discarded.
    fn close(self: Box<Self>) -> Result<()>;
}
