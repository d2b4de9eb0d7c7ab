//! Write works.
//!
//! A write work is one atomic mutation of an index. Works are executed by the
//! [`WriteWorkProcessor`](crate::WriteWorkProcessor) against the index writer
//! it owns, at most once per submission.
//!
//! | Work | Effect | Output |
//! |------|--------|--------|
//! | [`AddDocumentWork`] | stage a document | opstamp |
//! | [`UpdateDocumentWork`] | delete by id, then stage the document | opstamp |
//! | [`DeleteDocumentWork`] | delete by id | opstamp |
//! | [`PurgeWork`] | delete every document | opstamp |
//! | [`FlushWork`] | nothing (submit with a forced commit) | `()` |
//! | [`RefreshWork`] | nothing (submit with a forced refresh) | `()` |

use quarry_core::{EventContext, Result, WorkInfo};

use crate::document::IndexDocument;
use crate::writer::{IndexWriterHandle, Opstamp};

/// What a work can reach while it executes.
pub struct WriteWorkExecutionContext<'a> {
    writer: &'a mut dyn IndexWriterHandle,
    event_context: &'a EventContext,
}

impl<'a> WriteWorkExecutionContext<'a> {
    /// Create a context over `writer` for the index identified by `event_context`.
    pub fn new(writer: &'a mut dyn IndexWriterHandle, event_context: &'a EventContext) -> Self {
        Self {
            writer,
            event_context,
        }
    }

    /// The index writer.
    pub fn index_writer(&mut self) -> &mut dyn IndexWriterHandle {
        &mut *self.writer
    }

    /// Identity of the index being written.
    pub fn event_context(&self) -> &EventContext {
        self.event_context
    }
}

/// An atomic mutation of one index.
pub trait WriteWork: Send {
    /// Value produced by a successful execution.
    type Output: Send + 'static;

    /// Apply the work.
    fn execute(&self, context: &mut WriteWorkExecutionContext<'_>) -> Result<Self::Output>;

    /// Description used in failure reports.
    fn info(&self) -> WorkInfo;
}

/// Stage a new document.
#[derive(Debug, Clone)]
pub struct AddDocumentWork {
    document: IndexDocument,
}

impl AddDocumentWork {
    pub fn new(document: IndexDocument) -> Self {
        Self { document }
    }
}

impl WriteWork for AddDocumentWork {
    type Output = Opstamp;

    fn execute(&self, context: &mut WriteWorkExecutionContext<'_>) -> Result<Opstamp> {
        context.index_writer().add_document(&self.document)
    }

    fn info(&self) -> WorkInfo {
        WorkInfo::new(format!("add document '{}'", self.document.id))
    }
}

/// Replace every document sharing the new document's id.
#[derive(Debug, Clone)]
pub struct UpdateDocumentWork {
    document: IndexDocument,
}

impl UpdateDocumentWork {
    pub fn new(document: IndexDocument) -> Self {
        Self { document }
    }
}

impl WriteWork for UpdateDocumentWork {
    type Output = Opstamp;

    fn execute(&self, context: &mut WriteWorkExecutionContext<'_>) -> Result<Opstamp> {
        let writer = context.index_writer();
        writer.delete_document(&self.document.id)?;
        writer.add_document(&self.document)
    }

    fn info(&self) -> WorkInfo {
        WorkInfo::new(format!("update document '{}'", self.document.id))
    }
}

/// Remove every document with the given id.
#[derive(Debug, Clone)]
pub struct DeleteDocumentWork {
    id: String,
}

impl DeleteDocumentWork {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl WriteWork for DeleteDocumentWork {
    type Output = Opstamp;

    fn execute(&self, context: &mut WriteWorkExecutionContext<'_>) -> Result<Opstamp> {
        context.index_writer().delete_document(&self.id)
    }

    fn info(&self) -> WorkInfo {
        WorkInfo::new(format!("delete document '{}'", self.id))
    }
}

/// Remove every document of the index.
#[derive(Debug, Clone, Copy, Default)]
pub struct PurgeWork;

impl WriteWork for PurgeWork {
    type Output = Opstamp;

    fn execute(&self, context: &mut WriteWorkExecutionContext<'_>) -> Result<Opstamp> {
        log::debug!("Purging {}", context.event_context());
        context.index_writer().delete_all()
    }

    fn info(&self) -> WorkInfo {
        WorkInfo::new("purge index")
    }
}

/// Marker work; its workset's forced commit does the flushing.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlushWork;

impl WriteWork for FlushWork {
    type Output = ();

    fn execute(&self, _context: &mut WriteWorkExecutionContext<'_>) -> Result<()> {
        Ok(())
    }

    fn info(&self) -> WorkInfo {
        WorkInfo::new("flush index")
    }
}

/// Marker work; its workset's forced refresh does the refreshing.
#[derive(Debug, Clone, Copy, Default)]
pub struct RefreshWork;

impl WriteWork for RefreshWork {
    type Output = ();

    fn execute(&self, _context: &mut WriteWorkExecutionContext<'_>) -> Result<()> {
        Ok(())
    }

    fn info(&self) -> WorkInfo {
        WorkInfo::new("refresh index")
    }
}

/// A document-level work, as carried by a changeset.
#[derive(Debug, Clone)]
pub enum DocumentWork {
    Add(AddDocumentWork),
    Update(UpdateDocumentWork),
    Delete(DeleteDocumentWork),
}

impl DocumentWork {
    /// Add `document`.
    pub fn add(document: IndexDocument) -> Self {
        Self::Add(AddDocumentWork::new(document))
    }

    /// Replace the document with `document.id`.
    pub fn update(document: IndexDocument) -> Self {
        Self::Update(UpdateDocumentWork::new(document))
    }

    /// Delete the document with `id`.
    pub fn delete(id: impl Into<String>) -> Self {
        Self::Delete(DeleteDocumentWork::new(id))
    }
}

impl WriteWork for DocumentWork {
    type Output = ();

    fn execute(&self, context: &mut WriteWorkExecutionContext<'_>) -> Result<()> {
        match self {
            Self::Add(work) => work.execute(context).map(drop),
            Self::Update(work) => work.execute(context).map(drop),
            Self::Delete(work) => work.execute(context).map(drop),
        }
    }

    fn info(&self) -> WorkInfo {
        match self {
            Self::Add(work) => work.info(),
            Self::Update(work) => work.info(),
            Self::Delete(work) => work.info(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
