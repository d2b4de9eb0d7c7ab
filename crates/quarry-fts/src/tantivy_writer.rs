//! Tantivy index writer.
//!
//! This module provides `TantivyIndexWriter`, the [`IndexWriterHandle`] over a
//! Tantivy index. It owns the index writer and a manually reloaded
//! reader, so that a forced refresh makes committed changes visible to
//! searches right away.
//!
//! # Usage
//!
//! ```rust,ignore
//! use quarry_fts::{IndexDocument, IndexSettings, IndexWriterHandle, TantivyIndexWriter};
//!
//! let mut writer = TantivyIndexWriter::open(&IndexSettings::in_memory("books"))?;
//! writer.add_document(&IndexDocument::builder().id("b-1").field("title", "Dune").build())?;
//! writer.commit()?;
//! writer.refresh()?;
//! assert_eq!(writer.reader().searcher().num_docs(), 1);
//! ```

use std::path::Path;

use quarry_core::{Error, Result};
use serde_json::{Map, Value};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};

use crate::document::IndexDocument;
use crate::schema::{BODY_FIELD, ID_FIELD, IndexSchema};
use crate::settings::IndexSettings;
use crate::writer::{IndexWriterHandle, Opstamp};

/// Tantivy-backed index writer.
pub struct TantivyIndexWriter {
    writer: IndexWriter,
    reader: IndexReader,
    schema: IndexSchema,
}

impl TantivyIndexWriter {
    /// Open the index described by `settings`.
    ///
    /// Without an `index_path` the index lives in memory. Otherwise an index
    /// is opened if the directory holds one, and created if it does not.
    pub fn open(settings: &IndexSettings) -> Result<Self> {
        let index = match &settings.index_path {
            Some(path) => open_or_create_in_dir(path)?,
            None => Index::create_in_ram(IndexSchema::build().schema().clone()),
        };
        Self::from_index(index, settings)
    }

    /// Create an in-memory index with default settings (for testing).
    pub fn new_in_memory() -> Result<Self> {
        Self::open(&IndexSettings::default())
    }

    fn from_index(index: Index, settings: &IndexSettings) -> Result<Self> {
        let schema = IndexSchema::from_schema(index.schema()).ok_or_else(|| {
            Error::config(format!(
                "Index schema lacks the '{ID_FIELD}' and '{BODY_FIELD}' fields"
            ))
        })?;
        IndexSchema::register_tokenizers(&index);

        let writer = index
            .writer_with_num_threads(settings.writer_threads, settings.writer_buffer_size)
            .map_err(|e| Error::engine_with_source("Failed to create index writer", e))?;

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| Error::engine_with_source("Failed to create index reader", e))?;

        Ok(Self {
            writer,
            reader,
            schema,
        })
    }

    /// Reader seeing the index as of the last refresh.
    ///
    /// Clones share state with the writer's reader, so they observe refreshes.
    pub fn reader(&self) -> IndexReader {
        self.reader.clone()
    }

    /// Convert an `IndexDocument` to a Tantivy document.
    fn convert_to_tantivy_doc(&self, doc: &IndexDocument) -> Result<TantivyDocument> {
        let mut object = Map::new();
        object.insert(ID_FIELD.to_string(), Value::String(doc.id.clone()));
        object.insert(BODY_FIELD.to_string(), Value::Object(doc.body.clone()));

        TantivyDocument::parse_json(self.schema.schema(), &Value::Object(object).to_string())
            .map_err(|e| Error::engine_with_source(format!("Invalid document '{}'", doc.id), e))
    }
}

fn open_or_create_in_dir(index_path: &Path) -> Result<Index> {
    if !index_path.exists() {
        std::fs::create_dir_all(index_path).map_err(|e| Error::io_with_path(e, index_path))?;
    }

    if index_path.join("meta.json").exists() {
        log::debug!("Opening index at {}", index_path.display());
        Index::open_in_dir(index_path)
            .map_err(|e| Error::engine_with_source("Failed to open index", e))
    } else {
        log::info!("Creating index at {}", index_path.display());
        Index::create_in_dir(index_path, IndexSchema::build().schema().clone())
            .map_err(|e| Error::engine_with_source("Failed to create index", e))
    }
}

impl IndexWriterHandle for TantivyIndexWriter {
    fn add_document(&mut self, document: &IndexDocument) -> Result<Opstamp> {
        let tantivy_doc = self.convert_to_tantivy_doc(document)?;
        self.writer
            .add_document(tantivy_doc)
            .map_err(|e| Error::engine_with_source(format!("Failed to add document '{}'", document.id), e))
    }

    fn delete_document(&mut self, id: &str) -> Result<Opstamp> {
        Ok(self
            .writer
            .delete_term(Term::from_field_text(self.schema.id, id)))
    }

    fn delete_all(&mut self) -> Result<Opstamp> {
        self.writer
            .delete_all_documents()
            .map_err(|e| Error::engine_with_source("Failed to delete all documents", e))
    }

    fn commit(&mut self) -> Result<Opstamp> {
        self.writer
            .commit()
            .map_err(|e| Error::engine_with_source("Failed to commit index", e))
    }

    fn refresh(&mut self) -> Result<()> {
        self.reader
            .reload()
            .map_err(|e| Error::engine_with_source("Failed to reload index reader", e))
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.writer
            .wait_merging_threads()
            .map_err(|e| Error::engine_with_source("Failed to stop merging threads", e))
    }
}

impl std::fmt::Debug for TantivyIndexWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TantivyIndexWriter")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, title: &str) -> IndexDocument {
        IndexDocument::builder().id(id).field("title", title).build()
    }

    fn visible(writer: &TantivyIndexWriter) -> u64 {
        writer.reader().searcher().num_docs()
    }

    #[test]
    fn test_commit_then_refresh_makes_documents_visible() {
        let mut writer = TantivyIndexWriter::new_in_memory().unwrap();

        writer.add_document(&doc("b-1", "Dune")).unwrap();
        writer.add_document(&doc("b-2", "Solaris")).unwrap();
        assert_eq!(visible(&writer), 0);

        writer.commit().unwrap();
        assert_eq!(visible(&writer), 0);

        writer.refresh().unwrap();
        assert_eq!(visible(&writer), 2);
    }

    #[test]
    fn test_delete_by_id() {
        let mut writer = TantivyIndexWriter::new_in_memory().unwrap();

        writer.add_document(&doc("b-1", "Dune")).unwrap();
        writer.add_document(&doc("b-2", "Solaris")).unwrap();
        writer.commit().unwrap();

        writer.delete_document("b-1").unwrap();
        writer.commit().unwrap();
        writer.refresh().unwrap();
        assert_eq!(visible(&writer), 1);
    }

    #[test]
    fn test_delete_all() {
        let mut writer = TantivyIndexWriter::new_in_memory().unwrap();

        writer.add_document(&doc("b-1", "Dune")).unwrap();
        writer.commit().unwrap();
        writer.delete_all().unwrap();
        writer.commit().unwrap();
        writer.refresh().unwrap();
        assert_eq!(visible(&writer), 0);
    }

    #[test]
    fn test_nested_body() {
        let mut writer = TantivyIndexWriter::new_in_memory().unwrap();
        let document = IndexDocument::builder()
            .id("b-3")
            .field("title", "Ubik")
            .field("author", serde_json::json!({"name": "Philip K. Dick"}))
            .field("year", 1969)
            .build();

        writer.add_document(&document).unwrap();
        writer.commit().unwrap();
        writer.refresh().unwrap();
        assert_eq!(visible(&writer), 1);
    }

    #[test]
    fn test_reopen_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let settings = IndexSettings {
            index_path: Some(dir.path().join("books")),
            ..IndexSettings::in_memory("books")
        };

        let mut writer = TantivyIndexWriter::open(&settings).unwrap();
        writer.add_document(&doc("b-1", "Dune")).unwrap();
        writer.commit().unwrap();
        // Uncommitted: lost on close.
        writer.add_document(&doc("b-2", "Solaris")).unwrap();
        Box::new(writer).close().unwrap();

        let reopened = TantivyIndexWriter::open(&settings).unwrap();
        assert_eq!(visible(&reopened), 1);
    }

    #[test]
    fn test_writer_debug() {
        let writer = TantivyIndexWriter::new_in_memory().unwrap();
        assert!(format!("{writer:?}").contains("TantivyIndexWriter"));
    }
}
