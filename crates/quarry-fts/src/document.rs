//! Indexed document representation.
//!
//! This module defines `IndexDocument`, the already-built document handed to
//! the write path. A document is an identifier plus a JSON object of field
//! values; mapping domain objects to documents happens upstream.
//!
//! # Creating Documents
//!
//! ```rust
//! use quarry_fts::IndexDocument;
//!
//! let doc = IndexDocument::builder()
//!     .id("book-1")
//!     .field("title", "The Name of the Rose")
//!     .field("pages", 512)
//!     .build();
//!
//! assert_eq!(doc.id, "book-1");
//! assert_eq!(doc.field("pages").and_then(|v| v.as_i64()), Some(512));
//! ```

use quarry_core::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the identifier member in JSON input.
pub const ID_MEMBER: &str = "id";

/// A document to be written to an index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    /// Unique document identifier (required).
    pub id: String,

    /// Field values, indexed as a single JSON object.
    #[serde(default)]
    pub body: Map<String, Value>,
}

impl IndexDocument {
    /// Create a document with no fields.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            body: Map::new(),
        }
    }

    /// Create a new document builder.
    pub fn builder() -> IndexDocumentBuilder {
        IndexDocumentBuilder::default()
    }

    /// Get a field value by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.body.get(name)
    }

    /// Parse a flat JSON object such as `{"id": "b-1", "title": "..."}`.
    ///
    /// The `id` member must be a non-empty string; every other member becomes
    /// part of the body.
    pub fn from_json_line(line: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(line)
            .map_err(|e| Error::parse(format!("Invalid document JSON: {e}")))?;

        let Value::Object(mut body) = value else {
            return Err(Error::parse("Document JSON must be an object"));
        };

        let id = match body.remove(ID_MEMBER) {
            Some(Value::String(id)) if !id.is_empty() => id,
            Some(_) => {
                return Err(Error::parse(
                    "Document member 'id' must be a non-empty string",
                ));
            }
            None => return Err(Error::parse("Document is missing the 'id' member")),
        };

        Ok(Self { id, body })
    }
}

/// Builder for `IndexDocument`.
#[derive(Debug, Default)]
pub struct IndexDocumentBuilder {
    doc: IndexDocument,
}

impl IndexDocumentBuilder {
    /// Set the document ID.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.doc.id = id.into();
        self
    }

    /// Set a field value.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.doc.body.insert(name.into(), value.into());
        self
    }

    /// Build the document.
    pub fn build(self) -> IndexDocument {
        self.doc
    }
}

// ============================================================================
// Tests
// ============================================================================
