//! Tantivy schema of a quarry index.
//!
//! Documents are stored under two fields:
//!
//! - `id`: unique document identifier (STRING | STORED), used for deletes
//! - `body`: every other field, indexed as one JSON object (stored, `en_stem`)
//!
//! # Tokenizer
//!
//! The body uses an English stemming tokenizer (`en_stem`):
//! SimpleTokenizer → LowerCaser → Stemmer(English).

use tantivy::Index;
use tantivy::schema::{
    Field, IndexRecordOption, JsonObjectOptions, STORED, STRING, Schema, SchemaBuilder,
    TextFieldIndexing,
};
use tantivy::tokenizer::{Language, LowerCaser, SimpleTokenizer, Stemmer, TextAnalyzer};

/// Name of the identifier field.
pub const ID_FIELD: &str = "id";

/// Name of the JSON body field.
pub const BODY_FIELD: &str = "body";

/// Name of the tokenizer used for the body.
pub const BODY_TOKENIZER: &str = "en_stem";

/// Tantivy schema with typed access to its fields.
#[derive(Clone)]
pub struct IndexSchema {
    schema: Schema,
    /// Unique document identifier.
    pub id: Field,
    /// Document body.
    pub body: Field,
}

impl IndexSchema {
    /// Build the schema.
    pub fn build() -> Self {
        let mut builder = SchemaBuilder::new();

        let body_options = JsonObjectOptions::default()
            .set_indexing_options(
                TextFieldIndexing::default()
                    .set_tokenizer(BODY_TOKENIZER)
                    .set_index_option(IndexRecordOption::WithFreqsAndPositions),
            )
            .set_stored();

        let id = builder.add_text_field(ID_FIELD, STRING | STORED);
        let body = builder.add_json_field(BODY_FIELD, body_options);

        Self {
            schema: builder.build(),
            id,
            body,
        }
    }

    /// Rebuild typed access from the schema of an existing index.
    pub fn from_schema(schema: Schema) -> Option<Self> {
        let id = schema.get_field(ID_FIELD).ok()?;
        let body = schema.get_field(BODY_FIELD).ok()?;
        Some(Self { schema, id, body })
    }

    /// Get the underlying Tantivy schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Register the body tokenizer with a Tantivy index.
    ///
    /// Must be called after creating or opening an index.
    pub fn register_tokenizers(index: &Index) {
        let en_stem = TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(LowerCaser)
            .filter(Stemmer::new(Language::English))
            .build();

        index.tokenizers().register(BODY_TOKENIZER, en_stem);
    }
}

impl std::fmt::Debug for IndexSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexSchema")
            .field("fields", &[ID_FIELD, BODY_FIELD])
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_fields() {
        let schema = IndexSchema::build();
        let tantivy_schema = schema.schema();

        assert_eq!(tantivy_schema.get_field(ID_FIELD).unwrap(), schema.id);
        assert_eq!(tantivy_schema.get_field(BODY_FIELD).unwrap(), schema.body);

        let id_entry = tantivy_schema.get_field_entry(schema.id);
        assert!(id_entry.is_indexed());
        assert!(id_entry.is_stored());

        let body_entry = tantivy_schema.get_field_entry(schema.body);
        assert!(body_entry.is_indexed());
        assert!(body_entry.is_stored());
    }

    #[test]
    fn test_from_schema() {
        let schema = IndexSchema::build();
        let rebuilt = IndexSchema::from_schema(schema.schema().clone()).unwrap();
        assert_eq!(rebuilt.id, schema.id);
        assert_eq!(rebuilt.body, schema.body);

        assert!(IndexSchema::from_schema(SchemaBuilder::new().build()).is_none());
    }

    #[test]
    fn test_tokenizer_registration() {
        let schema = IndexSchema::build();
        let index = Index::create_in_ram(schema.schema().clone());

        IndexSchema::register_tokenizers(&index);
        assert!(index.tokenizers().get(BODY_TOKENIZER).is_some());
    }

    #[test]
    fn test_schema_debug() {
        let debug = format!("{:?}", IndexSchema::build());
        assert!(debug.contains("IndexSchema"));
        assert!(debug.contains("body"));
    }
}
