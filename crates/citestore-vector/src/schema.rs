use arrow_schema::{DataType, Field, Schema, TimeUnit};
use std::sync::Arc;

use citestore_core::types::VectorName;

pub const ID_COLUMN: &str = "id";
pub const DOCUMENT_COLUMN: &str = "document";
pub const PAYLOAD_COLUMN: &str = "payload";
pub const DEFAULT_VECTOR_COLUMN: &str = "vector";

/// Table holding one descriptor row per collection.
pub const COLLECTIONS_META_TABLE: &str = "_collections";

pub fn vector_column(name: &VectorName) -> &str {
	name.as_named().unwrap_or(DEFAULT_VECTOR_COLUMN)
}

pub fn is_reserved_column(name: &str) -> bool {
	matches!(name, ID_COLUMN | DOCUMENT_COLUMN | PAYLOAD_COLUMN)
}

/// `id, document, payload (JSON), <vector column>`; one table per collection.
pub fn build_collection_schema(dim: i32, vector_name: &VectorName) -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new(ID_COLUMN, DataType::Utf8, false),
		Field::new(DOCUMENT_COLUMN, DataType::Utf8, false),
		Field::new(PAYLOAD_COLUMN, DataType::Utf8, false),
		Field::new(vector_column(vector_name), DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
	]))
}

// Simple key/value meta table for collection descriptors
pub fn build_meta_schema() -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("key", DataType::Utf8, false),
		Field::new("value", DataType::Utf8, false),
		Field::new("updated_at", DataType::Timestamp(TimeUnit::Millisecond, None), false),
	]))
}
