use serde::Serialize;
use std::fmt;

use citestore_core::citation::{content_preview, DEFAULT_PREVIEW_CHARS};
use citestore_core::types::{CollectionInfo, Record};

/// One sampled point, reduced to what is useful when eyeballing a store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleRecord {
	pub id: String,
	pub metadata_keys: Vec<String>,
	pub document_preview: Option<String>,
	pub vector_len: Option<usize>,
}

impl SampleRecord {
	pub fn from_record(record: Record) -> Self {
		let (metadata_keys, document_preview) = match record.payload {
			Some(p) => (p.metadata.keys().cloned().collect(), Some(content_preview(&p.document, DEFAULT_PREVIEW_CHARS))),
			None => (Vec::new(), None),
		};
		Self { id: record.id, metadata_keys, document_preview, vector_len: record.vector.map(|v| v.len()) }
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionSummary {
	pub info: CollectionInfo,
	pub samples: Vec<SampleRecord>,
}

impl fmt::Display for CollectionSummary {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "Collection: {}", self.info.name)?;
		writeln!(f, "  points: {}", self.info.point_count)?;
		writeln!(f, "  vector: {} ({} dims, {})", self.info.vector_name, self.info.vector_size, self.info.distance)?;
		for (i, s) in self.samples.iter().enumerate() {
			writeln!(f, "  [{}] {}", i + 1, s.id)?;
			if !s.metadata_keys.is_empty() {
				writeln!(f, "      metadata: {}", s.metadata_keys.join(", "))?;
			}
			if let Some(doc) = &s.document_preview {
				writeln!(f, "      document: {doc}")?;
			}
			if let Some(n) = s.vector_len {
				writeln!(f, "      vector length: {n}")?;
			}
		}
		Ok(())
	}
}
