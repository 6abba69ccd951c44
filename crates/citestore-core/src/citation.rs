//! Citation normalization and rendering.
//!
//! Metadata written by callers has no schema, so every field falls back to a
//! fixed sentinel when the key is absent or holds an unusable value. Rendering
//! therefore never fails and the two templates are byte-stable.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::Metadata;

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_AUTHORS: &str = "Unknown Authors";
pub const UNKNOWN_YEAR: &str = "Unknown Year";
pub const UNKNOWN_PUBLISHER: &str = "Unknown Publisher";
pub const UNKNOWN_CHAPTER: &str = "Unknown Chapter";
pub const UNKNOWN_PAGE: &str = "Unknown Page";
pub const UNKNOWN_SOURCE: &str = "Unknown Source";

pub const DEFAULT_PREVIEW_CHARS: usize = 150;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationRecord {
    pub book: String,
    pub authors: String,
    pub year: String,
    pub publisher: String,
    pub chapter: String,
    pub page: String,
    pub source_file: String,
}

/// Only JSON strings are accepted for textual fields.
fn text_field(metadata: &Metadata, key: &str, sentinel: &str) -> String {
    match metadata.get(key) {
        Some(Value::String(s)) => s.clone(),
        _ => sentinel.to_string(),
    }
}

/// Strings and numbers are accepted; numbers keep their JSON rendering.
fn numeric_field(metadata: &Metadata, key: &str, sentinel: &str) -> String {
    match metadata.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => sentinel.to_string(),
    }
}

pub fn normalize(metadata: &Metadata) -> CitationRecord {
    CitationRecord {
        book: text_field(metadata, "title", UNKNOWN_TITLE),
        authors: text_field(metadata, "authors", UNKNOWN_AUTHORS),
        year: numeric_field(metadata, "year", UNKNOWN_YEAR),
        publisher: text_field(metadata, "publisher", UNKNOWN_PUBLISHER),
        chapter: text_field(metadata, "chapter", UNKNOWN_CHAPTER),
        page: numeric_field(metadata, "page_number", UNKNOWN_PAGE),
        source_file: text_field(metadata, "source_file", UNKNOWN_SOURCE),
    }
}

pub fn render_apa(record: &CitationRecord) -> String {
    format!(
        "{} ({}). {}. {}. Chapter: {}, Page: {}",
        record.authors, record.year, record.book, record.publisher, record.chapter, record.page
    )
}

pub fn render_chicago(record: &CitationRecord) -> String {
    format!(
        "{}. {}. {}, {}. Chapter: {}, Page: {}",
        record.authors, record.book, record.publisher, record.year, record.chapter, record.page
    )
}

/// One line of a numbered quick-reference list.
pub fn summary_line(number: usize, record: &CitationRecord) -> String {
    format!("{}. {} ({}) - {}, p. {}", number, record.authors, record.year, record.book, record.page)
}

/// Truncates on a char boundary and appends `...` when anything was cut.
pub fn content_preview(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &content[..byte_idx]),
        None => content.to_string(),
    }
}
