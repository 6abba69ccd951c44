//! Parser for the textual record format produced by search round-trips:
//!
//! ```text
//! <entry><content>TEXT</content><metadata>{"title": "..."}</metadata></entry>
//! ```
//!
//! Single records fail with a [`ParseError`]; batches skip malformed records
//! and report what was skipped.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;
use tracing::warn;

use crate::citation::{self, CitationRecord};
use crate::error::ParseError;
use crate::types::{Entry, Metadata, SearchResult};

pub const ENTRY_OPEN: &str = "<entry>";
pub const ENTRY_CLOSE: &str = "</entry>";

static CONTENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<content>(.*?)</content>").expect("static regex"));
static METADATA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<metadata>(.*?)</metadata>").expect("static regex"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedEntry {
    pub content: String,
    pub metadata: Metadata,
    pub citation: CitationRecord,
    pub citation_apa: String,
    pub citation_chicago: String,
}

/// A record dropped by [`parse_batch`]; `index` is its position in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    pub index: usize,
    pub reason: ParseError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchParse {
    pub entries: Vec<ParsedEntry>,
    pub skipped: Vec<SkippedRecord>,
}

impl BatchParse {
    /// Fails with the first skip reason, if any record was skipped.
    pub fn into_strict(self) -> Result<Vec<ParsedEntry>, ParseError> {
        match self.skipped.into_iter().next() {
            Some(skip) => Err(skip.reason),
            None => Ok(self.entries),
        }
    }
}

fn first_segment<'a>(re: &Regex, text: &'a str) -> Option<&'a str> {
    re.captures(text).and_then(|c| c.get(1)).map(|m| m.as_str().trim())
}

pub fn parse_entry(text: &str) -> Result<ParsedEntry, ParseError> {
    let content = first_segment(&CONTENT_RE, text).ok_or(ParseError::MissingContent)?;
    let raw_metadata = first_segment(&METADATA_RE, text).ok_or(ParseError::MissingMetadata)?;
    let metadata = match serde_json::from_str::<Value>(raw_metadata) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            return Err(ParseError::InvalidMetadata(format!("expected an object, got {other}")))
        }
        Err(e) => return Err(ParseError::InvalidMetadata(e.to_string())),
    };
    let citation = citation::normalize(&metadata);
    Ok(ParsedEntry {
        content: content.to_string(),
        citation_apa: citation::render_apa(&citation),
        citation_chicago: citation::render_chicago(&citation),
        metadata,
        citation,
    })
}

fn parse_wrapped(raw: &str) -> Result<ParsedEntry, ParseError> {
    let raw = raw.trim();
    if raw.starts_with(ENTRY_OPEN) && raw.ends_with(ENTRY_CLOSE) {
        parse_entry(raw)
    } else {
        Err(ParseError::NotARecord)
    }
}

/// Turns one returned record back into an [`Entry`] that can be stored again.
pub fn entry_from_record(raw: &str) -> crate::Result<Entry> {
    let parsed = parse_wrapped(raw)?;
    Entry::with_metadata(parsed.content, parsed.metadata)
}

/// Parses a result batch. Element 0 is the header line and is never parsed.
pub fn parse_batch<S: AsRef<str>>(records: &[S]) -> BatchParse {
    let mut out = BatchParse::default();
    for (index, raw) in records.iter().enumerate().skip(1) {
        match parse_wrapped(raw.as_ref()) {
            Ok(entry) => out.entries.push(entry),
            Err(reason) => {
                warn!(index, %reason, "skipping malformed record");
                out.skipped.push(SkippedRecord { index, reason });
            }
        }
    }
    out
}

pub fn format_entry(content: &str, metadata: &Metadata) -> String {
    let metadata = Value::Object(metadata.clone());
    format!("{ENTRY_OPEN}<content>{content}</content><metadata>{metadata}</metadata>{ENTRY_CLOSE}")
}

/// Renders search results the way a find round-trip returns them: a header
/// line followed by one record per hit.
pub fn format_results(query: &str, results: &[SearchResult]) -> Vec<String> {
    let mut out = Vec::with_capacity(results.len() + 1);
    out.push(format!("Results for the query '{query}'"));
    out.extend(results.iter().map(|r| format_entry(&r.content, &r.metadata)));
    out
}
