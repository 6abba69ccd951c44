//! Domain types shared by the embedding providers, index adapters and the
//! connector.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::citation::{self, CitationRecord};
use crate::error::{Error, Result};

pub type PointId = String;
pub type Metadata = serde_json::Map<String, Value>;

/// A unit of stored knowledge: non-empty text plus free-form metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    content: String,
    metadata: Metadata,
}

impl Entry {
    pub fn new(content: impl Into<String>) -> Result<Self> {
        Self::with_metadata(content, Metadata::new())
    }

    pub fn with_metadata(content: impl Into<String>, metadata: Metadata) -> Result<Self> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(Error::InvalidEntry("content must not be empty".to_string()));
        }
        Ok(Self { content, metadata })
    }

    pub fn content(&self) -> &str { &self.content }

    pub fn metadata(&self) -> &Metadata { &self.metadata }
}

/// Which vector slot of a collection a provider writes to and searches.
///
/// `Unnamed` addresses legacy single-vector collections; `Named` addresses one
/// slot of a multi-vector collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorName {
    #[default]
    Unnamed,
    Named(String),
}

impl VectorName {
    /// Maps an optional configured name; `None` and `""` both mean unnamed.
    pub fn from_option(name: Option<&str>) -> Self {
        match name {
            Some(n) if !n.is_empty() => VectorName::Named(n.to_string()),
            _ => VectorName::Unnamed,
        }
    }

    pub fn as_named(&self) -> Option<&str> {
        match self {
            VectorName::Unnamed => None,
            VectorName::Named(n) => Some(n),
        }
    }
}

impl fmt::Display for VectorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VectorName::Unnamed => f.write_str("<unnamed>"),
            VectorName::Named(n) => f.write_str(n),
        }
    }
}

/// Similarity function used to rank nearest neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distance {
    #[default]
    Cosine,
    Dot,
    Euclid,
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Distance::Cosine => "cosine",
            Distance::Dot => "dot",
            Distance::Euclid => "euclid",
        };
        f.write_str(s)
    }
}

/// Descriptor of a collection as reported by the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    pub vector_size: usize,
    pub vector_name: VectorName,
    pub distance: Distance,
    pub point_count: usize,
}

/// What is attached to every stored point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    pub document: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Payload {
    pub fn from_entry(entry: &Entry) -> Self {
        Self { document: entry.content.clone(), metadata: entry.metadata.clone() }
    }

    /// Resolves a dotted key (`document`, `metadata.year`, `metadata.a.b`).
    pub fn lookup(&self, key: &str) -> Option<Value> {
        let mut parts = key.split('.');
        match parts.next()? {
            "document" => {
                if parts.next().is_some() { return None; }
                Some(Value::String(self.document.clone()))
            }
            "metadata" => {
                let first = parts.next()?;
                let mut current = self.metadata.get(first)?;
                for part in parts {
                    current = current.as_object()?.get(part)?;
                }
                Some(current.clone())
            }
            _ => None,
        }
    }
}

/// One stored unit: identifier, vector, payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub id: PointId,
    pub vector: Vec<f32>,
    pub payload: Payload,
}

/// A search hit. Higher `score` is always better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPoint {
    pub id: PointId,
    pub score: f32,
    pub payload: Payload,
}

/// A point as returned by `scroll`; payload and vector are only present when
/// requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: PointId,
    pub payload: Option<Payload>,
    pub vector: Option<Vec<f32>>,
}

/// Equality constraint on one payload field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldCondition {
    pub key: String,
    pub value: Value,
}

/// Conjunction of field conditions; an empty filter matches everything.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Filter {
    pub must: Vec<FieldCondition>,
}

impl Filter {
    /// Translates a caller-supplied metadata filter into payload conditions.
    /// Keys are scoped under `metadata.`, so `{"year": 2023}` becomes
    /// `metadata.year == 2023`.
    pub fn from_metadata(filter: &Metadata) -> Self {
        let must = filter
            .iter()
            .map(|(k, v)| FieldCondition { key: format!("metadata.{k}"), value: v.clone() })
            .collect();
        Self { must }
    }

    pub fn is_empty(&self) -> bool { self.must.is_empty() }

    pub fn matches(&self, payload: &Payload) -> bool {
        self.must.iter().all(|c| payload.lookup(&c.key).is_some_and(|v| values_equal(&v, &c.value)))
    }
}

/// JSON equality, except that numbers compare by value (`2023 == 2023.0`).
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}

/// A connector search result enriched with citation data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub content: String,
    pub metadata: Metadata,
    pub score: f32,
    pub citation: CitationRecord,
    pub citation_apa: String,
    pub citation_chicago: String,
}

impl SearchResult {
    /// Derives the citation fields from `metadata`.
    pub fn new(content: String, metadata: Metadata, score: f32) -> Self {
        let citation = citation::normalize(&metadata);
        Self {
            citation_apa: citation::render_apa(&citation),
            citation_chicago: citation::render_chicago(&citation),
            content,
            metadata,
            score,
            citation,
        }
    }
}
