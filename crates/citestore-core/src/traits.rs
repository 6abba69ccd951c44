use async_trait::async_trait;

use crate::error::Result;
use crate::types::{CollectionInfo, Distance, Filter, Point, Record, ScoredPoint, VectorName};

/// Turns text into fixed-size vectors for one named model.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// One vector per input, in input order.
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Vector slot this provider reads and writes.
    fn vector_name(&self) -> VectorName;

    /// Dimensionality of every returned vector; fixed per model.
    fn vector_size(&self) -> usize;

    fn model_name(&self) -> &str;
}

/// The operations the connector needs from a vector index engine.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn list_collections(&self) -> Result<Vec<String>>;

    async fn get_collection(&self, name: &str) -> Result<CollectionInfo>;

    async fn create_collection(
        &self,
        name: &str,
        vector_size: usize,
        vector_name: &VectorName,
        distance: Distance,
    ) -> Result<()>;

    /// Inserts or replaces points by id.
    async fn upsert(&self, name: &str, points: Vec<Point>) -> Result<()>;

    async fn scroll(
        &self,
        name: &str,
        limit: usize,
        with_payload: bool,
        with_vectors: bool,
    ) -> Result<Vec<Record>>;

    /// Nearest neighbours ranked by descending score.
    async fn search(
        &self,
        name: &str,
        vector_name: &VectorName,
        query: &[f32],
        limit: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<ScoredPoint>>;

    async fn close(&self) -> Result<()> { Ok(()) }
}
