//! Vector store connector: embeds entries, writes them to the configured
//! collection and answers similarity queries with citation data attached.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use citestore_core::config::Settings;
use citestore_core::traits::{EmbeddingProvider, VectorIndex};
use citestore_core::types::{Distance, Entry, Filter, Metadata, Payload, Point, SearchResult};
use citestore_core::{Error, Result};

use crate::inspect::{CollectionSummary, SampleRecord};

#[derive(Clone)]
pub struct VectorStoreConnector {
	provider: Arc<dyn EmbeddingProvider>,
	index: Arc<dyn VectorIndex>,
	collection_name: String,
	distance: Distance,
	cancel: Option<CancellationToken>,
}

impl VectorStoreConnector {
	pub fn new(provider: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>, collection_name: impl Into<String>) -> Self {
		Self { provider, index, collection_name: collection_name.into(), distance: Distance::default(), cancel: None }
	}

	/// Distance used when this connector creates the collection.
	pub fn with_distance(mut self, distance: Distance) -> Self {
		self.distance = distance;
		self
	}

	/// Every subsequent external await races `token`; a fired token yields
	/// [`Error::Cancelled`].
	pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
		self.cancel = Some(token);
		self
	}

	/// Builds the configured provider and index and wires them together.
	pub async fn from_settings(settings: &Settings) -> Result<Self> {
		let provider = citestore_embed::provider_from_settings(&settings.embedding)?;
		let index = crate::open_index(&settings.index).await?;
		Ok(Self::new(provider, index, settings.collection_name.clone()).with_distance(settings.index.distance))
	}

	pub fn collection_name(&self) -> &str { &self.collection_name }

	pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> { &self.provider }

	async fn guard<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
		match &self.cancel {
			None => fut.await,
			Some(token) => {
				if token.is_cancelled() {
					return Err(Error::Cancelled);
				}
				tokio::select! {
					biased;
					_ = token.cancelled() => Err(Error::Cancelled),
					res = fut => res,
				}
			}
		}
	}

	async fn collection_exists(&self) -> Result<bool> {
		let names = self.guard(self.index.list_collections()).await?;
		Ok(names.iter().any(|n| n == &self.collection_name))
	}

	/// Creates the collection if it is absent. An existing collection is
	/// left untouched, whatever its shape.
	pub async fn ensure_collection(&self) -> Result<()> {
		if self.collection_exists().await? {
			return Ok(());
		}
		let vector_name = self.provider.vector_name();
		let created = self
			.guard(self.index.create_collection(
				&self.collection_name,
				self.provider.vector_size(),
				&vector_name,
				self.distance,
			))
			.await;
		match created {
			Ok(()) => {
				info!(
					collection = %self.collection_name,
					vector_size = self.provider.vector_size(),
					vector = %vector_name,
					"collection created"
				);
				Ok(())
			}
			// another writer created it between list and create
			Err(Error::Index(msg)) => {
				if self.collection_exists().await? { Ok(()) } else { Err(Error::Index(msg)) }
			}
			Err(e) => Err(e),
		}
	}

	/// Checks an existing collection against the provider. A missing
	/// collection is fine; it will be created on first use.
	pub async fn verify_collection(&self) -> Result<()> {
		if !self.collection_exists().await? {
			return Ok(());
		}
		let info = self.guard(self.index.get_collection(&self.collection_name)).await?;
		let expected_name = self.provider.vector_name();
		if info.vector_size != self.provider.vector_size() {
			return Err(Error::Configuration(format!(
				"collection '{}' stores {}-dimensional vectors but model {} produces {}",
				info.name,
				info.vector_size,
				self.provider.model_name(),
				self.provider.vector_size()
			)));
		}
		if info.vector_name != expected_name {
			return Err(Error::Configuration(format!(
				"collection '{}' uses vector '{}', provider writes '{}'",
				info.name, info.vector_name, expected_name
			)));
		}
		if info.distance != self.distance {
			return Err(Error::Configuration(format!(
				"collection '{}' uses {} distance, configured {}",
				info.name, info.distance, self.distance
			)));
		}
		Ok(())
	}

	/// Embeds and stores one entry; returns the new point id.
	pub async fn store(&self, entry: &Entry) -> Result<String> {
		let mut ids = self.store_all(std::slice::from_ref(entry)).await?;
		ids.pop().ok_or_else(|| Error::Index("no point id produced".to_string()))
	}

	/// Embeds all entries in one provider call and writes them in one upsert.
	pub async fn store_all(&self, entries: &[Entry]) -> Result<Vec<String>> {
		self.ensure_collection().await?;
		if entries.is_empty() {
			return Ok(Vec::new());
		}
		let texts: Vec<String> = entries.iter().map(|e| e.content().to_string()).collect();
		let vectors = self.guard(self.provider.embed_documents(&texts)).await?;
		if vectors.len() != entries.len() {
			return Err(Error::Provider(format!(
				"provider returned {} vectors for {} entries",
				vectors.len(),
				entries.len()
			)));
		}
		let points: Vec<Point> = entries
			.iter()
			.zip(vectors)
			.map(|(entry, vector)| Point { id: Uuid::new_v4().to_string(), vector, payload: Payload::from_entry(entry) })
			.collect();
		let ids = points.iter().map(|p| p.id.clone()).collect();
		self.guard(self.index.upsert(&self.collection_name, points)).await?;
		debug!(collection = %self.collection_name, count = entries.len(), "stored entries");
		Ok(ids)
	}

	/// Nearest entries to `query`, best first, optionally restricted to
	/// points whose metadata equals every pair in `filter`.
	pub async fn search(&self, query: &str, limit: usize, filter: Option<&Metadata>) -> Result<Vec<SearchResult>> {
		if limit == 0 {
			return Ok(Vec::new());
		}
		self.ensure_collection().await?;
		if !self.collection_exists().await? {
			return Ok(Vec::new());
		}
		let vector = self.guard(self.provider.embed_query(query)).await?;
		let filter = filter.map(Filter::from_metadata).filter(|f| !f.is_empty());
		let vector_name = self.provider.vector_name();
		let hits = self
			.guard(self.index.search(&self.collection_name, &vector_name, &vector, limit, filter.as_ref()))
			.await?;
		debug!(collection = %self.collection_name, hits = hits.len(), limit, "search finished");
		Ok(hits
			.into_iter()
			.map(|hit| SearchResult::new(hit.payload.document, hit.payload.metadata, hit.score))
			.collect())
	}

	/// Descriptor and the first `sample` points of the collection, or `None`
	/// when it does not exist yet.
	pub async fn inspect(&self, sample: usize) -> Result<Option<CollectionSummary>> {
		if !self.collection_exists().await? {
			return Ok(None);
		}
		let info = self.guard(self.index.get_collection(&self.collection_name)).await?;
		let records = self.guard(self.index.scroll(&self.collection_name, sample, true, true)).await?;
		let samples = records.into_iter().map(SampleRecord::from_record).collect();
		Ok(Some(CollectionSummary { info, samples }))
	}

	pub async fn close(&self) -> Result<()> {
		self.index.close().await
	}
}

/// Runs `fut` with a caller deadline; an elapsed deadline is a cancellation.
pub async fn with_deadline<T>(deadline: Duration, fut: impl Future<Output = Result<T>>) -> Result<T> {
	tokio::time::timeout(deadline, fut).await.map_err(|_| Error::Cancelled)?
}
