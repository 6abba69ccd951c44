//! Exact, process-local [`VectorIndex`].
//!
//! Brute-force scoring over every point of a collection. Used by tests and
//! by the `memory` backend for small corpora.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

use citestore_core::traits::VectorIndex;
use citestore_core::types::{CollectionInfo, Distance, Filter, Point, PointId, Record, ScoredPoint, VectorName};
use citestore_core::{Error, Result};

struct Collection {
	vector_size: usize,
	vector_name: VectorName,
	distance: Distance,
	points: Vec<Point>,
	positions: HashMap<PointId, usize>,
}

impl Collection {
	fn info(&self, name: &str) -> CollectionInfo {
		CollectionInfo {
			name: name.to_string(),
			vector_size: self.vector_size,
			vector_name: self.vector_name.clone(),
			distance: self.distance,
			point_count: self.points.len(),
		}
	}
}

#[derive(Default)]
pub struct InMemoryIndex {
	collections: RwLock<HashMap<String, Collection>>,
	closed: AtomicBool,
}

impl InMemoryIndex {
	pub fn new() -> Self { Self::default() }

	fn check_open(&self) -> Result<()> {
		if self.closed.load(Ordering::Acquire) {
			return Err(Error::Index("index is closed".to_string()));
		}
		Ok(())
	}
}

fn not_found(name: &str) -> Error { Error::Index(format!("collection '{name}' not found")) }

fn dot(a: &[f32], b: &[f32]) -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() }

fn norm(a: &[f32]) -> f32 { dot(a, a).sqrt() }

/// Higher is better for every metric.
pub(crate) fn similarity(distance: Distance, a: &[f32], b: &[f32]) -> f32 {
	match distance {
		Distance::Cosine => {
			let denom = norm(a) * norm(b);
			if denom == 0.0 { 0.0 } else { dot(a, b) / denom }
		}
		Distance::Dot => dot(a, b),
		Distance::Euclid => {
			let d: f32 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f32>().sqrt();
			1.0 / (1.0 + d)
		}
	}
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
	async fn list_collections(&self) -> Result<Vec<String>> {
		self.check_open()?;
		let mut names: Vec<String> = self.collections.read().await.keys().cloned().collect();
		names.sort();
		Ok(names)
	}

	async fn get_collection(&self, name: &str) -> Result<CollectionInfo> {
		self.check_open()?;
		let guard = self.collections.read().await;
		guard.get(name).map(|c| c.info(name)).ok_or_else(|| not_found(name))
	}

	async fn create_collection(&self, name: &str, vector_size: usize, vector_name: &VectorName, distance: Distance) -> Result<()> {
		self.check_open()?;
		if vector_size == 0 {
			return Err(Error::Index("vector size must be positive".to_string()));
		}
		let mut guard = self.collections.write().await;
		if guard.contains_key(name) {
			return Err(Error::Index(format!("collection '{name}' already exists")));
		}
		guard.insert(
			name.to_string(),
			Collection {
				vector_size,
				vector_name: vector_name.clone(),
				distance,
				points: Vec::new(),
				positions: HashMap::new(),
			},
		);
		debug!(collection = name, vector_size, vector = %vector_name, %distance, "created in-memory collection");
		Ok(())
	}

	async fn upsert(&self, name: &str, points: Vec<Point>) -> Result<()> {
		self.check_open()?;
		let mut guard = self.collections.write().await;
		let coll = guard.get_mut(name).ok_or_else(|| not_found(name))?;
		if let Some(bad) = points.iter().find(|p| p.vector.len() != coll.vector_size) {
			return Err(Error::Index(format!(
				"point {} has {} dimensions, collection expects {}",
				bad.id,
				bad.vector.len(),
				coll.vector_size
			)));
		}
		for point in points {
			match coll.positions.get(&point.id) {
				Some(&pos) => coll.points[pos] = point,
				None => {
					coll.positions.insert(point.id.clone(), coll.points.len());
					coll.points.push(point);
				}
			}
		}
		Ok(())
	}

	async fn scroll(&self, name: &str, limit: usize, with_payload: bool, with_vectors: bool) -> Result<Vec<Record>> {
		self.check_open()?;
		let guard = self.collections.read().await;
		let coll = guard.get(name).ok_or_else(|| not_found(name))?;
		Ok(coll
			.points
			.iter()
			.take(limit)
			.map(|p| Record {
				id: p.id.clone(),
				payload: with_payload.then(|| p.payload.clone()),
				vector: with_vectors.then(|| p.vector.clone()),
			})
			.collect())
	}

	async fn search(
		&self,
		name: &str,
		vector_name: &VectorName,
		query: &[f32],
		limit: usize,
		filter: Option<&Filter>,
	) -> Result<Vec<ScoredPoint>> {
		self.check_open()?;
		let guard = self.collections.read().await;
		let coll = guard.get(name).ok_or_else(|| not_found(name))?;
		if &coll.vector_name != vector_name {
			return Err(Error::Index(format!(
				"collection '{name}' has no vector '{vector_name}' (configured: '{}')",
				coll.vector_name
			)));
		}
		if query.len() != coll.vector_size {
			return Err(Error::Index(format!(
				"query has {} dimensions, collection '{name}' expects {}",
				query.len(),
				coll.vector_size
			)));
		}
		let mut hits: Vec<ScoredPoint> = coll
			.points
			.iter()
			.filter(|p| filter.map_or(true, |f| f.matches(&p.payload)))
			.map(|p| ScoredPoint {
				id: p.id.clone(),
				score: similarity(coll.distance, query, &p.vector),
				payload: p.payload.clone(),
			})
			.collect();
		// stable: equal scores keep insertion order
		hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
		hits.truncate(limit);
		Ok(hits)
	}

	async fn close(&self) -> Result<()> {
		self.closed.store(true, Ordering::Release);
		Ok(())
	}
}
