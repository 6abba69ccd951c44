//! Embedded LanceDB adapter for [`VectorIndex`].
//!
//! Each collection is one Lance table (see `schema.rs`). Lance tables do not
//! carry a distance metric or a notion of named vectors, so the collection
//! descriptor is kept in the `_collections` meta table and consulted on every
//! search.

use arrow_array::cast::AsArray;
use arrow_array::types::Float32Type;
use arrow_array::{Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use citestore_core::traits::VectorIndex;
use citestore_core::types::{CollectionInfo, Distance, Filter, Payload, Point, Record, ScoredPoint, VectorName};
use citestore_core::Result;

use crate::schema::{
	build_collection_schema, is_reserved_column, vector_column, COLLECTIONS_META_TABLE, ID_COLUMN, PAYLOAD_COLUMN,
};
use crate::table::{ensure_table, get_meta, index_err, open_db, set_meta, table_names};

/// Rows fetched per requested hit when a payload filter has to be applied
/// after the nearest-neighbour query.
const FILTER_OVERFETCH: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CollectionDescriptor {
	vector_size: usize,
	vector_name: VectorName,
	distance: Distance,
}

pub struct LanceIndex {
	db: Connection,
}

impl LanceIndex {
	pub async fn open(uri: &str) -> Result<Self> {
		let db = open_db(uri).await?;
		debug!(uri, "opened lancedb");
		Ok(Self { db })
	}

	async fn descriptor(&self, name: &str) -> Result<CollectionDescriptor> {
		let raw = get_meta(&self.db, COLLECTIONS_META_TABLE, name)
			.await?
			.ok_or_else(|| index_err(format!("collection '{name}' not found")))?;
		Ok(serde_json::from_str(&raw)?)
	}

	async fn open_collection(&self, name: &str) -> Result<lancedb::Table> {
		self.db.open_table(name).execute().await.map_err(index_err)
	}

	fn points_to_record_batch(points: &[Point], desc: &CollectionDescriptor) -> Result<RecordBatch> {
		let dim = i32::try_from(desc.vector_size).map_err(index_err)?;
		let schema = build_collection_schema(dim, &desc.vector_name);
		let mut ids = Vec::with_capacity(points.len());
		let mut documents = Vec::with_capacity(points.len());
		let mut payloads = Vec::with_capacity(points.len());
		let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(points.len());
		for p in points {
			if p.vector.len() != desc.vector_size {
				return Err(index_err(format!(
					"point {} has {} dimensions, collection expects {}",
					p.id,
					p.vector.len(),
					desc.vector_size
				)));
			}
			ids.push(p.id.clone());
			documents.push(p.payload.document.clone());
			payloads.push(serde_json::to_string(&p.payload)?);
			vectors.push(Some(p.vector.iter().map(|&x| Some(x)).collect()));
		}
		RecordBatch::try_new(schema, vec![
			Arc::new(StringArray::from(ids)),
			Arc::new(StringArray::from(documents)),
			Arc::new(StringArray::from(payloads)),
			Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors.into_iter(), dim)),
		])
		.map_err(index_err)
	}
}

fn distance_type(distance: Distance) -> DistanceType {
	match distance {
		Distance::Cosine => DistanceType::Cosine,
		Distance::Dot => DistanceType::Dot,
		Distance::Euclid => DistanceType::L2,
	}
}

/// Lance reports distances (lower is better); scores are higher-is-better.
fn score_from_distance(distance: Distance, d: f32) -> f32 {
	match distance {
		Distance::Cosine | Distance::Dot => 1.0 - d,
		Distance::Euclid => 1.0 / (1.0 + d),
	}
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
	batch
		.column_by_name(name)
		.and_then(|c| c.as_any().downcast_ref::<StringArray>())
		.ok_or_else(|| index_err(format!("{name} column missing")))
}

fn decode_payload(raw: &str) -> Result<Payload> { Ok(serde_json::from_str(raw)?) }

/// Unfiltered nearest neighbours, best first.
async fn nearest(table: &lancedb::Table, desc: &CollectionDescriptor, query: &[f32], fetch: usize) -> Result<Vec<ScoredPoint>> {
	let mut stream = table
		.vector_search(query.to_vec())
		.map_err(index_err)?
		.column(vector_column(&desc.vector_name))
		.distance_type(distance_type(desc.distance))
		.limit(fetch)
		.execute()
		.await
		.map_err(index_err)?;
	let mut hits = Vec::with_capacity(fetch);
	while let Some(batch) = stream.try_next().await.map_err(index_err)? {
		let ids = string_column(&batch, ID_COLUMN)?;
		let payloads = string_column(&batch, PAYLOAD_COLUMN)?;
		let distances = batch
			.column_by_name("_distance")
			.and_then(|c| c.as_any().downcast_ref::<Float32Array>())
			.ok_or_else(|| index_err("_distance column missing"))?;
		for i in 0..batch.num_rows() {
			hits.push(ScoredPoint {
				id: ids.value(i).to_string(),
				score: score_from_distance(desc.distance, distances.value(i)),
				payload: decode_payload(payloads.value(i))?,
			});
		}
	}
	hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
	Ok(hits)
}

#[async_trait]
impl VectorIndex for LanceIndex {
	async fn list_collections(&self) -> Result<Vec<String>> {
		let names = table_names(&self.db).await?;
		Ok(names.into_iter().filter(|n| n != COLLECTIONS_META_TABLE).collect())
	}

	async fn get_collection(&self, name: &str) -> Result<CollectionInfo> {
		let desc = self.descriptor(name).await?;
		let point_count = self.open_collection(name).await?.count_rows(None).await.map_err(index_err)?;
		Ok(CollectionInfo {
			name: name.to_string(),
			vector_size: desc.vector_size,
			vector_name: desc.vector_name,
			distance: desc.distance,
			point_count,
		})
	}

	async fn create_collection(&self, name: &str, vector_size: usize, vector_name: &VectorName, distance: Distance) -> Result<()> {
		if name == COLLECTIONS_META_TABLE {
			return Err(index_err(format!("'{name}' is a reserved table name")));
		}
		if is_reserved_column(vector_column(vector_name)) {
			return Err(index_err(format!("vector name '{vector_name}' clashes with a payload column")));
		}
		// A table without a descriptor is a half-finished create; finish it.
		if self.list_collections().await?.iter().any(|n| n == name)
			&& get_meta(&self.db, COLLECTIONS_META_TABLE, name).await?.is_some()
		{
			return Err(index_err(format!("collection '{name}' already exists")));
		}
		let dim = i32::try_from(vector_size).map_err(index_err)?;
		let desc = CollectionDescriptor { vector_size, vector_name: vector_name.clone(), distance };
		ensure_table(&self.db, name, build_collection_schema(dim, vector_name)).await?;
		set_meta(&self.db, COLLECTIONS_META_TABLE, name, &serde_json::to_string(&desc)?).await?;
		info!(collection = name, vector_size, vector = %vector_name, %distance, "created lance collection");
		Ok(())
	}

	async fn upsert(&self, name: &str, points: Vec<Point>) -> Result<()> {
		if points.is_empty() { return Ok(()); }
		let desc = self.descriptor(name).await?;
		let table = self.open_collection(name).await?;
		let batch = Self::points_to_record_batch(&points, &desc)?;
		let schema = batch.schema();
		let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
		let mut mi = table.merge_insert(&[ID_COLUMN]);
		mi.when_matched_update_all(None).when_not_matched_insert_all();
		mi.execute(reader).await.map_err(index_err)?;
		debug!(collection = name, count = points.len(), "upserted points");
		Ok(())
	}

	async fn scroll(&self, name: &str, limit: usize, with_payload: bool, with_vectors: bool) -> Result<Vec<Record>> {
		let desc = self.descriptor(name).await?;
		let table = self.open_collection(name).await?;
		let mut stream = table.query().limit(limit).execute().await.map_err(index_err)?;
		let mut out = Vec::new();
		while let Some(batch) = stream.try_next().await.map_err(index_err)? {
			let ids = string_column(&batch, ID_COLUMN)?;
			let payloads = string_column(&batch, PAYLOAD_COLUMN)?;
			let vectors = batch
				.column_by_name(vector_column(&desc.vector_name))
				.and_then(|c| c.as_any().downcast_ref::<FixedSizeListArray>());
			for i in 0..batch.num_rows() {
				let payload = if with_payload { Some(decode_payload(payloads.value(i))?) } else { None };
				let vector = match vectors {
					Some(fsl) if with_vectors && fsl.is_valid(i) => {
						Some(fsl.value(i).as_primitive::<Float32Type>().values().to_vec())
					}
					_ => None,
				};
				out.push(Record { id: ids.value(i).to_string(), payload, vector });
			}
		}
		out.truncate(limit);
		Ok(out)
	}

	async fn search(
		&self,
		name: &str,
		vector_name: &VectorName,
		query: &[f32],
		limit: usize,
		filter: Option<&Filter>,
	) -> Result<Vec<ScoredPoint>> {
		let desc = self.descriptor(name).await?;
		if &desc.vector_name != vector_name {
			return Err(index_err(format!("collection '{name}' has no vector '{vector_name}' (configured: '{}')", desc.vector_name)));
		}
		if query.len() != desc.vector_size {
			return Err(index_err(format!("query has {} dimensions, collection '{name}' expects {}", query.len(), desc.vector_size)));
		}
		if limit == 0 {
			return Ok(Vec::new());
		}
		let filter = filter.filter(|f| !f.is_empty());
		let table = self.open_collection(name).await?;
		let total = table.count_rows(None).await.map_err(index_err)?;
		if total == 0 {
			return Ok(Vec::new());
		}
		let Some(filter) = filter else {
			return nearest(&table, &desc, query, limit).await;
		};
		// Widen the window until enough rows pass the filter or the table is exhausted.
		let mut fetch = limit.saturating_mul(FILTER_OVERFETCH).min(total);
		let mut hits = loop {
			let rows = nearest(&table, &desc, query, fetch).await?;
			let scanned = rows.len();
			let matched: Vec<ScoredPoint> = rows.into_iter().filter(|p| filter.matches(&p.payload)).collect();
			if matched.len() >= limit || scanned < fetch || fetch >= total {
				break matched;
			}
			debug!(collection = name, fetch, matched = matched.len(), "widening filtered search");
			fetch = fetch.saturating_mul(2).min(total);
		};
		hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
		hits.truncate(limit);
		Ok(hits)
	}
}
