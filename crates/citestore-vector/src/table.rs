//! LanceDB connection and housekeeping helpers.
//!
//! Provides database open functions, an ensure-table helper, and a simple
//! key/value metadata table used to store collection descriptors.

use arrow_array::{RecordBatch, RecordBatchIterator, StringArray, TimestampMillisecondArray};
use chrono::Utc;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection};
use std::sync::Arc;

use citestore_core::{Error, Result};

use crate::schema::build_meta_schema;

pub(crate) fn index_err(e: impl std::fmt::Display) -> Error {
	Error::Index(e.to_string())
}

pub async fn open_db(uri: &str) -> Result<Connection> {
	connect(uri).execute().await.map_err(index_err)
}

pub async fn table_names(conn: &Connection) -> Result<Vec<String>> {
	conn.table_names().execute().await.map_err(index_err)
}

pub async fn ensure_table(conn: &Connection, name: &str, schema: Arc<arrow_schema::Schema>) -> Result<()> {
	if table_names(conn).await?.iter().any(|n| n == name) {
		return Ok(());
	}
	// create empty table with 0 rows
	let iter = RecordBatchIterator::new(vec![].into_iter(), schema.clone());
	conn.create_table(name, Box::new(iter)).execute().await.map_err(index_err)?;
	Ok(())
}

pub async fn ensure_meta_table(conn: &Connection, name: &str) -> Result<()> {
	ensure_table(conn, name, build_meta_schema()).await
}

pub async fn set_meta(conn: &Connection, table: &str, key: &str, value: &str) -> Result<()> {
	ensure_meta_table(conn, table).await?;
	let t = conn.open_table(table).execute().await.map_err(index_err)?;
	let rb = RecordBatch::try_new(
		build_meta_schema(),
		vec![
			Arc::new(StringArray::from(vec![key.to_string()])),
			Arc::new(StringArray::from(vec![value.to_string()])),
			Arc::new(TimestampMillisecondArray::from(vec![Utc::now().timestamp_millis()])),
		],
	)
	.map_err(index_err)?;
	let reader = Box::new(RecordBatchIterator::new(vec![Ok(rb)].into_iter(), build_meta_schema()));
	// Upsert behavior via merge_insert: key is unique
	let mut mi = t.merge_insert(&["key"]);
	mi.when_matched_update_all(None).when_not_matched_insert_all();
	mi.execute(reader).await.map_err(index_err)?;
	Ok(())
}

pub async fn get_meta(conn: &Connection, table: &str, key: &str) -> Result<Option<String>> {
	if !table_names(conn).await?.iter().any(|n| n == table) { return Ok(None); }
	let t = conn.open_table(table).execute().await.map_err(index_err)?;
	let mut stream = t
		.query()
		.only_if(&format!("key = '{}'", key.replace('\'', "''")))
		.execute()
		.await
		.map_err(index_err)?;
	while let Some(batch) = stream.try_next().await.map_err(index_err)? {
		if batch.num_rows() == 0 { continue; }
		let val = batch
			.column_by_name("value")
			.and_then(|c| c.as_any().downcast_ref::<StringArray>())
			.ok_or_else(|| index_err("meta.value column missing"))?;
		return Ok(Some(val.value(0).to_string()));
	}
	Ok(None)
}
