use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

use citestore_core::config::{EmbeddingSettings, IndexBackend, IndexSettings, ProviderKind, Settings};
use citestore_core::traits::VectorIndex;
use citestore_core::types::{Distance, Entry, Filter, Metadata, Payload, Point, VectorName};
use citestore_core::Error;
use citestore_embed::HashedProvider;
use citestore_vector::schema::build_collection_schema;
use citestore_vector::table::ensure_table;
use citestore_vector::{InMemoryIndex, LanceIndex, VectorStoreConnector};

fn meta(v: serde_json::Value) -> Metadata { v.as_object().cloned().expect("object") }

fn point(id: &str, vector: Vec<f32>, doc: &str) -> Point {
    Point { id: id.to_string(), vector, payload: Payload { document: doc.to_string(), metadata: Metadata::new() } }
}

#[tokio::test]
async fn lancedb_full_flow() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let index = Arc::new(LanceIndex::open(&tmp.path().to_string_lossy()).await?);
    let provider = Arc::new(HashedProvider::new("hashed-256")?);
    let connector = VectorStoreConnector::new(provider, index.clone(), "library");

    assert!(connector.search("fire", 5, None).await?.is_empty());
    assert_eq!(index.list_collections().await?, ["library"]);

    let entries = vec![
        Entry::with_metadata(
            "Building a fire with wet wood needs a dry core",
            meta(json!({"title": "Bushcraft", "authors": "Kochanski", "year": 1987, "page_number": 12})),
        )?,
        Entry::with_metadata(
            "Storing grain in sealed containers keeps pests out",
            meta(json!({"title": "Root Cellaring", "authors": "Bubel", "year": 1991})),
        )?,
        Entry::with_metadata("Rainwater collection basics", meta(json!({"year": 1991})))?,
    ];
    let ids = connector.store_all(&entries).await?;
    assert_eq!(ids.len(), 3);

    let results = connector.search("Building a fire with wet wood needs a dry core", 2, None).await?;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].content, entries[0].content());
    assert!(results[0].score >= results[1].score);
    assert_eq!(
        results[0].citation_apa,
        "Kochanski (1987). Bushcraft. Unknown Publisher. Chapter: Unknown Chapter, Page: 12"
    );

    let filtered = connector.search("grain", 5, Some(&meta(json!({"year": 1991})))).await?;
    assert_eq!(filtered.len(), 2);
    assert!(filtered.iter().all(|r| r.metadata["year"] == json!(1991)));

    let summary = connector.inspect(10).await?.expect("collection");
    assert_eq!(summary.info.point_count, 3);
    assert_eq!(summary.info.distance, Distance::Cosine);
    assert!(summary.samples.iter().all(|s| s.vector_len == Some(256)));
    Ok(())
}

#[tokio::test]
async fn lance_descriptor_survives_reopen() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let uri = tmp.path().to_string_lossy().to_string();
    {
        let index = LanceIndex::open(&uri).await?;
        index.create_collection("named", 3, &VectorName::Named("dense".into()), Distance::Euclid).await?;
        index.upsert("named", vec![point("a", vec![1.0, 0.0, 0.0], "alpha"), point("b", vec![0.0, 1.0, 0.0], "beta")]).await?;
    }
    let index = LanceIndex::open(&uri).await?;
    let info = index.get_collection("named").await?;
    assert_eq!(info.vector_size, 3);
    assert_eq!(info.vector_name, VectorName::Named("dense".into()));
    assert_eq!(info.distance, Distance::Euclid);
    assert_eq!(info.point_count, 2);

    let hits = index.search("named", &VectorName::Named("dense".into()), &[1.0, 0.0, 0.0], 1, None).await?;
    assert_eq!(hits[0].id, "a");
    assert!((hits[0].score - 1.0).abs() < 1e-5);

    assert!(matches!(
        index.search("named", &VectorName::Unnamed, &[1.0, 0.0, 0.0], 1, None).await,
        Err(Error::Index(_))
    ));
    Ok(())
}

#[tokio::test]
async fn lance_upsert_replaces_by_id() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let index = LanceIndex::open(&tmp.path().to_string_lossy()).await?;
    index.create_collection("c", 2, &VectorName::Unnamed, Distance::Cosine).await?;
    index.upsert("c", vec![point("a", vec![1.0, 0.0], "old")]).await?;
    index.upsert("c", vec![point("a", vec![1.0, 0.0], "new")]).await?;
    let records = index.scroll("c", 10, true, true).await?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].payload.as_ref().map(|p| p.document.as_str()), Some("new"));
    assert_eq!(records[0].vector.as_deref(), Some(&[1.0, 0.0][..]));
    Ok(())
}

#[tokio::test]
async fn lance_rejects_bad_input() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let index = LanceIndex::open(&tmp.path().to_string_lossy()).await?;
    assert!(matches!(index.get_collection("missing").await, Err(Error::Index(_))));
    assert!(matches!(
        index.create_collection("c", 2, &VectorName::Named("payload".into()), Distance::Cosine).await,
        Err(Error::Index(_))
    ));
    index.create_collection("c", 2, &VectorName::Unnamed, Distance::Cosine).await?;
    assert!(matches!(
        index.create_collection("c", 2, &VectorName::Unnamed, Distance::Cosine).await,
        Err(Error::Index(_))
    ));
    assert!(matches!(index.upsert("c", vec![point("a", vec![1.0], "x")]).await, Err(Error::Index(_))));
    Ok(())
}

#[tokio::test]
async fn connector_from_lancedb_settings() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let settings = Settings {
        collection_name: "configured".to_string(),
        index: IndexSettings {
            backend: IndexBackend::Lancedb,
            path: tmp.path().join("db").to_string_lossy().to_string(),
            distance: Distance::Dot,
        },
        embedding: EmbeddingSettings { provider: ProviderKind::Hashed, model: "hashed-384".to_string(), ..Default::default() },
    };
    let connector = VectorStoreConnector::from_settings(&settings).await?;
    connector.store(&Entry::new("dot product ranking")?).await?;
    connector.verify_collection().await?;
    let hits = connector.search("dot product ranking", 1, None).await?;
    assert_eq!(hits[0].content, "dot product ranking");
    Ok(())
}

fn tagged(id: &str, vector: Vec<f32>, year: i64) -> Point {
    Point {
        id: id.to_string(),
        vector,
        payload: Payload { document: format!("doc {id}"), metadata: meta(json!({"year": year})) },
    }
}

/// Matching points ranked far below many non-matching neighbours.
fn buried_matches(near: usize) -> Vec<Point> {
    let mut points: Vec<Point> = (0..near).map(|i| tagged(&format!("near-{i}"), vec![1.0, 0.01 * i as f32], 2000)).collect();
    points.push(tagged("far-a", vec![0.0, 1.0], 2023));
    points.push(tagged("far-b", vec![-0.2, 1.0], 2023));
    points
}

async fn filtered_ids(index: &dyn VectorIndex, limit: usize, filter: &Filter) -> anyhow::Result<Vec<String>> {
    let hits = index.search("c", &VectorName::Unnamed, &[1.0, 0.0], limit, Some(filter)).await?;
    Ok(hits.into_iter().map(|h| h.id).collect())
}

#[tokio::test]
async fn lance_filter_finds_matches_beyond_the_first_window() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let lance = LanceIndex::open(&tmp.path().to_string_lossy()).await?;
    let memory = InMemoryIndex::new();
    let filter = Filter::from_metadata(&meta(json!({"year": 2023})));

    for index in [&lance as &dyn VectorIndex, &memory as &dyn VectorIndex] {
        index.create_collection("c", 2, &VectorName::Unnamed, Distance::Cosine).await?;
    }
    // 11 near points fill the first 10-row window for limit 1
    lance.upsert("c", buried_matches(11)).await?;
    memory.upsert("c", buried_matches(11)).await?;
    assert_eq!(filtered_ids(&lance, 1, &filter).await?, ["far-a"]);
    assert_eq!(filtered_ids(&lance, 1, &filter).await?, filtered_ids(&memory, 1, &filter).await?);

    // several widenings, and asking for more than exists
    lance.upsert("c", buried_matches(60)).await?;
    memory.upsert("c", buried_matches(60)).await?;
    let lance_ids = filtered_ids(&lance, 2, &filter).await?;
    assert_eq!(lance_ids, ["far-a", "far-b"]);
    assert_eq!(lance_ids, filtered_ids(&memory, 2, &filter).await?);
    assert_eq!(filtered_ids(&lance, 5, &filter).await?, ["far-a", "far-b"]);

    let nothing = Filter::from_metadata(&meta(json!({"year": 1900})));
    assert!(filtered_ids(&lance, 3, &nothing).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn lance_create_finishes_a_table_without_descriptor() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let uri = tmp.path().to_string_lossy().to_string();
    let db = lancedb::connect(&uri).execute().await?;
    ensure_table(&db, "orphan", build_collection_schema(2, &VectorName::Unnamed)).await?;

    let index = LanceIndex::open(&uri).await?;
    assert!(matches!(index.get_collection("orphan").await, Err(Error::Index(_))));
    index.create_collection("orphan", 2, &VectorName::Unnamed, Distance::Dot).await?;
    let info = index.get_collection("orphan").await?;
    assert_eq!(info.distance, Distance::Dot);
    assert_eq!(info.point_count, 0);
    Ok(())
}
