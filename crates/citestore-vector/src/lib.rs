//! Vector store connector and the index adapters it runs on.

use std::sync::Arc;

use citestore_core::config::{IndexBackend, IndexSettings};
use citestore_core::traits::VectorIndex;
use citestore_core::Result;

pub mod connector;
pub mod inspect;
pub mod lance;
pub mod memory;
pub mod schema;
pub mod table;

pub use connector::{with_deadline, VectorStoreConnector};
pub use inspect::{CollectionSummary, SampleRecord};
pub use lance::LanceIndex;
pub use memory::InMemoryIndex;

/// Opens the index backend named in `settings`.
pub async fn open_index(settings: &IndexSettings) -> Result<Arc<dyn VectorIndex>> {
	let index: Arc<dyn VectorIndex> = match settings.backend {
		IndexBackend::Memory => Arc::new(InMemoryIndex::new()),
		IndexBackend::Lancedb => {
			let path = settings.resolved_path();
			Arc::new(LanceIndex::open(&path.to_string_lossy()).await?)
		}
	};
	tracing::debug!(backend = ?settings.backend, "vector index ready");
	Ok(index)
}
