//! Embedding provider variants and the factory that picks one from settings.

use std::sync::Arc;

use citestore_core::config::{EmbeddingSettings, ProviderKind};
use citestore_core::traits::EmbeddingProvider;
use citestore_core::Result;

pub mod hashed;
pub mod models;
pub mod openai;

pub use hashed::HashedProvider;
pub use openai::OpenAiProvider;

pub fn provider_from_settings(settings: &EmbeddingSettings) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider: Arc<dyn EmbeddingProvider> = match settings.provider {
        ProviderKind::Openai => Arc::new(OpenAiProvider::new(settings)?),
        ProviderKind::Hashed => Arc::new(HashedProvider::from_settings(settings)?),
    };
    tracing::debug!(
        model = provider.model_name(),
        dim = provider.vector_size(),
        vector = %provider.vector_name(),
        "embedding provider ready"
    );
    Ok(provider)
}
