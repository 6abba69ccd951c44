//! OpenAI embedding provider.
//!
//! Talks to the `/embeddings` endpoint of the OpenAI API (or any compatible
//! server at `base_url`). Model and credential are validated at construction,
//! before any request is made.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use citestore_core::config::EmbeddingSettings;
use citestore_core::traits::EmbeddingProvider;
use citestore_core::types::VectorName;
use citestore_core::{Error, Result};

use crate::models::{dimension_for, OPENAI_MODELS};

pub struct OpenAiProvider {
    model: String,
    dim: usize,
    api_key: String,
    base_url: String,
    vector_name: VectorName,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self> {
        let dim = dimension_for(OPENAI_MODELS, &settings.model)?;
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Configuration("OpenAI API key is required (embedding.api_key)".to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            model: settings.model.clone(),
            dim,
            api_key,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            vector_name: VectorName::from_option(settings.vector_name.as_deref()),
            client,
        })
    }

    async fn call_embeddings_api(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url);
        let body = EmbeddingsRequest { model: &self.model, input: texts };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Provider(format!("Embedding request timed out: {e}"))
                } else {
                    Error::Provider(format!("Embedding request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!("Embedding API returned {status}: {text}")));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("Failed to parse embedding response: {e}")))?;

        let mut data = parsed.data;
        if data.len() != texts.len() {
            return Err(Error::Provider(format!(
                "Embedding API returned {} vectors for {} inputs",
                data.len(),
                texts.len()
            )));
        }
        data.sort_by_key(|d| d.index);
        let mut vectors = Vec::with_capacity(data.len());
        for (expected, item) in data.into_iter().enumerate() {
            if item.index != expected {
                return Err(Error::Provider(format!("Embedding response is missing index {expected}")));
            }
            if item.embedding.len() != self.dim {
                return Err(Error::Provider(format!(
                    "Embedding has {} dimensions, model {} uses {}",
                    item.embedding.len(),
                    self.model,
                    self.dim
                )));
            }
            vectors.push(item.embedding);
        }
        debug!(model = %self.model, count = vectors.len(), "embedded texts");
        Ok(vectors)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() { return Ok(Vec::new()); }
        self.call_embeddings_api(texts).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.call_embeddings_api(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| Error::Provider("Empty embedding response".to_string()))
    }

    fn vector_name(&self) -> VectorName { self.vector_name.clone() }

    fn vector_size(&self) -> usize { self.dim }

    fn model_name(&self) -> &str { &self.model }
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(model: &str, key: Option<&str>) -> EmbeddingSettings {
        EmbeddingSettings { model: model.to_string(), api_key: key.map(str::to_string), ..Default::default() }
    }

    #[test]
    fn known_models_map_to_fixed_sizes() {
        let small = OpenAiProvider::new(&settings("text-embedding-3-small", Some("k"))).unwrap();
        let large = OpenAiProvider::new(&settings("text-embedding-3-large", Some("k"))).unwrap();
        assert_eq!(small.vector_size(), 1536);
        assert_eq!(large.vector_size(), 3072);
        assert_eq!(small.vector_name(), VectorName::Unnamed);
    }

    #[test]
    fn unknown_model_is_a_configuration_error() {
        let err = OpenAiProvider::new(&settings("text-embedding-9", Some("k"))).err().unwrap();
        assert!(matches!(err, Error::Configuration(ref m) if m.contains("text-embedding-9")));
    }

    #[test]
    fn missing_key_is_a_configuration_error() {
        assert!(matches!(
            OpenAiProvider::new(&settings("text-embedding-3-small", None)),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            OpenAiProvider::new(&settings("text-embedding-3-small", Some("  "))),
            Err(Error::Configuration(_))
        ));
    }
}
