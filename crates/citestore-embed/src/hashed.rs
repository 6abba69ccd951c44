//! Deterministic offline embeddings built from xxHash64 token hashes.
//!
//! Same text always yields the same L2-normalized vector, which makes it the
//! provider of choice for tests and for development without an API key.

use async_trait::async_trait;
use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use citestore_core::config::EmbeddingSettings;
use citestore_core::traits::EmbeddingProvider;
use citestore_core::types::VectorName;
use citestore_core::Result;

use crate::models::{dimension_for, HASHED_MODELS};

pub struct HashedProvider {
    model: String,
    dim: usize,
    vector_name: VectorName,
}

impl HashedProvider {
    pub fn new(model: &str) -> Result<Self> {
        let dim = dimension_for(HASHED_MODELS, model)?;
        Ok(Self { model: model.to_string(), dim, vector_name: VectorName::Unnamed })
    }

    pub fn from_settings(settings: &EmbeddingSettings) -> Result<Self> {
        Ok(Self::new(&settings.model)?.with_vector_name(VectorName::from_option(settings.vector_name.as_deref())))
    }

    pub fn with_vector_name(mut self, vector_name: VectorName) -> Self {
        self.vector_name = vector_name;
        self
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v { *x /= norm; }
        v
    }
}

#[async_trait]
impl EmbeddingProvider for HashedProvider {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> { Ok(self.embed_one(text)) }

    fn vector_name(&self) -> VectorName { self.vector_name.clone() }

    fn vector_size(&self) -> usize { self.dim }

    fn model_name(&self) -> &str { &self.model }
}
