//! Static model → dimension tables. Dimensions are never inferred from a
//! backend response.

use citestore_core::{Error, Result};

pub const OPENAI_MODELS: &[(&str, usize)] = &[
    ("text-embedding-3-small", 1536),
    ("text-embedding-3-large", 3072),
    ("text-embedding-ada-002", 1536),
];

pub const HASHED_MODELS: &[(&str, usize)] = &[
    ("hashed-256", 256),
    ("hashed-384", 384),
    ("hashed-1024", 1024),
];

pub fn dimension_for(table: &[(&str, usize)], model: &str) -> Result<usize> {
    table
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, dim)| *dim)
        .ok_or_else(|| {
            let supported: Vec<&str> = table.iter().map(|(name, _)| *name).collect();
            Error::Configuration(format!(
                "Unsupported embedding model: {model}. Supported models: {}",
                supported.join(", ")
            ))
        })
}
