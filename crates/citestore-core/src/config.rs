//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nested keys, e.g. `APP_EMBEDDING__MODEL`). The extracted
//! [`Settings`] are passed explicitly into provider and connector constructors.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::types::Distance;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate_for_env(&env_name)?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    pub fn settings(&self) -> anyhow::Result<Settings> {
        self.figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read settings: {}", e))
    }

    fn validate_for_env(&self, env: &str) -> anyhow::Result<()> {
        match env {
            "prod" | "production" => {
                let settings = self.settings()?;
                if settings.embedding.provider == ProviderKind::Hashed {
                    return Err(anyhow::anyhow!("Prod config must not use the hashed embedding provider"));
                }
                if settings.index.backend == IndexBackend::Memory {
                    return Err(anyhow::anyhow!("Prod config must not use the in-memory index"));
                }
            }
            "dev" | "development" | "test" | "testing" => {}
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub collection_name: String,
    pub index: IndexSettings,
    pub embedding: EmbeddingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            collection_name: "documents".to_string(),
            index: IndexSettings::default(),
            embedding: EmbeddingSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    Memory,
    Lancedb,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub backend: IndexBackend,
    /// Database directory or URI for on-disk backends.
    pub path: String,
    pub distance: Distance,
}

impl IndexSettings {
    pub fn resolved_path(&self) -> PathBuf { expand_path(&self.path) }
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            backend: IndexBackend::Lancedb,
            path: "data/lancedb".to_string(),
            distance: Distance::Cosine,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Openai,
    Hashed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: ProviderKind,
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
    /// Named vector slot; absent or empty targets an unnamed collection.
    pub vector_name: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Openai,
            model: "text-embedding-3-small".to_string(),
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            timeout_secs: 30,
            vector_name: None,
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    // Expand env vars first
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    // Expand ~ at start
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn settings_merge_file_and_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                collection_name = "literature"
                [index]
                backend = "memory"
                [embedding]
                provider = "hashed"
                model = "hashed-256"
                "#,
            )?;
            jail.set_env("APP_EMBEDDING__MODEL", "hashed-384");
            jail.set_env("RUST_ENV", "test");
            let config = Config::load().expect("load");
            let settings = config.settings().expect("settings");
            assert_eq!(settings.collection_name, "literature");
            assert_eq!(settings.index.backend, IndexBackend::Memory);
            assert_eq!(settings.index.distance, Distance::Cosine);
            assert_eq!(settings.embedding.provider, ProviderKind::Hashed);
            assert_eq!(settings.embedding.model, "hashed-384");
            assert_eq!(settings.embedding.timeout_secs, 30);
            Ok(())
        });
    }

    #[test]
    fn prod_rejects_hashed_provider() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[embedding]\nprovider = \"hashed\"\nmodel = \"hashed-256\"\n")?;
            jail.set_env("RUST_ENV", "prod");
            assert!(Config::load().is_err());
            Ok(())
        });
    }
}
