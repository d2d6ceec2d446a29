//! Configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (nested keys separated by `__`, e.g. `APP_RETRIEVAL__TOP_N=5`). API keys are
//! read from their conventional variables (`GOOGLE_API_KEY`, `PINECONE_API_KEY`,
//! `COHERE_API_KEY`).
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment
            .merge(Env::prefixed("APP_").split("__"))
            .merge(Env::raw().only(&["google_api_key", "pinecone_api_key", "cohere_api_key"]).map(|k| format!("keys.{k}").into()));

        let config = Self { figment };
        config.settings()?.validate()?;
        Ok(config)
    }

    /// Wraps an already-built figment; used by tests and embedders of the library.
    pub fn from_figment(figment: Figment) -> Self { Self { figment } }

    pub fn settings(&self) -> Result<Settings> {
        self.figment.extract().map_err(|e| Error::InvalidConfig(e.to_string()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub chunking: ChunkingSettings,
    pub embedding: EmbeddingSettings,
    pub vector_store: VectorStoreSettings,
    pub retrieval: RetrievalSettings,
    pub rerank: RerankSettings,
    pub generation: GenerationSettings,
    pub network: NetworkSettings,
    pub ingest: IngestSettings,
    pub server: ServerSettings,
    pub keys: ApiKeys,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthUnit {
    /// `cl100k_base` BPE tokens.
    Tokens,
    Characters,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub separators: Vec<String>,
    pub length_unit: LengthUnit,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            separators: vec!["\n\n".into(), "\n".into(), " ".into(), String::new()],
            length_unit: LengthUnit::Tokens,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderKind {
    Gemini,
    Hashing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProviderKind,
    pub model: String,
    pub dimension: usize,
    pub base_url: String,
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::Gemini,
            model: "models/embedding-001".into(),
            dimension: 768,
            base_url: "https://generativelanguage.googleapis.com".into(),
            batch_size: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorBackend {
    Lancedb,
    Pinecone,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    pub backend: VectorBackend,
    /// Dimension the index was created with. Must equal the embedder's dimension.
    pub dimension: usize,
    pub lancedb_dir: String,
    pub table: String,
    /// Data-plane host of the Pinecone index, e.g. `https://docs-abc123.svc.us-east-1.pinecone.io`.
    pub pinecone_host: String,
    pub pinecone_namespace: String,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            backend: VectorBackend::Lancedb,
            dimension: 768,
            lancedb_dir: "~/.minirag/lancedb".into(),
            table: "documents".into(),
            pinecone_host: String::new(),
            pinecone_namespace: String::new(),
        }
    }
}

impl VectorStoreSettings {
    pub fn lancedb_path(&self) -> PathBuf { expand_path(&self.lancedb_dir) }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub fetch_k: usize,
    pub k: usize,
    pub lambda: f32,
    pub top_n: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self { Self { fetch_k: 50, k: 10, lambda: 0.5, top_n: 3 } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RerankProviderKind {
    Cohere,
    Lexical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankSettings {
    pub provider: RerankProviderKind,
    pub model: String,
    pub base_url: String,
}

impl Default for RerankSettings {
    fn default() -> Self {
        Self {
            provider: RerankProviderKind::Cohere,
            model: "rerank-english-v3.0".into(),
            base_url: "https://api.cohere.com".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub base_url: String,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-pro".into(),
            temperature: 0.2,
            base_url: "https://generativelanguage.googleapis.com".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for NetworkSettings {
    fn default() -> Self { Self { timeout_secs: 30, connect_timeout_secs: 5 } }
}

impl NetworkSettings {
    pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }
    pub fn connect_timeout(&self) -> Duration { Duration::from_secs(self.connect_timeout_secs) }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    /// Chunks embedded and upserted per round trip.
    pub embed_batch_size: usize,
    pub docs_dir: String,
}

impl Default for IngestSettings {
    fn default() -> Self { Self { embed_batch_size: 32, docs_dir: "docs".into() } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self { Self { host: "127.0.0.1".into(), port: 8000 } }
}

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    pub google_api_key: Option<String>,
    pub pinecone_api_key: Option<String>,
    pub cohere_api_key: Option<String>,
}

impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |k: &Option<String>| if k.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("ApiKeys")
            .field("google_api_key", &mask(&self.google_api_key))
            .field("pinecone_api_key", &mask(&self.pinecone_api_key))
            .field("cohere_api_key", &mask(&self.cohere_api_key))
            .finish()
    }
}

impl ApiKeys {
    pub fn require(key: &Option<String>, var: &str) -> Result<String> {
        key.clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::InvalidConfig(format!("{var} is not set")))
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let c = &self.chunking;
        if c.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunking.chunk_size must be positive".into()));
        }
        if c.chunk_overlap > c.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunking.chunk_overlap ({}) is larger than chunking.chunk_size ({})",
                c.chunk_overlap, c.chunk_size
            )));
        }
        if c.separators.is_empty() {
            return Err(Error::InvalidConfig("chunking.separators must not be empty".into()));
        }
        if self.embedding.dimension == 0 || self.vector_store.dimension == 0 {
            return Err(Error::InvalidConfig("embedding and index dimensions must be positive".into()));
        }
        let r = &self.retrieval;
        if r.k == 0 || r.top_n == 0 {
            return Err(Error::InvalidConfig("retrieval.k and retrieval.top_n must be positive".into()));
        }
        if r.k > r.fetch_k {
            return Err(Error::InvalidConfig(format!("retrieval.k ({}) exceeds retrieval.fetch_k ({})", r.k, r.fetch_k)));
        }
        if r.top_n > r.k {
            return Err(Error::InvalidConfig(format!("retrieval.top_n ({}) exceeds retrieval.k ({})", r.top_n, r.k)));
        }
        if !(0.0..=1.0).contains(&r.lambda) {
            return Err(Error::InvalidConfig(format!("retrieval.lambda ({}) must lie in [0, 1]", r.lambda)));
        }
        if self.ingest.embed_batch_size == 0 || self.embedding.batch_size == 0 {
            return Err(Error::InvalidConfig("batch sizes must be positive".into()));
        }
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_from(toml: &str) -> Config {
        Config::from_figment(Figment::from(Serialized::defaults(Settings::default())).merge(Toml::string(toml)))
    }

    #[test]
    fn defaults_reproduce_the_retrieval_parameters() {
        let s = Settings::default();
        assert_eq!((s.retrieval.fetch_k, s.retrieval.k, s.retrieval.top_n), (50, 10, 3));
        assert_eq!((s.chunking.chunk_size, s.chunking.chunk_overlap), (1000, 200));
        assert_eq!(s.chunking.separators, vec!["\n\n", "\n", " ", ""]);
        assert_eq!(s.rerank.model, "rerank-english-v3.0");
        assert!(s.validate().is_ok());
    }

    #[test]
    fn toml_overrides_single_fields() {
        let s = config_from("[retrieval]\ntop_n = 5\n[vector_store]\nbackend = \"memory\"").settings().expect("settings");
        assert_eq!(s.retrieval.top_n, 5);
        assert_eq!(s.retrieval.k, 10);
        assert_eq!(s.vector_store.backend, VectorBackend::Memory);
    }

    #[test]
    fn validation_rejects_inverted_stage_sizes() {
        let s = config_from("[retrieval]\nk = 60").settings().expect("settings");
        assert!(matches!(s.validate(), Err(Error::InvalidConfig(_))));
        let s = config_from("[chunking]\nchunk_overlap = 1200").settings().expect("settings");
        assert!(s.validate().is_err());
    }

    #[test]
    fn missing_keys_are_config_errors() {
        let keys = ApiKeys::default();
        let err = ApiKeys::require(&keys.cohere_api_key, "COHERE_API_KEY").unwrap_err();
        assert!(err.to_string().contains("COHERE_API_KEY"));
        assert!(!format!("{keys:?}").contains("Some"));
    }

    #[test]
    fn tilde_paths_expand_to_home() {
        std::env::set_var("MINIRAG_TEST_DIR", "/srv/minirag");
        assert_eq!(expand_path("${MINIRAG_TEST_DIR}/lance"), PathBuf::from("/srv/minirag/lance"));
        assert!(!expand_path("~/x").starts_with("~"));
    }
}
