//! Engine configuration.
//!
//! Layered loading: built-in defaults -> TOML file at the platform config
//! dir (`insight/engine.toml`) -> environment variables prefixed with
//! `INSIGHT__` (double underscore as section separator).
//!
//! API keys are usually supplied through the environment rather than the
//! config file; they are moved into `secrecy`-wrapped types at client
//! construction and never logged.

use std::path::PathBuf;

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::point::{Metric, PartitionSpec};
use crate::record::RecordKind;

/// Vector store connection and partition geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    /// Base URL of the vector store REST endpoint
    #[serde(default = "default_vector_url")]
    pub url: String,

    /// Optional API key sent as the `api-key` header
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_vector_timeout")]
    pub timeout_secs: u64,

    /// Vector dimensionality, fixed per partition at creation time
    #[serde(default = "default_dim")]
    pub dim: usize,

    /// Distance metric, fixed per partition at creation time
    #[serde(default = "default_metric")]
    pub metric: Metric,
}

fn default_vector_url() -> String {
    "http://localhost:6333".to_string()
}

fn default_vector_timeout() -> u64 {
    30
}

fn default_dim() -> usize {
    3072
}

fn default_metric() -> Metric {
    Metric::Cosine
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            url: default_vector_url(),
            api_key: None,
            timeout_secs: default_vector_timeout(),
            dim: default_dim(),
            metric: default_metric(),
        }
    }
}

/// Managed LLM provider endpoint (primary embedding + text generation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API base URL
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    /// Embedding model name
    #[serde(default = "default_embed_model")]
    pub embed_model: String,

    /// Text generation model name
    #[serde(default = "default_text_model")]
    pub text_model: String,

    /// Rotatable API keys; attempt `n` of a retried call uses key `n mod len`
    #[serde(default)]
    pub api_keys: Vec<String>,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_llm_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_embed_model() -> String {
    "gemini-embedding-001".to_string()
}

fn default_text_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_llm_timeout() -> u64 {
    60
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            embed_model: default_embed_model(),
            text_model: default_text_model(),
            api_keys: Vec::new(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

/// OpenAI-compatible fallback embedding endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    #[serde(default = "default_openai_model")]
    pub model: String,

    /// API key; the backend is skipped at build time when absent
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "text-embedding-3-large".to_string()
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_openai_model(),
            api_key: None,
        }
    }
}

/// Local Ollama fallback embedding endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_url")]
    pub url: String,

    #[serde(default = "default_ollama_model")]
    pub model: String,
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "nomic-embed-text".to_string()
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: default_ollama_url(),
            model: default_ollama_model(),
        }
    }
}

/// Embedding cache and fallback backends.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Path of the write-through cache file; `None` keeps the cache in memory
    #[serde(default)]
    pub cache_path: Option<PathBuf>,

    /// Secondary backend (OpenAI-compatible)
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Tertiary backend (local Ollama)
    #[serde(default)]
    pub ollama: OllamaConfig,
}

/// Quota-aware retry tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the initial attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// First backoff delay in milliseconds; doubles per attempt
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Backoff ceiling in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Batch sync tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Ids per existence probe call
    #[serde(default = "default_probe_batch")]
    pub probe_batch: usize,

    /// Candidates per embed-and-upsert sub-batch
    #[serde(default = "default_embed_batch")]
    pub embed_batch: usize,

    /// Courtesy delay between sub-batches, in seconds; applied regardless
    /// of success and independent of the reactive retry backoff
    #[serde(default = "default_inter_batch_delay")]
    pub inter_batch_delay_secs: u64,
}

fn default_probe_batch() -> usize {
    10
}

fn default_embed_batch() -> usize {
    5
}

fn default_inter_batch_delay() -> u64 {
    3
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            probe_batch: default_probe_batch(),
            embed_batch: default_embed_batch(),
            inter_batch_delay_secs: default_inter_batch_delay(),
        }
    }
}

/// Retrieval fan-out tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Per-partition hit limit in quick mode
    #[serde(default = "default_quick_limit")]
    pub quick_limit: usize,

    /// Deep mode fetches `quick_limit * deep_multiplier` hits per partition
    #[serde(default = "default_deep_multiplier")]
    pub deep_multiplier: usize,
}

fn default_quick_limit() -> usize {
    5
}

fn default_deep_multiplier() -> usize {
    3
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            quick_limit: default_quick_limit(),
            deep_multiplier: default_deep_multiplier(),
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub vector: VectorStoreConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub search: SearchConfig,

    /// Logical partitions; one per record kind
    #[serde(default = "default_partitions")]
    pub partitions: Vec<PartitionSpec>,
}

fn default_partitions() -> Vec<PartitionSpec> {
    vec![
        PartitionSpec::new("products", RecordKind::Product),
        PartitionSpec::new("reviews", RecordKind::Review),
        PartitionSpec::new("sales", RecordKind::Sale),
    ]
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            vector: VectorStoreConfig::default(),
            llm: LlmConfig::default(),
            embedding: EmbeddingConfig::default(),
            retry: RetryConfig::default(),
            sync: SyncConfig::default(),
            search: SearchConfig::default(),
            partitions: default_partitions(),
        }
    }
}

impl EngineConfig {
    /// Load configuration: defaults -> config file (if present) -> env vars.
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(dirs) = ProjectDirs::from("", "", "insight") {
            let path = dirs.config_dir().join("engine.toml");
            if path.exists() {
                builder = builder.add_source(File::from(path));
            }
        }

        let merged = builder
            .add_source(Environment::with_prefix("INSIGHT").separator("__"))
            .build()?;

        let engine: EngineConfig = merged.try_deserialize()?;
        engine.validate()?;
        Ok(engine)
    }

    /// Validate cross-field invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.partitions.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one partition must be configured".into(),
            ));
        }
        if self.vector.dim == 0 {
            return Err(ConfigError::Invalid("vector.dim must be > 0".into()));
        }
        if self.sync.probe_batch == 0 || self.sync.embed_batch == 0 {
            return Err(ConfigError::Invalid(
                "sync batch sizes must be > 0".into(),
            ));
        }
        if self.search.quick_limit == 0 || self.search.deep_multiplier == 0 {
            return Err(ConfigError::Invalid(
                "search limits must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.vector.dim, 3072);
        assert_eq!(config.vector.metric, Metric::Cosine);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.sync.probe_batch, 10);
        assert_eq!(config.sync.embed_batch, 5);
        assert_eq!(config.partitions.len(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let raw = r#"
            [vector]
            url = "http://qdrant.internal:6333"

            [retry]
            max_retries = 5
        "#;
        let config: EngineConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.vector.url, "http://qdrant.internal:6333");
        assert_eq!(config.vector.dim, 3072);
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.base_delay_ms, 1_000);
    }

    #[test]
    fn test_validate_rejects_empty_partitions() {
        let config = EngineConfig {
            partitions: Vec::new(),
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_dim() {
        let mut config = EngineConfig::default();
        config.vector.dim = 0;
        assert!(config.validate().is_err());
    }
}
