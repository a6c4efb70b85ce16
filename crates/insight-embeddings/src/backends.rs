//! Concrete embedding backends.
//!
//! Ordering is fixed by `build_backends`: the managed provider first
//! (it carries quota retry and credential rotation in its client), then
//! the OpenAI-compatible endpoint, then local Ollama.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::info;

use insight_llm::{is_quota_message, LlmClient};
use insight_types::{EngineConfig, OllamaConfig, OpenAiConfig};

use crate::cache::{EmbeddingCache, FileCache, InMemoryCache};
use crate::error::EmbeddingError;
use crate::provider::{EmbeddingBackend, FallbackEmbedder};

const FALLBACK_TIMEOUT_SECS: u64 = 30;

/// Primary backend: the managed LLM provider via [`LlmClient`].
///
/// Quota handling happens inside the client (retry + key rotation), so a
/// quota error surfacing here means the whole pool is exhausted.
pub struct GeminiBackend {
    client: Arc<LlmClient>,
    label: String,
}

impl GeminiBackend {
    pub fn new(client: Arc<LlmClient>) -> Self {
        let label = client.embed_model().to_string();
        Self { client, label }
    }
}

#[async_trait]
impl EmbeddingBackend for GeminiBackend {
    fn name(&self) -> &str {
        &self.label
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.client.embed_content(text).await?)
    }
}

/// Secondary backend: an OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAiBackend {
    http: Client,
    base_url: String,
    model: String,
    api_key: SecretString,
}

impl OpenAiBackend {
    pub fn new(config: &OpenAiConfig, api_key: impl Into<String>) -> Result<Self, EmbeddingError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(FALLBACK_TIMEOUT_SECS))
            .build()
            .map_err(|e| EmbeddingError::Config(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            api_key: SecretString::from(api_key.into()),
        })
    }
}

#[async_trait]
impl EmbeddingBackend for OpenAiBackend {
    fn name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        #[derive(serde::Deserialize)]
        struct EmbeddingsResponse {
            data: Vec<EmbeddingItem>,
        }

        #[derive(serde::Deserialize)]
        struct EmbeddingItem {
            embedding: Vec<f32>,
        }

        let url = format!("{}/embeddings", self.base_url);
        let body = json!({ "model": self.model, "input": [text] });

        let response = self
            .http
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            if status == 429 || is_quota_message(&message) {
                return Err(EmbeddingError::RateLimited(message));
            }
            return Err(EmbeddingError::Api {
                backend: self.model.clone(),
                status,
                message,
            });
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Parse(e.to_string()))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .ok_or_else(|| EmbeddingError::Parse("empty embeddings response".into()))
    }
}

/// Tertiary backend: a local Ollama instance's `/api/embed` endpoint.
pub struct OllamaBackend {
    http: Client,
    url: String,
    model: String,
}

impl OllamaBackend {
    pub fn new(config: &OllamaConfig) -> Result<Self, EmbeddingError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(FALLBACK_TIMEOUT_SECS))
            .build()
            .map_err(|e| EmbeddingError::Config(e.to_string()))?;

        Ok(Self {
            http,
            url: config.url.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl EmbeddingBackend for OllamaBackend {
    fn name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        #[derive(serde::Deserialize)]
        struct EmbedResponse {
            embeddings: Vec<Vec<f32>>,
        }

        let url = format!("{}/api/embed", self.url);
        let body = json!({ "model": self.model, "input": [text] });

        let response = self.http.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api {
                backend: self.model.clone(),
                status,
                message,
            });
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Parse(e.to_string()))?;

        parsed
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Parse("empty embeddings response".into()))
    }
}

/// Build the backend chain from configuration.
///
/// The primary backend is always present (its client fails fast without
/// credentials); the OpenAI fallback joins only when a key is configured;
/// Ollama is always appended as the last resort.
pub fn build_backends(
    config: &EngineConfig,
    llm_client: Arc<LlmClient>,
) -> Result<Vec<Arc<dyn EmbeddingBackend>>, EmbeddingError> {
    let mut backends: Vec<Arc<dyn EmbeddingBackend>> =
        vec![Arc::new(GeminiBackend::new(llm_client))];

    if let Some(key) = &config.embedding.openai.api_key {
        backends.push(Arc::new(OpenAiBackend::new(
            &config.embedding.openai,
            key.clone(),
        )?));
    }

    backends.push(Arc::new(OllamaBackend::new(&config.embedding.ollama)?));

    info!(backends = backends.len(), "Built embedding backend chain");
    Ok(backends)
}

/// Build the full embedder (cache + chain) from configuration.
pub fn build_embedder(
    config: &EngineConfig,
    llm_client: Arc<LlmClient>,
) -> Result<FallbackEmbedder, EmbeddingError> {
    let cache: Arc<dyn EmbeddingCache> = match &config.embedding.cache_path {
        Some(path) => Arc::new(FileCache::open(path)?),
        None => Arc::new(InMemoryCache::new()),
    };

    let backends = build_backends(config, llm_client)?;
    FallbackEmbedder::new(backends, cache)
}

#[cfg(test)]
mod tests {
    use super::*;
    use insight_types::{LlmConfig, RetryConfig};

    fn llm_client() -> Arc<LlmClient> {
        let config = LlmConfig {
            api_keys: vec!["test-key".into()],
            ..LlmConfig::default()
        };
        Arc::new(LlmClient::new(config, &RetryConfig::default()).unwrap())
    }

    #[test]
    fn test_chain_without_openai_key() {
        let config = EngineConfig::default();
        let backends = build_backends(&config, llm_client()).unwrap();
        // Primary + Ollama; no OpenAI key configured.
        assert_eq!(backends.len(), 2);
        assert_eq!(backends[0].name(), "gemini-embedding-001");
        assert_eq!(backends[1].name(), "nomic-embed-text");
    }

    #[test]
    fn test_chain_with_openai_key() {
        let mut config = EngineConfig::default();
        config.embedding.openai.api_key = Some("sk-test".into());
        let backends = build_backends(&config, llm_client()).unwrap();
        assert_eq!(backends.len(), 3);
        assert_eq!(backends[1].name(), "text-embedding-3-large");
    }

    #[test]
    fn test_build_embedder_in_memory_cache() {
        let config = EngineConfig::default();
        let embedder = build_embedder(&config, llm_client()).unwrap();
        assert_eq!(embedder.cached_entries(), 0);
    }
}
