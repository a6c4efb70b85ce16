//! HTTP client for the managed LLM provider.
//!
//! Wraps the two provider operations the engine consumes — embedding and
//! text generation — behind the quota-aware retry policy. Every attempt
//! is re-bound to the next credential in the pool, so the wire call and
//! the rotation stay in lockstep.

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use insight_types::{LlmConfig, RetryConfig};

use crate::credentials::CredentialPool;
use crate::error::LlmError;
use crate::retry::RetryPolicy;

/// One part of a generation prompt.
///
/// Inline data carries base64-encoded bytes (the caller encodes); it is
/// how image attachments reach the provider alongside the text prompt.
#[derive(Debug, Clone)]
pub enum GenerationPart {
    Text(String),
    InlineData { mime_type: String, data: String },
}

/// Client for the provider's embedding and generation endpoints.
pub struct LlmClient {
    http: Client,
    pool: CredentialPool,
    retry: RetryPolicy,
    config: LlmConfig,
}

impl LlmClient {
    /// Build a client. Fails fast on an empty credential list.
    pub fn new(config: LlmConfig, retry: &RetryConfig) -> Result<Self, LlmError> {
        let pool = CredentialPool::new(config.api_keys.clone())?;
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Config(e.to_string()))?;

        Ok(Self {
            http,
            pool,
            retry: RetryPolicy::from_config(retry),
            config,
        })
    }

    /// Embedding model this client is configured for.
    pub fn embed_model(&self) -> &str {
        &self.config.embed_model
    }

    /// Generate an embedding for a text, with quota retry + key rotation.
    pub async fn embed_content(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        self.retry
            .run(|attempt| {
                let key = self.pool.key_for(attempt).clone();
                self.embed_once(key, text)
            })
            .await
    }

    /// Generate text from a prompt plus optional multimodal parts, with
    /// quota retry + key rotation.
    pub async fn generate_text(&self, parts: &[GenerationPart]) -> Result<String, LlmError> {
        self.retry
            .run(|attempt| {
                let key = self.pool.key_for(attempt).clone();
                self.generate_once(key, parts)
            })
            .await
    }

    async fn embed_once(&self, key: SecretString, text: &str) -> Result<Vec<f32>, LlmError> {
        #[derive(Deserialize)]
        struct EmbedResponse {
            embedding: EmbeddingValues,
        }

        #[derive(Deserialize)]
        struct EmbeddingValues {
            values: Vec<f32>,
        }

        let url = format!(
            "{}/v1beta/models/{}:embedContent",
            self.config.base_url, self.config.embed_model
        );
        let body = json!({
            "content": { "parts": [{ "text": text }] }
        });

        debug!(model = %self.config.embed_model, chars = text.len(), "Requesting embedding");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", key.expose_secret())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::from_response(status, &body));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        if parsed.embedding.values.is_empty() {
            return Err(LlmError::Parse("empty embedding in response".into()));
        }

        Ok(parsed.embedding.values)
    }

    async fn generate_once(
        &self,
        key: SecretString,
        parts: &[GenerationPart],
    ) -> Result<String, LlmError> {
        #[derive(Deserialize)]
        struct GenerateResponse {
            candidates: Vec<Candidate>,
        }

        #[derive(Deserialize)]
        struct Candidate {
            content: CandidateContent,
        }

        #[derive(Deserialize)]
        struct CandidateContent {
            parts: Vec<CandidatePart>,
        }

        #[derive(Deserialize)]
        struct CandidatePart {
            #[serde(default)]
            text: String,
        }

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, self.config.text_model
        );
        let body = json!({
            "contents": [{ "parts": parts_to_json(parts) }]
        });

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", key.expose_secret())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::from_response(status, &body));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .ok_or_else(|| LlmError::Parse("no candidates in response".into()))
    }
}

/// Render prompt parts into the provider wire format.
fn parts_to_json(parts: &[GenerationPart]) -> Vec<Value> {
    parts
        .iter()
        .map(|part| match part {
            GenerationPart::Text(text) => json!({ "text": text }),
            GenerationPart::InlineData { mime_type, data } => json!({
                "inline_data": { "mime_type": mime_type, "data": data }
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use insight_types::LlmConfig;

    #[test]
    fn test_client_rejects_empty_credentials() {
        let config = LlmConfig::default(); // api_keys empty by default
        let result = LlmClient::new(config, &RetryConfig::default());
        assert!(matches!(result, Err(LlmError::Config(_))));
    }

    #[test]
    fn test_client_builds_with_keys() {
        let config = LlmConfig {
            api_keys: vec!["key-a".into(), "key-b".into()],
            ..LlmConfig::default()
        };
        let client = LlmClient::new(config, &RetryConfig::default()).unwrap();
        assert_eq!(client.embed_model(), "gemini-embedding-001");
    }

    #[test]
    fn test_parts_to_json_text() {
        let parts = vec![GenerationPart::Text("hello".into())];
        let rendered = parts_to_json(&parts);
        assert_eq!(rendered, vec![json!({ "text": "hello" })]);
    }

    #[test]
    fn test_parts_to_json_inline_data() {
        let parts = vec![
            GenerationPart::Text("describe this".into()),
            GenerationPart::InlineData {
                mime_type: "image/png".into(),
                data: "aGVsbG8=".into(),
            },
        ];
        let rendered = parts_to_json(&parts);
        assert_eq!(rendered.len(), 2);
        assert_eq!(
            rendered[1],
            json!({ "inline_data": { "mime_type": "image/png", "data": "aGVsbG8=" } })
        );
    }
}
