//! Embedding backend seam and fallback chain.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::cache::EmbeddingCache;
use crate::error::EmbeddingError;

/// A single embedding backend.
///
/// Implementations must be thread-safe; the engine shares one chain
/// across the sync pipeline and the retrieval engine.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Backend label used in logs and error messages.
    fn name(&self) -> &str;

    /// Embed one text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Cache-first embedder over an ordered backend chain.
///
/// A cache hit returns without any network call. On a miss the backends
/// are tried in configuration order; the first success is written through
/// to the cache and returned. Backends are *not* individually retried
/// here — the chain exists for capability failure, while quota retry
/// (with credential rotation) lives inside the primary backend's client.
pub struct FallbackEmbedder {
    backends: Vec<Arc<dyn EmbeddingBackend>>,
    cache: Arc<dyn EmbeddingCache>,
}

impl FallbackEmbedder {
    /// Build the chain. Fails fast when no backends are configured.
    pub fn new(
        backends: Vec<Arc<dyn EmbeddingBackend>>,
        cache: Arc<dyn EmbeddingCache>,
    ) -> Result<Self, EmbeddingError> {
        if backends.is_empty() {
            return Err(EmbeddingError::Config(
                "no embedding backends configured".into(),
            ));
        }
        Ok(Self { backends, cache })
    }

    /// Embed one text through the cache and chain.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if let Some(vector) = self.cache.get(text) {
            debug!(chars = text.len(), "Embedding cache hit");
            return Ok(vector);
        }

        let mut quota_seen = false;
        let mut last: Option<EmbeddingError> = None;

        for backend in &self.backends {
            match backend.embed(text).await {
                Ok(vector) => {
                    self.cache.put(text, vector.clone())?;
                    debug!(backend = backend.name(), dim = vector.len(), "Embedded text");
                    return Ok(vector);
                }
                Err(err) => {
                    quota_seen |= err.is_quota();
                    warn!(
                        backend = backend.name(),
                        error = %err,
                        "Embedding backend failed; trying next"
                    );
                    last = Some(err);
                }
            }
        }

        // `backends` is non-empty, so at least one error was recorded.
        let last = last.unwrap_or(EmbeddingError::Config("no embedding backends".into()));
        Err(EmbeddingError::Unavailable {
            last: Box::new(last),
            quota_seen,
        })
    }

    /// Embed a batch as sequential `embed` calls.
    ///
    /// Sequential by design: the batch path already throttles itself at
    /// the sync layer, and per-text caching makes parallel dispatch a
    /// throughput tunable rather than a correctness concern.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Number of entries in the underlying cache.
    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::cache::InMemoryCache;
    use crate::mock::MockBackend;

    fn chain(backends: Vec<Arc<dyn EmbeddingBackend>>) -> FallbackEmbedder {
        FallbackEmbedder::new(backends, Arc::new(InMemoryCache::new())).unwrap()
    }

    #[tokio::test]
    async fn test_cache_short_circuits_second_call() {
        let primary = Arc::new(MockBackend::returning("primary", vec![1.0, 2.0]));
        let embedder = chain(vec![primary.clone()]);

        let first = embedder.embed("same text").await.unwrap();
        let second = embedder.embed("same text").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(primary.calls(), 1);
    }

    #[tokio::test]
    async fn test_fallback_ordering() {
        let primary = Arc::new(MockBackend::failing("primary"));
        let secondary = Arc::new(MockBackend::returning("secondary", vec![0.5]));
        let tertiary = Arc::new(MockBackend::returning("tertiary", vec![0.9]));
        let embedder = chain(vec![primary.clone(), secondary.clone(), tertiary.clone()]);

        let vector = embedder.embed("text").await.unwrap();

        assert_eq!(vector, vec![0.5]);
        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 1);
        assert_eq!(tertiary.calls(), 0);
    }

    #[tokio::test]
    async fn test_success_skips_later_backends() {
        let primary = Arc::new(MockBackend::returning("primary", vec![1.0]));
        let secondary = Arc::new(MockBackend::returning("secondary", vec![2.0]));
        let embedder = chain(vec![primary.clone(), secondary.clone()]);

        embedder.embed("text").await.unwrap();

        assert_eq!(primary.calls(), 1);
        assert_eq!(secondary.calls(), 0);
    }

    #[tokio::test]
    async fn test_all_backends_failing_is_unavailable() {
        let embedder = chain(vec![
            Arc::new(MockBackend::failing("a")),
            Arc::new(MockBackend::failing("b")),
        ]);

        let err = embedder.embed("text").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Unavailable { .. }));
        assert!(!err.is_quota());
    }

    #[tokio::test]
    async fn test_quota_classification_survives_chain() {
        // Primary exhausts quota, fallbacks are plainly down: the chain
        // failure must still read as quota so the sync run pauses.
        let embedder = chain(vec![
            Arc::new(MockBackend::quota_limited("primary")),
            Arc::new(MockBackend::failing("secondary")),
        ]);

        let err = embedder.embed("text").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Unavailable { .. }));
        assert!(err.is_quota());
    }

    #[tokio::test]
    async fn test_failed_calls_never_populate_cache() {
        let cache = Arc::new(InMemoryCache::new());
        let embedder = FallbackEmbedder::new(
            vec![Arc::new(MockBackend::failing("primary"))],
            cache.clone(),
        )
        .unwrap();

        let _ = embedder.embed("text").await;
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn test_batch_is_sequential_embed() {
        let primary = Arc::new(MockBackend::returning("primary", vec![1.0]));
        let embedder = chain(vec![primary.clone()]);

        let texts = vec!["a".to_string(), "b".to_string(), "a".to_string()];
        let vectors = embedder.embed_batch(&texts).await.unwrap();

        assert_eq!(vectors.len(), 3);
        // Third text repeats the first and is served from cache.
        assert_eq!(primary.calls(), 2);
    }

    #[test]
    fn test_empty_chain_is_config_error() {
        let result = FallbackEmbedder::new(Vec::new(), Arc::new(InMemoryCache::new()));
        assert!(matches!(result, Err(EmbeddingError::Config(_))));
    }
}
