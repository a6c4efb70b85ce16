//! Fan-out retrieval engine.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use insight_embeddings::FallbackEmbedder;
use insight_types::{ContextResult, PartitionSpec, SearchConfig};
use insight_vector::VectorStore;

use crate::error::RetrievalError;
use crate::synthesis::{synthesize, EntityProfile};

/// Result of a deep retrieval: the raw ranked hits plus the synthesized
/// per-entity profiles.
#[derive(Debug, serde::Serialize)]
pub struct DeepContext {
    /// Merged hits, score-descending
    pub hits: Vec<ContextResult>,

    /// Multi-facet profiles grouped by logical entity
    pub profiles: Vec<EntityProfile>,
}

/// Query-side engine over the configured partitions.
///
/// Constructed with explicit dependencies so tests can substitute an
/// in-memory store and scripted embedding backends.
pub struct RetrievalEngine {
    store: Arc<dyn VectorStore>,
    embedder: Arc<FallbackEmbedder>,
    partitions: Vec<PartitionSpec>,
    config: SearchConfig,
}

impl RetrievalEngine {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<FallbackEmbedder>,
        partitions: Vec<PartitionSpec>,
        config: SearchConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            partitions,
            config,
        }
    }

    /// Quick retrieval: fan out with the per-partition `limit`, merge,
    /// and truncate to `2 * limit`.
    ///
    /// The merge sorts score-descending with a stable sort; hits arrive
    /// in partition-declaration order, so equal scores keep that order —
    /// the documented tie-break rule.
    pub async fn quick_context(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ContextResult>, RetrievalError> {
        let vector = self.embedder.embed(query).await?;
        let mut hits = self.fan_out(&vector, limit).await;

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(limit * 2);

        debug!(query_chars = query.len(), hits = hits.len(), "Quick retrieval complete");
        Ok(hits)
    }

    /// Quick retrieval with the configured default limit.
    pub async fn quick_context_default(
        &self,
        query: &str,
    ) -> Result<Vec<ContextResult>, RetrievalError> {
        self.quick_context(query, self.config.quick_limit).await
    }

    /// Deep retrieval: a wider fan-out (`limit * deep_multiplier` per
    /// partition) followed by entity synthesis.
    pub async fn deep_context(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<DeepContext, RetrievalError> {
        let vector = self.embedder.embed(query).await?;
        let per_partition = limit * self.config.deep_multiplier;
        let mut hits = self.fan_out(&vector, per_partition).await;

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let profiles = synthesize(&self.partitions, &hits);
        debug!(
            hits = hits.len(),
            entities = profiles.len(),
            "Deep retrieval complete"
        );

        Ok(DeepContext { hits, profiles })
    }

    /// Search every partition concurrently with the same query vector.
    ///
    /// All searches are issued at once and joined; a failing partition
    /// logs a warning and contributes zero hits, preserving
    /// partial-result availability. The returned hits are concatenated in
    /// partition-declaration order.
    async fn fan_out(&self, vector: &[f32], limit: usize) -> Vec<ContextResult> {
        let handles: Vec<_> = self
            .partitions
            .iter()
            .map(|spec| {
                let store = Arc::clone(&self.store);
                let name = spec.name.clone();
                let vector = vector.to_vec();
                tokio::spawn(async move {
                    match store.search(&name, &vector, limit, None).await {
                        Ok(hits) => hits,
                        Err(err) => {
                            warn!(
                                partition = %name,
                                error = %err,
                                "Partition search failed; continuing without it"
                            );
                            Vec::new()
                        }
                    }
                })
            })
            .collect();

        let mut all = Vec::new();
        for joined in join_all(handles).await {
            match joined {
                Ok(hits) => all.extend(hits),
                Err(err) => warn!(error = %err, "Partition search task aborted"),
            }
        }
        all
    }
}
