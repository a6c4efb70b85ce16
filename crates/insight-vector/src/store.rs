//! The vector store seam.

use std::collections::HashSet;

use async_trait::async_trait;

use insight_types::{ContextResult, FieldFilter, Metric, VectorPoint};

use crate::error::VectorStoreError;

/// Typed contract over the vector store wire protocol.
///
/// Implementations: [`crate::qdrant::QdrantStore`] for the real store,
/// [`crate::memory::InMemoryStore`] for tests.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Idempotent create-or-recreate of a collection.
    ///
    /// When the collection exists with a different dimensionality it is
    /// dropped and recreated — a hard reset on schema drift, never a
    /// silent migration. The stale points are gone afterwards; the sync
    /// pipeline re-fills the collection on its next run.
    async fn ensure_collection(
        &self,
        name: &str,
        dim: usize,
        metric: Metric,
    ) -> Result<(), VectorStoreError>;

    /// Upsert points with overwrite-by-id semantics (write wins, no merge).
    async fn upsert(&self, name: &str, points: Vec<VectorPoint>) -> Result<(), VectorStoreError>;

    /// Similarity search returning ranked hits, optionally pre-filtered
    /// by payload equality predicates.
    async fn search(
        &self,
        name: &str,
        vector: &[f32],
        limit: usize,
        filter: Option<&FieldFilter>,
    ) -> Result<Vec<ContextResult>, VectorStoreError>;

    /// Existence probe for a batch of ids.
    ///
    /// Infallible by contract: a transport error returns the empty set —
    /// "assume missing" fails open toward re-syncing work, never closed
    /// toward silently dropping it.
    async fn exists(&self, name: &str, ids: &[String]) -> HashSet<String>;

    /// Bulk enumerate points matching a filter. Maintenance surface, not
    /// on the hot path.
    async fn scroll(
        &self,
        name: &str,
        filter: Option<&FieldFilter>,
        limit: usize,
    ) -> Result<Vec<VectorPoint>, VectorStoreError>;

    /// Bulk delete points matching a filter.
    async fn delete_by_filter(
        &self,
        name: &str,
        filter: &FieldFilter,
    ) -> Result<(), VectorStoreError>;

    /// Whether the store came up healthy at startup. `false` means every
    /// call is a documented no-op.
    fn is_available(&self) -> bool;
}
