//! Retrieval error types.
//!
//! Single-partition search failures are not represented here — they are
//! swallowed inside the fan-out and only logged. What remains is the one
//! failure that cannot be recovered locally: the query itself could not
//! be embedded.

use thiserror::Error;

use insight_embeddings::EmbeddingError;

/// Errors from retrieval operations.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// The query text could not be embedded by any backend
    #[error("Query embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),
}
