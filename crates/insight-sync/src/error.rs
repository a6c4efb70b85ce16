//! Sync error types.
//!
//! Most batch-path conditions never become errors: probe failures fail
//! open, quota exhaustion pauses the run, and per-candidate embedding or
//! upsert failures are logged and retried by the next run. These
//! variants surface only from the live single-record path and from
//! partition preparation, where the caller needs to know.

use thiserror::Error;

use insight_embeddings::EmbeddingError;
use insight_vector::VectorStoreError;

/// Errors from sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Embedding failed for a live single-record index
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Vector store rejected an operation
    #[error("Vector store error: {0}")]
    Store(#[from] VectorStoreError),
}
