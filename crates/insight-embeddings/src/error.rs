//! Embedding error types.

use thiserror::Error;

use insight_llm::LlmError;

/// Errors that can occur during embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Every configured backend failed; wraps the last backend error.
    /// `quota_seen` records whether any backend failed on quota, so the
    /// sync pipeline can distinguish "pause and resume later" from
    /// "skip and log".
    #[error("No embedding backend available: {last}")]
    Unavailable {
        #[source]
        last: Box<EmbeddingError>,
        quota_seen: bool,
    },

    /// Primary provider error (already retried/rotated by its client)
    #[error("Provider error: {0}")]
    Llm(#[from] LlmError),

    /// Fallback backend rejected the request as rate-limited
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Fallback backend API rejection
    #[error("Backend {backend} error {status}: {message}")]
    Api {
        backend: String,
        status: u16,
        message: String,
    },

    /// Transport-level failure
    #[error("Request error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body did not match the expected shape
    #[error("Failed to parse backend response: {0}")]
    Parse(String),

    /// Cache persistence failure
    #[error("Cache error: {0}")]
    Cache(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Misconfiguration (e.g. no backends)
    #[error("Configuration error: {0}")]
    Config(String),
}

impl EmbeddingError {
    /// Whether this failure is quota-class.
    ///
    /// For [`EmbeddingError::Unavailable`] this reports whether *any*
    /// backend in the chain failed on quota — when the primary exhausts
    /// its quota and the fallbacks are simply unreachable, the run should
    /// still pause rather than discard the candidate.
    pub fn is_quota(&self) -> bool {
        match self {
            EmbeddingError::Llm(err) => err.is_quota(),
            EmbeddingError::RateLimited(_) => true,
            EmbeddingError::Unavailable { quota_seen, .. } => *quota_seen,
            _ => false,
        }
    }
}
