//! Vector store error types.

use thiserror::Error;

/// Errors from vector store operations.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    /// Transport-level failure
    #[error("Request error: {0}")]
    Network(#[from] reqwest::Error),

    /// Store rejected the request
    #[error("Store error {status}: {message}")]
    Api { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("Failed to parse store response: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Misconfiguration (bad URL, zero dimensionality)
    #[error("Configuration error: {0}")]
    Config(String),
}
