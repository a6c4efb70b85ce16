//! Configuration error types.

use thiserror::Error;

/// Errors raised while loading or validating engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Invalid(String),

    /// Failed to read or merge configuration sources
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}
