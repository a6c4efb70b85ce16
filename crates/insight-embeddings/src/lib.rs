//! # insight-embeddings
//!
//! Embedding pipeline for the insight engine: a persistent text→vector
//! cache in front of an ordered chain of embedding backends.
//!
//! The chain handles *capability* failure — a backend that is down or
//! misconfigured is skipped in favor of the next one. *Rate* failure is
//! handled below this layer: the primary backend's client retries
//! quota-class errors with credential rotation before the chain ever sees
//! an error. The two mechanisms are deliberately separate.
//!
//! ## Modules
//!
//! - [`cache`]: exact-text embedding cache (in-memory and write-through file)
//! - [`provider`]: the [`EmbeddingBackend`] seam and [`FallbackEmbedder`] chain
//! - [`backends`]: concrete backends (managed API, OpenAI-compatible, Ollama)
//! - [`mock`]: scriptable backend for tests
//! - [`error`]: error taxonomy, including quota classification for the
//!   sync pipeline's pause decision

pub mod backends;
pub mod cache;
pub mod error;
pub mod mock;
pub mod provider;

pub use backends::{build_backends, build_embedder, GeminiBackend, OllamaBackend, OpenAiBackend};
pub use cache::{EmbeddingCache, FileCache, InMemoryCache};
pub use error::EmbeddingError;
pub use mock::MockBackend;
pub use provider::{EmbeddingBackend, FallbackEmbedder};
