//! # insight-vector
//!
//! Typed async client for the vector store's wire protocol: collection
//! lifecycle, point upsert, filtered similarity search, existence probes,
//! and the bulk scroll/delete maintenance surface.
//!
//! Connectivity is probed once at startup. When the store is unreachable
//! the client degrades to a disabled mode in which every call is a logged
//! no-op returning empty/absent — vector search turns off, the host
//! process does not crash.
//!
//! ## Modules
//!
//! - [`store`]: the [`VectorStore`] seam shared by all implementations
//! - [`qdrant`]: REST implementation with the degraded disabled mode
//! - [`memory`]: in-memory implementation for tests, with fault injection

pub mod error;
pub mod memory;
pub mod qdrant;
pub mod store;

pub use error::VectorStoreError;
pub use memory::InMemoryStore;
pub use qdrant::QdrantStore;
pub use store::VectorStore;
