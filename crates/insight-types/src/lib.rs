//! # insight-types
//!
//! Shared domain types for the insight retrieval and sync engine.
//!
//! This crate defines the data model that flows between the engine
//! components:
//! - Content records: business entities (products, reviews, sales) staged
//!   for vector indexing
//! - Content addressing: deterministic, content-derived point identifiers
//! - Vector points and search projections
//! - Layered configuration for the whole engine
//!
//! ## Usage
//!
//! ```rust
//! use insight_types::{point_id, ContentRecord, RecordKind};
//!
//! let record = ContentRecord::new(
//!     RecordKind::Product,
//!     "sku-1042",
//!     "Walnut Desk",
//!     vec![("Name".into(), "Walnut Desk".into())],
//! );
//! let id = point_id(record.kind, &record.domain_id, &record.rendered_content);
//! assert_eq!(id, point_id(record.kind, &record.domain_id, &record.rendered_content));
//! ```

pub mod config;
pub mod error;
pub mod ident;
pub mod point;
pub mod record;

pub use config::{
    EmbeddingConfig, EngineConfig, LlmConfig, OllamaConfig, OpenAiConfig, RetryConfig,
    SearchConfig, SyncConfig, VectorStoreConfig,
};
pub use error::ConfigError;
pub use ident::{content_id, point_id};
pub use point::{ContextResult, FieldFilter, Metric, PartitionSpec, VectorPoint};
pub use record::{render_fields, ContentRecord, RecordKind};
