//! End-to-end test infrastructure for the insight engine.
//!
//! Provides a shared harness wiring the real pipeline components
//! (sync pipeline, retrieval engine, fallback embedder) against the
//! in-memory vector store and scripted embedding backends.

use std::sync::Arc;

use insight_embeddings::{EmbeddingCache, FallbackEmbedder, InMemoryCache, MockBackend};
use insight_retrieval::RetrievalEngine;
use insight_sync::SyncPipeline;
use insight_types::{ContentRecord, PartitionSpec, RecordKind, SearchConfig, SyncConfig};
use insight_vector::InMemoryStore;

/// Shared test harness for E2E tests.
pub struct TestHarness {
    pub store: Arc<InMemoryStore>,
    pub backend: Arc<MockBackend>,
    pub cache: Arc<InMemoryCache>,
    pub pipeline: SyncPipeline,
    pub engine: RetrievalEngine,
}

/// Initialize test logging once; verbosity follows `RUST_LOG`.
pub fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

impl TestHarness {
    /// Harness with a single scripted primary backend.
    pub fn with_backend(backend: MockBackend) -> Self {
        init_tracing();
        let primary = Arc::new(backend);
        let store = Arc::new(InMemoryStore::new());
        let cache = Arc::new(InMemoryCache::new());

        let embedder = Arc::new(
            FallbackEmbedder::new(
                vec![primary.clone()],
                cache.clone() as Arc<dyn EmbeddingCache>,
            )
            .expect("backend chain is non-empty"),
        );

        let sync_config = SyncConfig {
            probe_batch: 10,
            embed_batch: 5,
            inter_batch_delay_secs: 0,
        };

        let pipeline = SyncPipeline::new(store.clone(), embedder.clone(), sync_config);
        let engine = RetrievalEngine::new(
            store.clone(),
            embedder,
            default_partitions(),
            SearchConfig::default(),
        );

        Self {
            store,
            backend: primary,
            cache,
            pipeline,
            engine,
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::with_backend(MockBackend::returning("primary", vec![1.0, 0.0]))
    }
}

/// The standard three-partition layout.
pub fn default_partitions() -> Vec<PartitionSpec> {
    vec![
        PartitionSpec::new("products", RecordKind::Product),
        PartitionSpec::new("reviews", RecordKind::Review),
        PartitionSpec::new("sales", RecordKind::Sale),
    ]
}

/// Build `count` product records with distinct contents for one entity.
pub fn product_records(count: usize) -> Vec<ContentRecord> {
    (0..count)
        .map(|i| {
            ContentRecord::new(
                RecordKind::Product,
                format!("sku-{i}"),
                format!("Product {i}"),
                vec![
                    ("Name".to_string(), format!("Product {i}")),
                    ("Category".to_string(), "Test".to_string()),
                ],
            )
        })
        .collect()
}

/// A review record commenting on the given entity.
pub fn review_record(domain_id: &str, entity: &str, text: &str) -> ContentRecord {
    ContentRecord::new(
        RecordKind::Review,
        domain_id,
        entity,
        vec![
            ("Product".to_string(), entity.to_string()),
            ("Review".to_string(), text.to_string()),
        ],
    )
}
