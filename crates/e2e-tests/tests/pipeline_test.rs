//! End-to-end sync pipeline tests: idempotent re-runs, probe skipping,
//! and quota pause/resume across the real component wiring.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use e2e_tests::{default_partitions, product_records, TestHarness};
use insight_embeddings::{EmbeddingCache, FallbackEmbedder, InMemoryCache, MockBackend};
use insight_sync::{SyncOutcome, SyncPipeline};
use insight_types::{Metric, SyncConfig};

#[tokio::test]
async fn test_sync_then_search_round_trip() -> anyhow::Result<()> {
    let harness = TestHarness::default();
    harness
        .pipeline
        .prepare_partitions(&default_partitions(), 2, Metric::Cosine)
        .await?;

    let records = product_records(3);
    let outcome = harness.pipeline.sync_partition("products", &records).await;

    assert!(!outcome.is_paused());
    assert_eq!(outcome.stats().upserted, 3);
    assert_eq!(harness.store.point_count("products"), 3);

    let hits = harness.engine.quick_context("test products", 5).await?;
    assert_eq!(hits.len(), 3);
    assert!(hits.iter().all(|hit| hit.partition == "products"));
    Ok(())
}

#[tokio::test]
async fn test_second_run_embeds_nothing_and_point_count_is_stable() {
    let harness = TestHarness::default();
    let records = product_records(7);

    harness.pipeline.sync_partition("products", &records).await;
    let point_count = harness.store.point_count("products");
    let backend_calls = harness.backend.calls();

    let outcome = harness.pipeline.sync_partition("products", &records).await;

    // Unchanged candidate set: every id is found by the probe, the
    // backend is never called, and the store count does not move.
    assert_eq!(harness.backend.calls(), backend_calls);
    assert_eq!(harness.store.point_count("products"), point_count);
    assert_eq!(outcome.stats().already_synced, 7);
    assert_eq!(outcome.stats().embedded, 0);
}

#[tokio::test]
async fn test_changed_record_is_resynced_under_new_id() {
    let harness = TestHarness::default();
    let mut records = product_records(1);

    harness.pipeline.sync_partition("products", &records).await;
    assert_eq!(harness.store.point_count("products"), 1);

    // Content change => new deterministic id => a new point; the stale
    // one remains until purged by maintenance.
    records[0] = insight_types::ContentRecord::new(
        insight_types::RecordKind::Product,
        "sku-0",
        "Product 0",
        vec![("Name".to_string(), "Product 0 (renamed)".to_string())],
    );

    let outcome = harness.pipeline.sync_partition("products", &records).await;

    assert_eq!(outcome.stats().already_synced, 0);
    assert_eq!(outcome.stats().upserted, 1);
    assert_eq!(harness.store.point_count("products"), 2);
}

#[tokio::test]
async fn test_quota_pause_then_resume_skips_synced_prefix() {
    // First run: the whole chain is quota-limited, so the run pauses at
    // the start with everything remaining.
    let harness = TestHarness::with_backend(MockBackend::quota_limited("primary"));
    let records = product_records(4);

    let outcome = harness.pipeline.sync_partition("products", &records).await;
    match outcome {
        SyncOutcome::PausedOnQuota { remaining, .. } => assert_eq!(remaining, 4),
        other => panic!("expected quota pause, got {other:?}"),
    }
    assert_eq!(harness.store.point_count("products"), 0);

    // Quota returns: a fresh pipeline over the same store (same process
    // restart semantics) completes the remaining work.
    let healed = Arc::new(MockBackend::returning("primary", vec![1.0, 0.0]));
    let embedder = FallbackEmbedder::new(
        vec![healed.clone()],
        Arc::new(InMemoryCache::new()),
    )
    .unwrap();
    let resumed = SyncPipeline::new(
        harness.store.clone(),
        Arc::new(embedder),
        SyncConfig {
            probe_batch: 10,
            embed_batch: 5,
            inter_batch_delay_secs: 0,
        },
    );

    let outcome = resumed.sync_partition("products", &records).await;
    assert!(!outcome.is_paused());
    assert_eq!(outcome.stats().upserted, 4);
    assert_eq!(harness.store.point_count("products"), 4);

    // Third run: nothing left to do.
    let outcome = resumed.sync_partition("products", &records).await;
    assert_eq!(outcome.stats().already_synced, 4);
    assert_eq!(healed.calls(), 4);
}

#[tokio::test]
async fn test_partial_quota_run_leaves_durable_prefix() {
    // Cache pre-seeded for the first two contents: those embed without
    // touching the quota-limited backend, the third pauses the run.
    let records = product_records(3);
    let cache = InMemoryCache::new();
    for record in records.iter().take(2) {
        cache.put(&record.rendered_content, vec![1.0, 0.0]).unwrap();
    }

    let store = Arc::new(insight_vector::InMemoryStore::new());
    let embedder = FallbackEmbedder::new(
        vec![Arc::new(MockBackend::quota_limited("primary"))],
        Arc::new(cache),
    )
    .unwrap();
    let pipeline = SyncPipeline::new(
        store.clone(),
        Arc::new(embedder),
        SyncConfig {
            probe_batch: 10,
            embed_batch: 5,
            inter_batch_delay_secs: 0,
        },
    );

    let outcome = pipeline.sync_partition("products", &records).await;

    match outcome {
        SyncOutcome::PausedOnQuota { stats, remaining } => {
            // The two cache-served candidates were flushed before the
            // pause; only the third remains for the next run.
            assert_eq!(stats.upserted, 2);
            assert_eq!(remaining, 1);
        }
        other => panic!("expected quota pause, got {other:?}"),
    }
    assert_eq!(store.point_count("products"), 2);
}
