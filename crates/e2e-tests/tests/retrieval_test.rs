//! End-to-end retrieval tests: cross-partition merge ordering and
//! deep-mode synthesis over data placed by the real sync path.

use pretty_assertions::assert_eq;

use e2e_tests::{review_record, TestHarness};
use insight_embeddings::EmbeddingCache;
use insight_types::{ContentRecord, RecordKind, VectorPoint};
use insight_vector::VectorStore;

fn point(id: &str, vector: Vec<f32>, kind: &str, entity: &str, content: &str) -> VectorPoint {
    let mut payload = serde_json::Map::new();
    payload.insert("kind".into(), serde_json::json!(kind));
    payload.insert("entity".into(), serde_json::json!(entity));
    payload.insert("content".into(), serde_json::json!(content));
    VectorPoint {
        id: id.into(),
        vector,
        payload,
    }
}

#[tokio::test]
async fn test_cross_partition_merge_orders_by_score() {
    let harness = TestHarness::default();

    // Query vector is [1.0, 0.0]; partition B's point is closer.
    harness
        .store
        .upsert(
            "products",
            vec![point("p1", vec![0.9, 0.4], "product", "Desk", "product hit")],
        )
        .await
        .unwrap();
    harness
        .store
        .upsert(
            "reviews",
            vec![point("r1", vec![1.0, 0.0], "review", "Desk", "review hit")],
        )
        .await
        .unwrap();

    let hits = harness.engine.quick_context("desk", 5).await.unwrap();

    let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["r1", "p1"]);
}

#[tokio::test]
async fn test_failing_partition_degrades_to_partial_results() {
    let harness = TestHarness::default();

    harness
        .store
        .upsert(
            "products",
            vec![point("p1", vec![1.0, 0.0], "product", "Desk", "product hit")],
        )
        .await
        .unwrap();
    harness
        .store
        .upsert(
            "sales",
            vec![point("s1", vec![0.8, 0.2], "sale", "Desk", "sale hit")],
        )
        .await
        .unwrap();
    harness.store.fail_search("reviews");

    let hits = harness.engine.quick_context("desk", 5).await.unwrap();

    // Reviews contributed nothing; the two healthy partitions still
    // produce a merged, score-sorted context.
    let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["p1", "s1"]);
}

#[tokio::test]
async fn test_deep_mode_builds_cited_entity_profiles() {
    let harness = TestHarness::default();

    // Index through the real sync path so payloads carry entity + content.
    let desk = ContentRecord::new(
        RecordKind::Product,
        "sku-desk",
        "Walnut Desk",
        vec![("Name".to_string(), "Walnut Desk".to_string())],
    );
    harness.pipeline.index_record("products", &desk).await.unwrap();
    harness
        .pipeline
        .index_record(
            "reviews",
            &review_record("rev-1", "Walnut Desk", "Sturdy and beautiful"),
        )
        .await
        .unwrap();

    let deep = harness.engine.deep_context("walnut desk", 5).await.unwrap();

    assert_eq!(deep.profiles.len(), 1);
    let profile = &deep.profiles[0];
    assert_eq!(profile.entity, "Walnut Desk");
    assert_eq!(profile.sections.len(), 2);

    // Every rendered line is tagged with its source point id.
    let rendered = profile.render();
    for hit in &deep.hits {
        assert!(
            rendered.contains(&format!("[{}]", hit.id)),
            "profile should cite {}",
            hit.id
        );
    }
}

#[tokio::test]
async fn test_query_embedding_is_cached_across_modes() {
    let harness = TestHarness::default();
    harness
        .store
        .upsert(
            "products",
            vec![point("p1", vec![1.0, 0.0], "product", "Desk", "hit")],
        )
        .await
        .unwrap();

    harness.engine.quick_context("same query", 5).await.unwrap();
    let calls_after_first = harness.backend.calls();

    harness.engine.quick_context("same query", 5).await.unwrap();
    harness.engine.deep_context("same query", 5).await.unwrap();

    // One backend call total: the repeated query is served from cache.
    assert_eq!(harness.backend.calls(), calls_after_first);
    assert_eq!(calls_after_first, 1);
    assert_eq!(harness.cache.len(), 1);
}
