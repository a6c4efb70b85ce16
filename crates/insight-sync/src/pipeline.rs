//! The resumable sync pipeline.
//!
//! A run walks Collecting -> Probing -> Embedding -> Upserting and ends
//! either Done or PausedOnQuota. Each embedded sub-batch is upserted
//! before the next begins, so stopping after sub-batch K leaves 1..K
//! durably synced and re-probing resumes from K+1.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use insight_embeddings::FallbackEmbedder;
use insight_types::{point_id, ContentRecord, Metric, PartitionSpec, RecordKind, SyncConfig, VectorPoint};
use insight_vector::VectorStore;

use crate::error::SyncError;

/// Counters for one sync run.
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct SyncStats {
    /// Candidates collected from the source records
    pub candidates: usize,
    /// Candidates dropped because their id already existed
    pub already_synced: usize,
    /// Candidates embedded this run
    pub embedded: usize,
    /// Points durably upserted this run
    pub upserted: usize,
    /// Candidates skipped on non-quota failures (retried next run)
    pub failed: usize,
}

/// How a sync run ended.
#[derive(Debug)]
pub enum SyncOutcome {
    /// Every candidate was probed and the pending ones were processed
    Completed(SyncStats),

    /// Embedding quota is exhausted; the run stopped cleanly at the
    /// current checkpoint with `remaining` candidates left for the next
    /// invocation
    PausedOnQuota { stats: SyncStats, remaining: usize },
}

impl SyncOutcome {
    pub fn stats(&self) -> &SyncStats {
        match self {
            SyncOutcome::Completed(stats) => stats,
            SyncOutcome::PausedOnQuota { stats, .. } => stats,
        }
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, SyncOutcome::PausedOnQuota { .. })
    }
}

/// One unit of pending work, derived from a source record.
#[derive(Clone)]
struct Candidate {
    id: String,
    content: String,
    payload: Map<String, Value>,
}

/// Batch and live-path indexer into the vector store.
pub struct SyncPipeline {
    store: Arc<dyn VectorStore>,
    embedder: Arc<FallbackEmbedder>,
    config: SyncConfig,
}

impl SyncPipeline {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<FallbackEmbedder>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            config,
        }
    }

    /// Create (or schema-check) the collections for the given partitions.
    ///
    /// Called once before the first sync; idempotent after that.
    pub async fn prepare_partitions(
        &self,
        partitions: &[PartitionSpec],
        dim: usize,
        metric: Metric,
    ) -> Result<(), SyncError> {
        for spec in partitions {
            self.store.ensure_collection(&spec.name, dim, metric).await?;
        }
        Ok(())
    }

    /// Run one sync pass of `records` into `partition`.
    ///
    /// Infallible by contract: quota exhaustion ends the run as
    /// [`SyncOutcome::PausedOnQuota`] (a scheduling signal, not an
    /// error), probe failures fail open, and per-candidate embedding or
    /// upsert failures are logged, counted, and picked up by the next
    /// run's probe.
    pub async fn sync_partition(&self, partition: &str, records: &[ContentRecord]) -> SyncOutcome {
        let candidates = collect(records);
        let mut stats = SyncStats {
            candidates: candidates.len(),
            ..SyncStats::default()
        };

        // Probing: drop candidates whose checkpoint (the point itself)
        // already exists. A failed probe returns the empty set, so the
        // whole batch is treated as missing and re-embedded rather than
        // silently dropped.
        let mut pending: Vec<Candidate> = Vec::new();
        for batch in candidates.chunks(self.config.probe_batch) {
            let ids: Vec<String> = batch.iter().map(|c| c.id.clone()).collect();
            let present = self.store.exists(partition, &ids).await;
            for candidate in batch {
                if present.contains(&candidate.id) {
                    stats.already_synced += 1;
                } else {
                    pending.push(candidate.clone());
                }
            }
        }

        info!(
            partition,
            candidates = stats.candidates,
            already_synced = stats.already_synced,
            pending = pending.len(),
            "Sync probe complete"
        );

        // Embedding + Upserting, one sub-batch at a time.
        for (index, sub_batch) in pending.chunks(self.config.embed_batch).enumerate() {
            if index > 0 {
                // Courtesy throttle between sub-batches, independent of
                // the reactive backoff inside the embedding client.
                tokio::time::sleep(Duration::from_secs(self.config.inter_batch_delay_secs)).await;
            }

            let mut points: Vec<VectorPoint> = Vec::with_capacity(sub_batch.len());
            for candidate in sub_batch {
                match self.embedder.embed(&candidate.content).await {
                    Ok(vector) => points.push(VectorPoint {
                        id: candidate.id.clone(),
                        vector,
                        payload: candidate.payload.clone(),
                    }),
                    Err(err) if err.is_quota() => {
                        // Flush what this sub-batch already paid for, then
                        // pause at the checkpoint.
                        stats.embedded += points.len();
                        self.flush(partition, points, &mut stats).await;
                        let remaining = pending.len() - stats.upserted;
                        warn!(
                            partition,
                            remaining,
                            "Embedding quota exhausted; pausing sync run"
                        );
                        return SyncOutcome::PausedOnQuota { stats, remaining };
                    }
                    Err(err) => {
                        warn!(
                            partition,
                            id = %candidate.id,
                            error = %err,
                            "Embedding failed; candidate will be retried next run"
                        );
                        stats.failed += 1;
                    }
                }
            }

            stats.embedded += points.len();
            self.flush(partition, points, &mut stats).await;
            debug!(
                partition,
                sub_batch = index,
                upserted = stats.upserted,
                "Sub-batch durable"
            );
        }

        info!(
            partition,
            upserted = stats.upserted,
            failed = stats.failed,
            "Sync run complete"
        );
        SyncOutcome::Completed(stats)
    }

    /// Live write path: embed and upsert a single record immediately
    /// after an application create/update.
    ///
    /// Shares the id derivation and payload shape with the batch path, so
    /// a later bulk re-sync sees the point as already present. Errors
    /// propagate here — the caller triggered a specific write and needs
    /// to know it did not land; the periodic re-sync remains the safety
    /// net either way.
    pub async fn index_record(
        &self,
        partition: &str,
        record: &ContentRecord,
    ) -> Result<(), SyncError> {
        let id = point_id(record.kind, &record.domain_id, &record.rendered_content);
        let vector = self.embedder.embed(&record.rendered_content).await?;
        self.store
            .upsert(
                partition,
                vec![VectorPoint {
                    id,
                    vector,
                    payload: record.payload(),
                }],
            )
            .await?;
        debug!(partition, domain_id = %record.domain_id, "Indexed record");
        Ok(())
    }

    /// Maintenance: delete every point of one kind from a partition.
    pub async fn purge_kind(&self, partition: &str, kind: RecordKind) -> Result<(), SyncError> {
        self.store
            .delete_by_filter(
                partition,
                &insight_types::FieldFilter::eq("kind", kind.as_str()),
            )
            .await?;
        info!(partition, kind = %kind, "Purged points by kind");
        Ok(())
    }

    /// Upsert a sub-batch, counting successes and logging failures.
    ///
    /// A failed upsert wrote no ids, so the next run's probe re-finds
    /// the candidates; the run keeps going with the other sub-batches.
    async fn flush(&self, partition: &str, points: Vec<VectorPoint>, stats: &mut SyncStats) {
        if points.is_empty() {
            return;
        }
        let count = points.len();
        match self.store.upsert(partition, points).await {
            Ok(()) => stats.upserted += count,
            Err(err) => {
                warn!(
                    partition,
                    count,
                    error = %err,
                    "Upsert failed; candidates will be retried next run"
                );
                stats.failed += count;
            }
        }
    }
}

/// Collecting: derive `(id, content, payload)` candidates from records.
fn collect(records: &[ContentRecord]) -> Vec<Candidate> {
    records
        .iter()
        .map(|record| Candidate {
            id: point_id(record.kind, &record.domain_id, &record.rendered_content),
            content: record.rendered_content.clone(),
            payload: record.payload(),
        })
        .collect()
}
