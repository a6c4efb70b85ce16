//! In-memory vector store for tests.
//!
//! Implements the full [`VectorStore`] contract with cosine scoring and
//! equality filters, plus per-collection fault injection so tests can
//! exercise partition failure isolation and probe fail-open behavior.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;

use insight_types::{ContextResult, FieldFilter, Metric, VectorPoint};

use crate::error::VectorStoreError;
use crate::store::VectorStore;

struct Collection {
    dim: usize,
    metric: Metric,
    points: HashMap<String, VectorPoint>,
    /// Insertion order, so scans are deterministic
    order: Vec<String>,
}

#[derive(Default)]
struct Faults {
    failing_search: HashSet<String>,
    failing_probe: HashSet<String>,
}

/// In-memory implementation of [`VectorStore`].
#[derive(Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
    faults: RwLock<Faults>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `search` on a collection return an error.
    pub fn fail_search(&self, name: &str) {
        if let Ok(mut faults) = self.faults.write() {
            faults.failing_search.insert(name.to_string());
        }
    }

    /// Make existence probes on a collection behave as transport failures
    /// (which the contract maps to "assume missing").
    pub fn fail_probe(&self, name: &str) {
        if let Ok(mut faults) = self.faults.write() {
            faults.failing_probe.insert(name.to_string());
        }
    }

    /// Clear injected faults.
    pub fn heal(&self) {
        if let Ok(mut faults) = self.faults.write() {
            faults.failing_search.clear();
            faults.failing_probe.clear();
        }
    }

    /// Number of points in a collection.
    pub fn point_count(&self, name: &str) -> usize {
        self.collections
            .read()
            .ok()
            .and_then(|collections| collections.get(name).map(|c| c.points.len()))
            .unwrap_or(0)
    }

    /// Dimensionality of a collection, if it exists.
    pub fn collection_dim(&self, name: &str) -> Option<usize> {
        self.collections
            .read()
            .ok()
            .and_then(|collections| collections.get(name).map(|c| c.dim))
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }
    dot / denom
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn ensure_collection(
        &self,
        name: &str,
        dim: usize,
        metric: Metric,
    ) -> Result<(), VectorStoreError> {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| VectorStoreError::Config("store lock poisoned".into()))?;

        match collections.get(name) {
            Some(existing) if existing.dim == dim && existing.metric == metric => Ok(()),
            _ => {
                // Create, or hard-reset on schema drift.
                collections.insert(
                    name.to_string(),
                    Collection {
                        dim,
                        metric,
                        points: HashMap::new(),
                        order: Vec::new(),
                    },
                );
                Ok(())
            }
        }
    }

    async fn upsert(&self, name: &str, points: Vec<VectorPoint>) -> Result<(), VectorStoreError> {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| VectorStoreError::Config("store lock poisoned".into()))?;

        let collection = collections.entry(name.to_string()).or_insert(Collection {
            dim: points.first().map(|p| p.vector.len()).unwrap_or(0),
            metric: Metric::Cosine,
            points: HashMap::new(),
            order: Vec::new(),
        });

        for point in points {
            if !collection.points.contains_key(&point.id) {
                collection.order.push(point.id.clone());
            }
            collection.points.insert(point.id.clone(), point);
        }
        Ok(())
    }

    async fn search(
        &self,
        name: &str,
        vector: &[f32],
        limit: usize,
        filter: Option<&FieldFilter>,
    ) -> Result<Vec<ContextResult>, VectorStoreError> {
        if self
            .faults
            .read()
            .map(|f| f.failing_search.contains(name))
            .unwrap_or(false)
        {
            return Err(VectorStoreError::Api {
                status: 500,
                message: format!("injected search failure for {name}"),
            });
        }

        let collections = self
            .collections
            .read()
            .map_err(|_| VectorStoreError::Config("store lock poisoned".into()))?;

        let Some(collection) = collections.get(name) else {
            return Ok(Vec::new());
        };

        let mut hits: Vec<ContextResult> = collection
            .order
            .iter()
            .filter_map(|id| collection.points.get(id))
            .filter(|point| filter.map_or(true, |f| f.matches(&point.payload)))
            .map(|point| ContextResult {
                partition: name.to_string(),
                score: cosine(vector, &point.vector),
                content: point
                    .payload
                    .get("content")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                id: point.id.clone(),
                payload: point.payload.clone(),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(limit);
        Ok(hits)
    }

    async fn exists(&self, name: &str, ids: &[String]) -> HashSet<String> {
        if self
            .faults
            .read()
            .map(|f| f.failing_probe.contains(name))
            .unwrap_or(false)
        {
            // Simulated transport failure: fail open, assume missing.
            return HashSet::new();
        }

        let Ok(collections) = self.collections.read() else {
            return HashSet::new();
        };
        let Some(collection) = collections.get(name) else {
            return HashSet::new();
        };

        ids.iter()
            .filter(|id| collection.points.contains_key(*id))
            .cloned()
            .collect()
    }

    async fn scroll(
        &self,
        name: &str,
        filter: Option<&FieldFilter>,
        limit: usize,
    ) -> Result<Vec<VectorPoint>, VectorStoreError> {
        let collections = self
            .collections
            .read()
            .map_err(|_| VectorStoreError::Config("store lock poisoned".into()))?;

        let Some(collection) = collections.get(name) else {
            return Ok(Vec::new());
        };

        Ok(collection
            .order
            .iter()
            .filter_map(|id| collection.points.get(id))
            .filter(|point| filter.map_or(true, |f| f.matches(&point.payload)))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn delete_by_filter(
        &self,
        name: &str,
        filter: &FieldFilter,
    ) -> Result<(), VectorStoreError> {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| VectorStoreError::Config("store lock poisoned".into()))?;

        if let Some(collection) = collections.get_mut(name) {
            collection
                .points
                .retain(|_, point| !filter.matches(&point.payload));
            let points = &collection.points;
            collection.order.retain(|id| points.contains_key(id));
        }
        Ok(())
    }

    fn is_available(&self) -> bool {
        true
    }
}
