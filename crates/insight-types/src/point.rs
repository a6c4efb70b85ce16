//! Vector points, partitions, and search projections.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::record::RecordKind;

/// Distance metric for a partition, fixed at creation time.
///
/// Changing the metric (or the dimensionality) of an existing partition
/// requires a destructive recreate plus a full reindex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    /// Cosine distance (the reference configuration)
    Cosine,
    /// Dot product
    Dot,
    /// Euclidean distance
    Euclid,
}

impl Metric {
    /// Wire name used by the vector store protocol.
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Cosine => "Cosine",
            Metric::Dot => "Dot",
            Metric::Euclid => "Euclid",
        }
    }
}

/// A named logical partition in the vector store, holding points of a
/// single record kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionSpec {
    /// Collection name in the vector store (e.g. "products")
    pub name: String,

    /// Record kind stored in this partition
    pub kind: RecordKind,
}

impl PartitionSpec {
    pub fn new(name: impl Into<String>, kind: RecordKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// A stored vector plus its payload, addressed by a deterministic id.
///
/// Created at sync time, overwritten when the source record's rendered
/// content changes, deleted only by explicit purge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorPoint {
    /// Content-addressed identifier (see [`crate::ident::point_id`])
    pub id: String,

    /// Embedding vector
    pub vector: Vec<f32>,

    /// Metadata payload (kind, domain_id, entity, content)
    pub payload: Map<String, Value>,
}

/// A read-only search hit projection. Never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ContextResult {
    /// Partition the hit came from
    pub partition: String,

    /// Similarity score reported by the store
    pub score: f32,

    /// Rendered content text of the underlying record
    pub content: String,

    /// Point id, used for citation back-links
    pub id: String,

    /// Full payload of the hit
    pub payload: Map<String, Value>,
}

/// Equality predicates applied server-side to search, scroll, and delete.
#[derive(Debug, Clone, Default)]
pub struct FieldFilter {
    /// Conjunction of `payload[key] == value` conditions
    pub must: Vec<(String, String)>,
}

impl FieldFilter {
    /// Single-condition filter: `payload[key] == value`.
    pub fn eq(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            must: vec![(key.into(), value.into())],
        }
    }

    /// Add a further equality condition.
    pub fn and(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.must.push((key.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.must.is_empty()
    }

    /// Check a payload against every condition.
    pub fn matches(&self, payload: &Map<String, Value>) -> bool {
        self.must.iter().all(|(key, value)| {
            payload
                .get(key)
                .and_then(Value::as_str)
                .is_some_and(|v| v == value)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(kind: &str, entity: &str) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("kind".into(), json!(kind));
        map.insert("entity".into(), json!(entity));
        map
    }

    #[test]
    fn test_metric_wire_names() {
        assert_eq!(Metric::Cosine.as_str(), "Cosine");
        assert_eq!(Metric::Dot.as_str(), "Dot");
        assert_eq!(Metric::Euclid.as_str(), "Euclid");
    }

    #[test]
    fn test_filter_matches_all_conditions() {
        let filter = FieldFilter::eq("kind", "product").and("entity", "Desk");
        assert!(filter.matches(&payload("product", "Desk")));
        assert!(!filter.matches(&payload("product", "Chair")));
        assert!(!filter.matches(&payload("review", "Desk")));
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = FieldFilter::default();
        assert!(filter.is_empty());
        assert!(filter.matches(&payload("product", "Desk")));
    }

    #[test]
    fn test_filter_ignores_non_string_values() {
        let mut map = Map::new();
        map.insert("count".into(), json!(3));
        let filter = FieldFilter::eq("count", "3");
        assert!(!filter.matches(&map));
    }
}
