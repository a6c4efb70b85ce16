//! Business record types staged for vector indexing.
//!
//! The engine only reads these records; they are owned by the relational
//! collaborator that produced them.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of business record a vector point is derived from.
///
/// Each kind maps to exactly one vector-store partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// A catalog product (the primary record for an entity)
    Product,
    /// A customer review (commentary on an entity)
    Review,
    /// A sales transaction (transactional history for an entity)
    Sale,
}

impl RecordKind {
    /// Stable lowercase name used in ids, payloads, and filters.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Product => "product",
            RecordKind::Review => "review",
            RecordKind::Sale => "sale",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A logical business entity staged for indexing.
///
/// `rendered_content` is derived deterministically from `fields` at
/// construction time and is the exact text fed to the embedder and used
/// for content addressing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentRecord {
    /// Stable business key from the relational store
    pub domain_id: String,

    /// Record kind (determines the target partition)
    pub kind: RecordKind,

    /// Logical entity name this record belongs to (e.g. the product name
    /// a review is about); used for grouping in deep retrieval
    pub entity: String,

    /// Ordered key/value pairs used to render the content text
    pub fields: Vec<(String, String)>,

    /// Canonical text rendition of `fields`
    pub rendered_content: String,
}

impl ContentRecord {
    /// Build a record, rendering `fields` into the canonical content text.
    pub fn new(
        kind: RecordKind,
        domain_id: impl Into<String>,
        entity: impl Into<String>,
        fields: Vec<(String, String)>,
    ) -> Self {
        let rendered_content = render_fields(&fields);
        Self {
            domain_id: domain_id.into(),
            kind,
            entity: entity.into(),
            fields,
            rendered_content,
        }
    }

    /// Payload stored alongside the vector point for this record.
    pub fn payload(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("kind".into(), Value::String(self.kind.as_str().into()));
        payload.insert("domain_id".into(), Value::String(self.domain_id.clone()));
        payload.insert("entity".into(), Value::String(self.entity.clone()));
        payload.insert(
            "content".into(),
            Value::String(self.rendered_content.clone()),
        );
        payload.insert(
            "indexed_at".into(),
            Value::String(Utc::now().to_rfc3339()),
        );
        payload
    }
}

/// Render ordered fields into the canonical content text.
///
/// One `Key: value` line per field, in declaration order. The rendering
/// must stay byte-stable: point ids are derived from its output, and any
/// change re-indexes every record.
pub fn render_fields(fields: &[(String, String)]) -> String {
    fields
        .iter()
        .map(|(key, value)| format!("{}: {}", key, value))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_fields_order_and_format() {
        let fields = vec![
            ("Name".to_string(), "Walnut Desk".to_string()),
            ("Category".to_string(), "Furniture".to_string()),
        ];
        assert_eq!(
            render_fields(&fields),
            "Name: Walnut Desk\nCategory: Furniture"
        );
    }

    #[test]
    fn test_render_fields_is_deterministic() {
        let fields = vec![("A".to_string(), "1".to_string())];
        assert_eq!(render_fields(&fields), render_fields(&fields));
    }

    #[test]
    fn test_record_renders_on_construction() {
        let record = ContentRecord::new(
            RecordKind::Review,
            "rev-9",
            "Walnut Desk",
            vec![("Rating".to_string(), "5".to_string())],
        );
        assert_eq!(record.rendered_content, "Rating: 5");
    }

    #[test]
    fn test_payload_shape() {
        let record = ContentRecord::new(
            RecordKind::Sale,
            "sale-3",
            "Walnut Desk",
            vec![("Quantity".to_string(), "2".to_string())],
        );
        let payload = record.payload();
        assert_eq!(payload["kind"], "sale");
        assert_eq!(payload["domain_id"], "sale-3");
        assert_eq!(payload["entity"], "Walnut Desk");
        assert_eq!(payload["content"], "Quantity: 2");
        assert!(payload.contains_key("indexed_at"));
    }

    #[test]
    fn test_kind_round_trip() {
        let json = serde_json::to_string(&RecordKind::Product).unwrap();
        assert_eq!(json, "\"product\"");
        let kind: RecordKind = serde_json::from_str("\"review\"").unwrap();
        assert_eq!(kind, RecordKind::Review);
    }
}
