//! Deep-mode context synthesis.
//!
//! Regroups fan-out hits by logical entity and renders one multi-section
//! profile per entity. Every rendered line is tagged with the originating
//! hit id so a downstream citation renderer can link back to the exact
//! source point.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use insight_types::{ContextResult, PartitionSpec, RecordKind};

/// Bucket hits fall into within an entity profile, derived from the
/// record kind of the hit's partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetRole {
    /// The entity's primary record (product data)
    Primary,
    /// Commentary about the entity (customer reviews)
    Commentary,
    /// Transactional history (sales)
    Transactional,
}

impl FacetRole {
    fn from_kind(kind: RecordKind) -> Self {
        match kind {
            RecordKind::Product => FacetRole::Primary,
            RecordKind::Review => FacetRole::Commentary,
            RecordKind::Sale => FacetRole::Transactional,
        }
    }

    /// Section heading used in the rendered profile.
    pub fn heading(&self) -> &'static str {
        match self {
            FacetRole::Primary => "Primary record",
            FacetRole::Commentary => "Commentary",
            FacetRole::Transactional => "Transactions",
        }
    }
}

/// One role bucket within an entity profile.
#[derive(Debug, Serialize)]
pub struct ProfileSection {
    pub role: FacetRole,

    /// `[hit-id] content` lines, in merged score order
    pub lines: Vec<String>,
}

/// A synthesized multi-facet view of one logical entity.
#[derive(Debug, Serialize)]
pub struct EntityProfile {
    /// Entity key from the hits' payloads, or `"Global"` when absent
    pub entity: String,

    /// Non-empty sections, in role order
    pub sections: Vec<ProfileSection>,

    /// Highest hit score in the group (used for profile ordering)
    pub best_score: f32,
}

impl EntityProfile {
    /// Render the profile as a structured text block.
    pub fn render(&self) -> String {
        let mut out = format!("## {}\n", self.entity);
        for section in &self.sections {
            out.push_str(&format!("### {}\n", section.role.heading()));
            for line in &section.lines {
                out.push_str(line);
                out.push('\n');
            }
        }
        out
    }
}

/// Fallback group for hits without an entity key in their payload.
const GLOBAL_BUCKET: &str = "Global";

/// Group hits by entity and bucket them by role.
///
/// `hits` is expected in merged score order; line order inside each
/// section preserves it. Profiles come out sorted by best score
/// descending, ties broken by entity name for determinism.
pub fn synthesize(partitions: &[PartitionSpec], hits: &[ContextResult]) -> Vec<EntityProfile> {
    let kind_by_partition: HashMap<&str, RecordKind> = partitions
        .iter()
        .map(|spec| (spec.name.as_str(), spec.kind))
        .collect();

    // Entity -> role -> lines, with first-seen order tracked separately
    // so grouping stays deterministic.
    let mut groups: HashMap<String, Vec<(FacetRole, String, f32)>> = HashMap::new();
    let mut seen_order: Vec<String> = Vec::new();

    for hit in hits {
        let entity = hit
            .payload
            .get("entity")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .unwrap_or(GLOBAL_BUCKET)
            .to_string();

        let role = kind_by_partition
            .get(hit.partition.as_str())
            .copied()
            .map(FacetRole::from_kind)
            .unwrap_or(FacetRole::Primary);

        let line = format!("- [{}] {}", hit.id, hit.content);

        if !groups.contains_key(&entity) {
            seen_order.push(entity.clone());
        }
        groups
            .entry(entity)
            .or_default()
            .push((role, line, hit.score));
    }

    let mut profiles: Vec<EntityProfile> = seen_order
        .into_iter()
        .filter_map(|entity| {
            let entries = groups.remove(&entity)?;
            let best_score = entries
                .iter()
                .map(|(_, _, score)| *score)
                .fold(f32::NEG_INFINITY, f32::max);

            let mut sections: Vec<ProfileSection> = Vec::new();
            for role in [
                FacetRole::Primary,
                FacetRole::Commentary,
                FacetRole::Transactional,
            ] {
                let lines: Vec<String> = entries
                    .iter()
                    .filter(|(r, _, _)| *r == role)
                    .map(|(_, line, _)| line.clone())
                    .collect();
                if !lines.is_empty() {
                    sections.push(ProfileSection { role, lines });
                }
            }

            Some(EntityProfile {
                entity,
                sections,
                best_score,
            })
        })
        .collect();

    profiles.sort_by(|a, b| {
        b.best_score
            .partial_cmp(&a.best_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.entity.cmp(&b.entity))
    });

    profiles
}
