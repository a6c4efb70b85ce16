//! Deterministic content-addressed identifiers.
//!
//! Identity contract, fixed across processes and languages: the parts are
//! joined with `|`, the UTF-8 bytes are hashed with SHA-256, and the first
//! 32 hex characters of the lowercase digest are grouped `8-4-4-4-12`.
//! The grouping exists only for vector-store id compatibility and carries
//! no semantic meaning. Any consumer persisting these ids must derive them
//! the same way.
//!
//! Because the id is a pure function of content, re-upserting an unchanged
//! record overwrites its existing point instead of duplicating it, and
//! "does this id exist" doubles as the sync checkpoint.

use sha2::{Digest, Sha256};

use crate::record::RecordKind;

/// Separator placed between id parts before hashing.
const PART_SEPARATOR: &str = "|";

/// Derive a grouped hex identifier from an ordered list of parts.
///
/// Pure: no I/O, no randomness, no clock. Identical parts always produce
/// the identical id.
pub fn content_id(parts: &[&str]) -> String {
    let joined = parts.join(PART_SEPARATOR);
    let digest = Sha256::digest(joined.as_bytes());

    let mut hex = String::with_capacity(32);
    for byte in digest.iter().take(16) {
        hex.push_str(&format!("{:02x}", byte));
    }

    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

/// Identifier for the vector point of a business record.
///
/// Derived from `(kind, domain_id, rendered_content)`: a record whose
/// rendered content changes gets a new id (and the old point is purged by
/// maintenance), while an unchanged record maps to its existing point.
pub fn point_id(kind: RecordKind, domain_id: &str, rendered_content: &str) -> String {
    content_id(&[kind.as_str(), domain_id, rendered_content])
}
