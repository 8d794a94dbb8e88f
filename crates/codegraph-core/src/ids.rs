//! Deterministic content-addressed identifiers.
//!
//! Entity and relationship IDs are derived from their identity tuple so that
//! re-indexing unchanged source produces the same ID, which is what makes
//! upsert semantics well-defined (see `graph_store`).

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};

const ID_LEN: usize = 12;

fn digest_prefix(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let encoded = URL_SAFE_NO_PAD.encode(digest);
    encoded[..ID_LEN.min(encoded.len())].to_string()
}

/// Compute an entity ID from its identity tuple.
///
/// `base64url(sha256("{file_path}|{type}|{name}|{start}-{end}"))[0..12]`
pub fn entity_id(file_path: &str, entity_type: &str, name: &str, start: u64, end: u64) -> String {
    let key = format!("{file_path}|{entity_type}|{name}|{start}-{end}");
    digest_prefix(&key)
}

/// Compute a relationship ID from its identity tuple.
///
/// `base64url(sha256("{from_id}|{to_id}|{type}"))[0..12]`
pub fn relationship_id(from_id: &str, to_id: &str, rel_type: &str) -> String {
    let key = format!("{from_id}|{to_id}|{rel_type}");
    digest_prefix(&key)
}

/// Compute the content hash of an entity's source span.
pub fn content_hash(span: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(span);
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Compute the whole-file digest used by the Parser's cache and the Indexer's
/// skip-if-unchanged check. Independent of any externally supplied hash.
pub fn file_digest(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_is_deterministic() {
        let a = entity_id("src/lib.rs", "function", "parse", 10, 120);
        let b = entity_id("src/lib.rs", "function", "parse", 10, 120);
        assert_eq!(a, b);
        assert_eq!(a.len(), ID_LEN);
    }

    #[test]
    fn entity_id_changes_with_any_key_component() {
        let base = entity_id("src/lib.rs", "function", "parse", 10, 120);
        assert_ne!(base, entity_id("src/other.rs", "function", "parse", 10, 120));
        assert_ne!(base, entity_id("src/lib.rs", "method", "parse", 10, 120));
        assert_ne!(base, entity_id("src/lib.rs", "function", "parse2", 10, 120));
        assert_ne!(base, entity_id("src/lib.rs", "function", "parse", 11, 120));
    }

    #[test]
    fn relationship_id_is_deterministic_and_directional() {
        let a = relationship_id("e1", "e2", "calls");
        let b = relationship_id("e1", "e2", "calls");
        assert_eq!(a, b);
        assert_ne!(a, relationship_id("e2", "e1", "calls"));
    }

    #[test]
    fn content_hash_changes_with_bytes() {
        assert_ne!(content_hash(b"fn a() {}"), content_hash(b"fn b() {}"));
        assert_eq!(content_hash(b"fn a() {}"), content_hash(b"fn a() {}"));
    }
}
