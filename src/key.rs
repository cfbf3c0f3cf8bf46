//! Versioned key ordering: primary ascending by `key` bytes, secondary
//! **descending** by `trx_id` - the newest version of a key sorts first.
//!
//! Grounded in `original_source/src/skiplist/skiplist.cpp`'s `Compare`
//! for the ordering rule itself. Keys stay plain byte slices/vectors here
//! rather than a wrapper that packs a timestamp suffix into the key's
//! byte representation, since `trx_id` is carried as a separate field
//! throughout this crate.

use std::cmp::Ordering;

/// Compares two `(key, trx_id)` pairs under the VersionedKey ordering.
pub fn versioned_cmp(key_a: &[u8], trx_a: u64, key_b: &[u8], trx_b: u64) -> Ordering {
    key_a.cmp(key_b).then_with(|| trx_b.cmp(&trx_a))
}

/// `true` when `key` starts with `prefix`.
pub fn has_prefix(key: &[u8], prefix: &[u8]) -> bool {
    key.len() >= prefix.len() && &key[..prefix.len()] == prefix
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_trx_id_sorts_first() {
        assert_eq!(versioned_cmp(b"k", 3, b"k", 1), Ordering::Less);
        assert_eq!(versioned_cmp(b"k", 1, b"k", 3), Ordering::Greater);
        assert_eq!(versioned_cmp(b"k", 1, b"k", 1), Ordering::Equal);
    }

    #[test]
    fn key_dominates_trx_id() {
        assert_eq!(versioned_cmp(b"a", 100, b"b", 1), Ordering::Less);
        assert_eq!(versioned_cmp(b"b", 1, b"a", 100), Ordering::Greater);
    }

    #[test]
    fn prefix_matching() {
        assert!(has_prefix(b"apple", b"app"));
        assert!(!has_prefix(b"ap", b"app"));
        assert!(has_prefix(b"app", b"app"));
    }
}
