//! Stable hash of a request's effective filter set, embedded in every
//! cursor so a later page request can be checked against the filters it was
//! issued under.

use sha2::{Digest, Sha256};

/// Hashes a canonical, already-sorted list of `field=comparison=value`
/// strings. Sorting is the caller's responsibility — this function only
/// hashes what it's given.
pub fn hash_filters(canonical_parts: &[String]) -> String {
    let mut hasher = Sha256::new();
    for part in canonical_parts {
        hasher.update(part.as_bytes());
        hasher.update(b"\0");
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_input_hashes_identically() {
        let a = hash_filters(&["owner==alice".to_string()]);
        let b = hash_filters(&["owner==alice".to_string()]);
        assert_eq!(a, b);
    }

    #[test]
    fn different_filters_hash_differently() {
        let a = hash_filters(&["owner==alice".to_string()]);
        let b = hash_filters(&["owner==bob".to_string()]);
        assert_ne!(a, b);
    }

    #[test]
    fn empty_filters_has_a_stable_hash() {
        assert_eq!(hash_filters(&[]), hash_filters(&[]));
    }
}
