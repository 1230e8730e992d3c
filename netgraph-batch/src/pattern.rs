//! Stable pattern hashing over a failure exclusion set (§4.8 step 2b): two
//! iterations that fail the same nodes and links are the same pattern regardless
//! of which iteration index produced them first.

use sha2::{Digest, Sha256};

/// Hashes the sorted, pipe-joined node and link identifiers. Sorting first makes
/// the hash insertion-order independent; [`netgraph_core::ExclusionMask`] already
/// keeps its sets sorted after [`netgraph_scenarios::apply_failures`], but this
/// sorts again so the function is correct for any caller.
pub fn pattern_hash(excluded_nodes: &[String], excluded_links: &[String]) -> u64 {
    let mut nodes = excluded_nodes.to_vec();
    let mut links = excluded_links.to_vec();
    nodes.sort();
    links.sort();

    let mut hasher = Sha256::new();
    hasher.update(b"nodes:");
    for n in &nodes {
        hasher.update(n.as_bytes());
        hasher.update([0u8]);
    }
    hasher.update(b"links:");
    for l in &links {
        hasher.update(l.as_bytes());
        hasher.update([0u8]);
    }
    let digest = hasher.finalize();
    u64::from_le_bytes(digest[..8].try_into().expect("sha256 digest is 32 bytes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_independent_within_each_set() {
        let a = pattern_hash(&["B".into(), "A".into()], &["e2".into(), "e1".into()]);
        let b = pattern_hash(&["A".into(), "B".into()], &["e1".into(), "e2".into()]);
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_sets_hash_differently() {
        let a = pattern_hash(&["A".into()], &[]);
        let b = pattern_hash(&["B".into()], &[]);
        assert_ne!(a, b);
    }

    #[test]
    fn empty_set_is_stable() {
        let a = pattern_hash(&[], &[]);
        let b = pattern_hash(&[], &[]);
        assert_eq!(a, b);
    }
}
