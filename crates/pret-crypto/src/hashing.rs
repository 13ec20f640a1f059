//! # Node Hashing
//!
//! Domain-separated SHA-256, following the same prefix convention as
//! RFC 6962 transparency logs:
//!
//! - Leaf: `SHA256(0x00 || key || value)`.
//! - Node: `SHA256(0x01 || left || right)`.
//!
//! Binding the key into the leaf hash means a leaf cannot be moved to a
//! different slot without changing the root.
//!
//! An absent leaf is the all-zero digest. An empty subtree of height
//! `h + 1` is `node(empty(h), empty(h))`; the ladder is computed once.

use std::sync::OnceLock;

use pret_core::{tagged_sha256, Digest, EntityKey};

use crate::smt::TREE_DEPTH;

const LEAF_PREFIX: [u8; 1] = [0x00];
const NODE_PREFIX: [u8; 1] = [0x01];

/// Hash of an occupied leaf.
pub fn leaf_hash(key: &EntityKey, value: &Digest) -> Digest {
    tagged_sha256(&LEAF_PREFIX, &[key.digest().as_bytes(), value.as_bytes()])
}

/// Hash of an internal node from its two children.
pub fn node_hash(left: &Digest, right: &Digest) -> Digest {
    tagged_sha256(&NODE_PREFIX, &[left.as_bytes(), right.as_bytes()])
}

fn empty_ladder() -> &'static [Digest] {
    static LADDER: OnceLock<Vec<Digest>> = OnceLock::new();
    LADDER.get_or_init(|| {
        let mut ladder = Vec::with_capacity(TREE_DEPTH + 1);
        ladder.push(Digest::ZERO);
        for h in 0..TREE_DEPTH {
            let below = ladder[h];
            ladder.push(node_hash(&below, &below));
        }
        ladder
    })
}

/// Root of an empty subtree of the given height (0 = leaf).
///
/// Heights above [`TREE_DEPTH`] are clamped to the root height.
pub fn empty_hash(height: usize) -> Digest {
    empty_ladder()[height.min(TREE_DEPTH)]
}
