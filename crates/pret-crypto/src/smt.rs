//! # Sparse Merkle Map
//!
//! A depth-256 sparse Merkle tree committing to a partial function
//! `EntityKey -> Digest`. Bit `i` of the key (MSB-first) selects the child
//! at depth `i`: `0` = left, `1` = right. Every possible key has exactly
//! one leaf slot, so each key maps to at most one value by construction.
//!
//! ## Witnesses
//!
//! A [`MapWitness`] carries the key, the current leaf value (`None` for an
//! empty slot) and the 256 sibling hashes from leaf to root. The same
//! shape proves membership and non-membership.
//!
//! ## Update protocol
//!
//! [`verify_and_update`] recomputes the root from the witness with the old
//! leaf, fails closed with [`MapError::RootMismatch`] unless it equals the
//! expected old root, and then recomputes the root with the new leaf. The
//! siblings are unchanged by a single-leaf update, so the same witness
//! yields the new root.

use std::collections::BTreeMap;

use pret_core::{Digest, EntityKey};
use serde::{Deserialize, Serialize};

use crate::error::MapError;
use crate::hashing::{empty_hash, leaf_hash, node_hash};

/// Depth of the tree: one level per key bit.
pub const TREE_DEPTH: usize = Digest::BITS;

/// Evidence of a key's current value (or absence) under some root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapWitness {
    /// The key this witness speaks about.
    pub key: EntityKey,
    /// Current leaf value; `None` proves non-membership.
    pub leaf: Option<Digest>,
    /// Sibling hashes ordered leaf-to-root. Always [`TREE_DEPTH`] long.
    pub siblings: Vec<Digest>,
}

impl MapWitness {
    /// Whether this witness proves the key is present.
    pub fn is_membership(&self) -> bool {
        self.leaf.is_some()
    }

    /// The root this witness was built against.
    pub fn compute_root(&self) -> Result<Digest, MapError> {
        self.compute_root_with(self.leaf.as_ref())
    }

    /// The root obtained by placing `leaf` in this witness's slot.
    pub fn compute_root_with(&self, leaf: Option<&Digest>) -> Result<Digest, MapError> {
        if self.siblings.len() != TREE_DEPTH {
            return Err(MapError::MalformedWitness(format!(
                "expected {TREE_DEPTH} siblings, got {}",
                self.siblings.len()
            )));
        }
        let mut cur = match leaf {
            Some(value) => leaf_hash(&self.key, value),
            None => empty_hash(0),
        };
        for (height, sibling) in self.siblings.iter().enumerate() {
            let depth = TREE_DEPTH - 1 - height;
            cur = if self.key.digest().bit(depth) {
                node_hash(sibling, &cur)
            } else {
                node_hash(&cur, sibling)
            };
        }
        Ok(cur)
    }

    /// Whether this witness reconstructs `root`.
    pub fn verify(&self, root: &Digest) -> bool {
        matches!(self.compute_root(), Ok(r) if r == *root)
    }
}

/// Check `witness` against `old_root` and return the root after writing
/// `new_value` at `key`.
///
/// # Errors
///
/// - [`MapError::KeyMismatch`] if the witness was built for another key.
/// - [`MapError::MalformedWitness`] if the sibling path has the wrong length.
/// - [`MapError::RootMismatch`] if the witness was not built against `old_root`.
pub fn verify_and_update(
    witness: &MapWitness,
    key: &EntityKey,
    old_root: &Digest,
    new_value: &Digest,
) -> Result<Digest, MapError> {
    if witness.key != *key {
        return Err(MapError::KeyMismatch {
            witness_key: witness.key,
            key: *key,
        });
    }
    let computed = witness.compute_root()?;
    if computed != *old_root {
        return Err(MapError::RootMismatch {
            expected: *old_root,
            computed,
        });
    }
    witness.compute_root_with(Some(new_value))
}

/// A key-addressed commitment structure.
///
/// Implementations must keep `root()` equal to the root recomputable from
/// their full leaf set, and must reject `put` with a witness that was not
/// built against the current root.
pub trait AuthenticatedMap {
    /// The current root.
    fn root(&self) -> Digest;

    /// The current value at `key` and a witness for it.
    fn get(&self, key: &EntityKey) -> (Option<Digest>, MapWitness);

    /// Write `value` at `key`, checking `witness` against the current root.
    fn put(
        &mut self,
        key: EntityKey,
        value: Digest,
        witness: &MapWitness,
    ) -> Result<Digest, MapError>;

    /// Number of occupied leaves.
    fn len(&self) -> usize;

    /// Whether no leaf is occupied.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory sparse Merkle map holding every occupied leaf.
#[derive(Debug, Clone)]
pub struct SparseMerkleMap {
    leaves: BTreeMap<EntityKey, Digest>,
    root: Digest,
}

impl SparseMerkleMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self {
            leaves: BTreeMap::new(),
            root: empty_hash(TREE_DEPTH),
        }
    }

    /// Root of a map with no occupied leaves.
    pub fn empty_root() -> Digest {
        empty_hash(TREE_DEPTH)
    }

    /// Build a map from a full leaf set.
    pub fn from_leaves(leaves: impl IntoIterator<Item = (EntityKey, Digest)>) -> Self {
        let leaves: BTreeMap<EntityKey, Digest> = leaves.into_iter().collect();
        let entries: Vec<(EntityKey, Digest)> = leaves.iter().map(|(k, v)| (*k, *v)).collect();
        let root = subtree_root(&entries, 0);
        Self { leaves, root }
    }

    /// The value stored at `key`, if any.
    pub fn value(&self, key: &EntityKey) -> Option<&Digest> {
        self.leaves.get(key)
    }

    /// Build a witness for `key` against the current root.
    pub fn witness(&self, key: &EntityKey) -> MapWitness {
        let entries: Vec<(EntityKey, Digest)> =
            self.leaves.iter().map(|(k, v)| (*k, *v)).collect();
        let mut siblings = Vec::with_capacity(TREE_DEPTH);
        let mut slice = &entries[..];
        for depth in 0..TREE_DEPTH {
            let split = slice.partition_point(|(k, _)| !k.digest().bit(depth));
            let (left, right) = slice.split_at(split);
            if key.digest().bit(depth) {
                siblings.push(subtree_root(left, depth + 1));
                slice = right;
            } else {
                siblings.push(subtree_root(right, depth + 1));
                slice = left;
            }
        }
        siblings.reverse();
        MapWitness {
            key: *key,
            leaf: self.leaves.get(key).copied(),
            siblings,
        }
    }

    /// Write `value` at `key`, returning the witness that was valid before
    /// the write.
    pub fn insert(&mut self, key: EntityKey, value: Digest) -> Result<MapWitness, MapError> {
        let witness = self.witness(&key);
        self.put(key, value, &witness)?;
        Ok(witness)
    }

    /// Recompute the root from scratch over every leaf.
    pub fn recompute_root(&self) -> Digest {
        let entries: Vec<(EntityKey, Digest)> =
            self.leaves.iter().map(|(k, v)| (*k, *v)).collect();
        subtree_root(&entries, 0)
    }

    /// Iterate occupied leaves in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&EntityKey, &Digest)> {
        self.leaves.iter()
    }
}

impl Default for SparseMerkleMap {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthenticatedMap for SparseMerkleMap {
    fn root(&self) -> Digest {
        self.root
    }

    fn get(&self, key: &EntityKey) -> (Option<Digest>, MapWitness) {
        (self.leaves.get(key).copied(), self.witness(key))
    }

    fn put(
        &mut self,
        key: EntityKey,
        value: Digest,
        witness: &MapWitness,
    ) -> Result<Digest, MapError> {
        let new_root = verify_and_update(witness, &key, &self.root, &value)?;
        self.leaves.insert(key, value);
        self.root = new_root;
        Ok(new_root)
    }

    fn len(&self) -> usize {
        self.leaves.len()
    }
}

/// Root of the subtree at `depth` holding `entries`.
///
/// `entries` must be sorted by key and share the first `depth` key bits.
/// Byte-order sorting of keys is MSB-first bit order, so each level's
/// left/right split is a single partition point.
fn subtree_root(entries: &[(EntityKey, Digest)], depth: usize) -> Digest {
    let height = TREE_DEPTH - depth;
    match entries {
        [] => empty_hash(height),
        [(key, value)] if depth == TREE_DEPTH => leaf_hash(key, value),
        _ => {
            let split = entries.partition_point(|(k, _)| !k.digest().bit(depth));
            let left = subtree_root(&entries[..split], depth + 1);
            let right = subtree_root(&entries[split..], depth + 1);
            node_hash(&left, &right)
        }
    }
}
