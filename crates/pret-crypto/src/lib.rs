//! # pret-crypto — Authenticated Map
//!
//! Provides the key-addressed commitment structure behind the registry:
//!
//! - **Hashing** (`hashing.rs`): domain-separated SHA-256 for leaves and
//!   internal nodes, plus the precomputed empty-subtree ladder.
//! - **Sparse Merkle map** (`smt.rs`): a depth-256 tree addressed by the
//!   bits of an [`EntityKey`](pret_core::EntityKey). Every key has a slot,
//!   so both membership and non-membership are provable with the same
//!   witness shape.
//!
//! The [`AuthenticatedMap`] trait is the seam: any structure that can hand
//! out witnesses and apply witness-checked updates can replace
//! [`SparseMerkleMap`].
//!
//! ## Crate Policy
//!
//! - Depends only on `pret-core` internally.
//! - No mocking of hashing in tests; all roots are real SHA-256.

pub mod error;
pub mod hashing;
pub mod smt;

pub use error::MapError;
pub use hashing::{empty_hash, leaf_hash, node_hash};
pub use smt::{verify_and_update, AuthenticatedMap, MapWitness, SparseMerkleMap, TREE_DEPTH};
