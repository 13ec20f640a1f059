//! # Map Errors

use pret_core::{Digest, EntityKey};
use thiserror::Error;

/// Failure to verify or apply a witness.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MapError {
    /// The witness does not reconstruct the expected root. The caller's
    /// view of the map is stale.
    #[error("root mismatch: expected {expected}, witness yields {computed}")]
    RootMismatch {
        /// The root the update was checked against.
        expected: Digest,
        /// The root recomputed from the witness.
        computed: Digest,
    },

    /// The witness was built for a different key.
    #[error("witness is for {witness_key}, not {key}")]
    KeyMismatch {
        /// Key the witness was constructed for.
        witness_key: EntityKey,
        /// Key the caller is updating.
        key: EntityKey,
    },

    /// The witness is structurally invalid.
    #[error("malformed witness: {0}")]
    MalformedWitness(String),
}
