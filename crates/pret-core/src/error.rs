//! # Error Types
//!
//! Errors raised while constructing or validating core values. Registry
//! transition failures live in `pret-state`; these are the lower-level
//! causes that can surface through them.

use thiserror::Error;

/// Top-level error type for core value construction.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// A digest string was not 64 lowercase/uppercase hex characters.
    #[error("invalid digest encoding: {0}")]
    InvalidDigest(String),

    /// An identifier (LEI, legal name, jurisdiction) failed validation.
    #[error("invalid {kind}: {reason}")]
    InvalidIdentifier {
        /// Which identifier was rejected.
        kind: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// A record violates one of its internal invariants.
    #[error("record invariant violated: {0}")]
    RecordInvariant(String),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
