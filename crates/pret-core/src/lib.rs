//! # pret-core — Foundational Types for the Compliance Registry
//!
//! Every other crate in the workspace depends on `pret-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identity hashes.** `LeiHash`, `LegalNameHash`,
//!    `JurisdictionHash` and `EntityKey` cannot be confused with each other
//!    or with an arbitrary [`Digest`].
//!
//! 2. **One record hash.** [`EntityRecord::record_hash`] is the only way a
//!    record becomes a leaf value. Its 13-field encoding order is a wire
//!    contract shared with every other implementation of the registry.
//!
//! 3. **`CanonicalBytes` for JSON digests.** Anything hashed from a serde
//!    value (proof public outputs, statements) goes through
//!    [`CanonicalBytes::new`].
//!
//! ## Crate Policy
//!
//! - No dependencies on other `pret-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod record;

pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, tagged_sha256, Digest};
pub use error::{CanonicalizationError, CoreError};
pub use identity::{EntityIdentity, EntityKey, JurisdictionHash, LegalNameHash, LeiHash};
pub use record::{EntityRecord, VerificationOutcome, MAX_COMPLIANCE_SCORE};
