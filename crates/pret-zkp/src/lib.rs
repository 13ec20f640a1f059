//! # pret-zkp — Compliance Proof Capability
//!
//! The registry never looks inside a proof. It depends only on:
//!
//! - [`ProofVerifier`] (`traits.rs`): verify a proof and hand back its
//!   [`PublicOutput`], or fail.
//! - [`PublicOutput`] (`statement.rs`): the fixed public-output schema
//!   `{isCompliant, complianceScore, verificationTimestamp, leiHash,
//!   legalNameHash}`.
//!
//! [`ComplianceProver`] is the client-side counterpart used by the
//! submission pipeline.
//!
//! ## Mock backend
//!
//! `MockProofSystem` (feature `mock`, on by default) binds a public output
//! to a keyed SHA-256 tag. It is deterministic and transparent: it proves
//! nothing about how compliance was computed and gives no zero-knowledge
//! guarantees. It exists so the state machine can be exercised end to end.

pub mod statement;
pub mod traits;

#[cfg(feature = "mock")]
pub mod mock;

#[cfg(feature = "mock")]
pub use mock::{MockProof, MockProofSystem};
pub use statement::{ComplianceStatement, PublicOutput};
pub use traits::{ComplianceProver, ProofError, ProofVerifier, VerifyError};
