//! # Proof Capability Traits
//!
//! The executor is generic over [`ProofVerifier`]; it must never depend on
//! a specific proving system's internals. Verification is delegated in
//! full: no signature or transcript re-check happens outside this trait.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use crate::statement::{ComplianceStatement, PublicOutput};

/// Error during proof generation.
#[derive(Error, Debug)]
pub enum ProofError {
    /// The statement is invalid or incomplete.
    #[error("invalid statement: {0}")]
    InvalidInputs(String),
    /// Proof generation failed internally.
    #[error("proof generation failed: {0}")]
    GenerationFailed(String),
}

/// Error during proof verification.
#[derive(Error, Debug)]
pub enum VerifyError {
    /// The proof is structurally malformed.
    #[error("malformed proof: {0}")]
    MalformedProof(String),
    /// The proof is cryptographically invalid.
    #[error("proof verification failed: {0}")]
    VerificationFailed(String),
}

/// Verifies compliance proofs and extracts their public output.
pub trait ProofVerifier: Send + Sync {
    /// The proof artifact accepted by this verifier.
    type Proof: Serialize + DeserializeOwned + Clone + std::fmt::Debug + Send + Sync;

    /// Verify `proof` and return its public output.
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::MalformedProof`] if the proof cannot be
    /// decoded, [`VerifyError::VerificationFailed`] if it does not verify.
    fn verify(&self, proof: &Self::Proof) -> Result<PublicOutput, VerifyError>;
}

/// Produces compliance proofs. Long-running in real backends (seconds to
/// minutes), which is why witnesses must be built after proving.
pub trait ComplianceProver: Send + Sync {
    /// The proof artifact produced.
    type Proof;

    /// Prove `statement`.
    fn prove(&self, statement: &ComplianceStatement) -> Result<Self::Proof, ProofError>;
}
