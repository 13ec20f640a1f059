//! # Mock Proof System
//!
//! A deterministic, transparent proof system for development and testing.
//!
//! ```text
//! proof_hex = SHA256("pret.mock-proof.v1" || key || JCS(public_output))
//! ```
//!
//! `verify()` recomputes the tag and checks equality. Anyone holding the
//! key can forge proofs, and the public output travels in the clear.
//!
//! **NOT PRIVATE, NOT SOUND.** Use only where the proving backend is out
//! of scope (tests, local simulation).

use pret_core::{tagged_sha256, Digest};
use serde::{Deserialize, Serialize};

use crate::statement::{ComplianceStatement, PublicOutput};
use crate::traits::{ComplianceProver, ProofError, ProofVerifier, VerifyError};

const MOCK_PROOF_TAG: &[u8] = b"pret.mock-proof.v1";
const MOCK_KEY_TAG: &[u8] = b"pret.mock-key.v1";

/// A mock proof: the public output plus a keyed binding tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockProof {
    pub public_output: PublicOutput,
    /// Hex-encoded binding tag.
    pub proof_hex: String,
}

/// Deterministic prover and verifier sharing one key.
#[derive(Debug, Clone)]
pub struct MockProofSystem {
    key: Digest,
}

impl MockProofSystem {
    /// Derive the binding key from a seed string.
    pub fn new(seed: &str) -> Self {
        Self {
            key: tagged_sha256(MOCK_KEY_TAG, &[seed.as_bytes()]),
        }
    }

    fn tag(&self, output: &PublicOutput) -> Result<Digest, String> {
        let canonical = output.canonical_bytes().map_err(|e| e.to_string())?;
        Ok(tagged_sha256(
            MOCK_PROOF_TAG,
            &[self.key.as_bytes(), canonical.as_bytes()],
        ))
    }

    /// Prove a public output directly, skipping statement hashing.
    pub fn prove_output(&self, output: PublicOutput) -> Result<MockProof, ProofError> {
        let tag = self.tag(&output).map_err(ProofError::GenerationFailed)?;
        Ok(MockProof {
            public_output: output,
            proof_hex: tag.to_hex(),
        })
    }
}

impl Default for MockProofSystem {
    fn default() -> Self {
        Self::new("pret-mock-verifier")
    }
}

impl ComplianceProver for MockProofSystem {
    type Proof = MockProof;

    fn prove(&self, statement: &ComplianceStatement) -> Result<MockProof, ProofError> {
        let output = statement
            .public_output()
            .map_err(|e| ProofError::InvalidInputs(e.to_string()))?;
        self.prove_output(output)
    }
}

impl ProofVerifier for MockProofSystem {
    type Proof = MockProof;

    fn verify(&self, proof: &MockProof) -> Result<PublicOutput, VerifyError> {
        let presented = Digest::from_hex(&proof.proof_hex)
            .map_err(|e| VerifyError::MalformedProof(e.to_string()))?;
        let expected = self
            .tag(&proof.public_output)
            .map_err(VerifyError::MalformedProof)?;
        if presented != expected {
            return Err(VerifyError::VerificationFailed(
                "binding tag does not match public output".to_string(),
            ));
        }
        Ok(proof.public_output)
    }
}
