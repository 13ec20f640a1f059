//! # Public Output Schema
//!
//! [`PublicOutput`] is everything the registry learns from a proof.
//! [`ComplianceStatement`] is the prover-side input: plaintext identifiers
//! that are hashed into the public output and never reach the ledger.

use pret_core::{
    CanonicalBytes, CanonicalizationError, CoreError, EntityIdentity, EntityKey,
    JurisdictionHash, LegalNameHash, LeiHash, VerificationOutcome,
};
use serde::{Deserialize, Serialize};

/// Public output of a compliance proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicOutput {
    pub is_compliant: bool,
    /// Taken verbatim into the record; the registry never recomputes it.
    pub compliance_score: u8,
    /// Unix seconds at which the external data was verified.
    pub verification_timestamp: u64,
    pub lei_hash: LeiHash,
    pub legal_name_hash: LegalNameHash,
}

impl PublicOutput {
    /// The identity the proof speaks about.
    pub fn identity(&self) -> EntityIdentity {
        EntityIdentity {
            lei_hash: self.lei_hash,
            legal_name_hash: self.legal_name_hash,
        }
    }

    /// The map key derived from the proof's identity fields.
    pub fn entity_key(&self) -> EntityKey {
        self.identity().key()
    }

    /// The verification result carried by this output.
    pub fn outcome(&self) -> VerificationOutcome {
        VerificationOutcome {
            is_compliant: self.is_compliant,
            compliance_score: self.compliance_score,
            timestamp: self.verification_timestamp,
        }
    }

    /// JCS bytes of this output, for binding into a proof.
    pub fn canonical_bytes(&self) -> Result<CanonicalBytes, CanonicalizationError> {
        CanonicalBytes::new(self)
    }
}

/// Prover input for one compliance check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceStatement {
    /// ISO 17442 Legal Entity Identifier.
    pub lei: String,
    pub legal_name: String,
    pub jurisdiction: String,
    pub is_compliant: bool,
    pub compliance_score: u8,
    pub verification_timestamp: u64,
}

impl ComplianceStatement {
    /// Hash the statement's identifiers.
    pub fn identity(&self) -> Result<EntityIdentity, CoreError> {
        EntityIdentity::from_plaintext(&self.lei, &self.legal_name)
    }

    /// Hash the statement's jurisdiction.
    pub fn jurisdiction_hash(&self) -> Result<JurisdictionHash, CoreError> {
        JurisdictionHash::from_code(&self.jurisdiction)
    }

    /// The public output a proof of this statement exposes.
    pub fn public_output(&self) -> Result<PublicOutput, CoreError> {
        let identity = self.identity()?;
        Ok(PublicOutput {
            is_compliant: self.is_compliant,
            compliance_score: self.compliance_score,
            verification_timestamp: self.verification_timestamp,
            lei_hash: identity.lei_hash,
            legal_name_hash: identity.legal_name_hash,
        })
    }
}
