//! # Entity Compliance Record
//!
//! The canonical per-entity compliance snapshot. A record is immutable per
//! version: every accepted verification produces a new record from the
//! previous one via [`EntityRecord::next_verification`].
//!
//! ## Record Hash (wire format)
//!
//! ```text
//! recordHash = SHA256("pret.entity-record.v1"
//!     || leiHash (32) || legalNameHash (32) || jurisdictionHash (32)
//!     || isCompliant (1: 0x00/0x01) || complianceScore (1)
//!     || totalVerifications (8) || passedVerifications (8)
//!     || failedVerifications (8) || consecutiveFailures (8)
//!     || firstVerificationTime (8) || lastVerificationTime (8)
//!     || lastPassTime (8) || lastFailTime (8))
//! ```
//!
//! Integers are big-endian u64. An absent pass/fail time encodes as 0.
//! Two implementations that disagree on this order produce different
//! roots for the same registry.

use serde::{Deserialize, Serialize};

use crate::digest::{tagged_sha256, Digest};
use crate::error::CoreError;
use crate::identity::{EntityIdentity, EntityKey, JurisdictionHash, LegalNameHash, LeiHash};

const RECORD_TAG: &[u8] = b"pret.entity-record.v1";

/// Upper bound of `complianceScore`.
pub const MAX_COMPLIANCE_SCORE: u8 = 100;

/// The result of one verified compliance check, as taken from a proof's
/// public output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    /// Whether the entity passed.
    pub is_compliant: bool,
    /// Score in `0..=100`, taken verbatim from the proof.
    pub compliance_score: u8,
    /// Unix seconds at which the underlying data was verified.
    pub timestamp: u64,
}

/// Per-entity compliance snapshot. Thirteen fields, in hash order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub lei_hash: LeiHash,
    pub legal_name_hash: LegalNameHash,
    pub jurisdiction_hash: JurisdictionHash,
    pub is_compliant: bool,
    pub compliance_score: u8,
    pub total_verifications: u64,
    pub passed_verifications: u64,
    pub failed_verifications: u64,
    /// Reset to 0 by a passing verification, incremented by a failing one.
    pub consecutive_failures: u64,
    pub first_verification_time: u64,
    pub last_verification_time: u64,
    pub last_pass_time: Option<u64>,
    pub last_fail_time: Option<u64>,
}

impl EntityRecord {
    /// Number of fields committed by [`EntityRecord::record_hash`].
    pub const FIELD_COUNT: usize = 13;

    /// Length of [`EntityRecord::encode_fields`] output.
    pub const ENCODED_LEN: usize = 32 * 3 + 1 + 1 + 8 * 8;

    /// Create the record for an entity's first accepted verification.
    pub fn first_verification(
        identity: EntityIdentity,
        jurisdiction_hash: JurisdictionHash,
        outcome: VerificationOutcome,
    ) -> Self {
        let passed = outcome.is_compliant;
        Self {
            lei_hash: identity.lei_hash,
            legal_name_hash: identity.legal_name_hash,
            jurisdiction_hash,
            is_compliant: passed,
            compliance_score: outcome.compliance_score,
            total_verifications: 1,
            passed_verifications: u64::from(passed),
            failed_verifications: u64::from(!passed),
            consecutive_failures: u64::from(!passed),
            first_verification_time: outcome.timestamp,
            last_verification_time: outcome.timestamp,
            last_pass_time: passed.then_some(outcome.timestamp),
            last_fail_time: (!passed).then_some(outcome.timestamp),
        }
    }

    /// Produce the successor record after one more accepted verification.
    ///
    /// Identity fields and `first_verification_time` carry over. Ordering
    /// of `outcome.timestamp` against `last_verification_time` is the
    /// caller's responsibility.
    pub fn next_verification(&self, outcome: VerificationOutcome) -> Self {
        let mut next = self.clone();
        next.is_compliant = outcome.is_compliant;
        next.compliance_score = outcome.compliance_score;
        next.total_verifications = self.total_verifications.saturating_add(1);
        next.last_verification_time = outcome.timestamp;
        if outcome.is_compliant {
            next.passed_verifications = self.passed_verifications.saturating_add(1);
            next.consecutive_failures = 0;
            next.last_pass_time = Some(outcome.timestamp);
        } else {
            next.failed_verifications = self.failed_verifications.saturating_add(1);
            next.consecutive_failures = self.consecutive_failures.saturating_add(1);
            next.last_fail_time = Some(outcome.timestamp);
        }
        next
    }

    /// The identity pair this record belongs to.
    pub fn identity(&self) -> EntityIdentity {
        EntityIdentity {
            lei_hash: self.lei_hash,
            legal_name_hash: self.legal_name_hash,
        }
    }

    /// The map key this record is stored under.
    pub fn entity_key(&self) -> EntityKey {
        EntityKey::derive(&self.lei_hash, &self.legal_name_hash)
    }

    /// Fixed-order binary encoding of all thirteen fields.
    pub fn encode_fields(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::ENCODED_LEN);
        out.extend_from_slice(self.lei_hash.digest().as_bytes());
        out.extend_from_slice(self.legal_name_hash.digest().as_bytes());
        out.extend_from_slice(self.jurisdiction_hash.digest().as_bytes());
        out.push(u8::from(self.is_compliant));
        out.push(self.compliance_score);
        for v in [
            self.total_verifications,
            self.passed_verifications,
            self.failed_verifications,
            self.consecutive_failures,
            self.first_verification_time,
            self.last_verification_time,
            self.last_pass_time.unwrap_or(0),
            self.last_fail_time.unwrap_or(0),
        ] {
            out.extend_from_slice(&v.to_be_bytes());
        }
        out
    }

    /// The leaf value committed to the authenticated map.
    pub fn record_hash(&self) -> Digest {
        tagged_sha256(RECORD_TAG, &[&self.encode_fields()])
    }

    /// Check the record's internal invariants.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.compliance_score > MAX_COMPLIANCE_SCORE {
            return Err(CoreError::RecordInvariant(format!(
                "compliance score {} exceeds {MAX_COMPLIANCE_SCORE}",
                self.compliance_score
            )));
        }
        if self.total_verifications == 0 {
            return Err(CoreError::RecordInvariant(
                "record has no verifications".to_string(),
            ));
        }
        if self.passed_verifications.checked_add(self.failed_verifications)
            != Some(self.total_verifications)
        {
            return Err(CoreError::RecordInvariant(format!(
                "passed ({}) + failed ({}) != total ({})",
                self.passed_verifications, self.failed_verifications, self.total_verifications
            )));
        }
        if self.consecutive_failures > self.failed_verifications {
            return Err(CoreError::RecordInvariant(
                "consecutive failures exceed total failures".to_string(),
            ));
        }
        if self.is_compliant != (self.consecutive_failures == 0) {
            return Err(CoreError::RecordInvariant(
                "latest status disagrees with consecutive failure count".to_string(),
            ));
        }
        if self.first_verification_time > self.last_verification_time {
            return Err(CoreError::RecordInvariant(
                "first verification after last verification".to_string(),
            ));
        }
        if self.last_pass_time.is_some() != (self.passed_verifications > 0)
            || self.last_fail_time.is_some() != (self.failed_verifications > 0)
        {
            return Err(CoreError::RecordInvariant(
                "pass/fail timestamps disagree with counters".to_string(),
            ));
        }
        Ok(())
    }
}
