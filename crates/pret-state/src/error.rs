//! # Transition Errors
//!
//! Every rejection leaves the registry untouched. [`TransitionError::kind`]
//! gives a stable, payload-free tag for metrics labels and for deciding
//! whether a resubmission against a fresh mirror can succeed.

use pret_crypto::MapError;
use pret_zkp::VerifyError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons the executor refuses a submission.
#[derive(Error, Debug)]
pub enum TransitionError {
    /// The registry has been administratively disabled.
    #[error("registry is disabled")]
    ContractDisabled,

    /// The proof did not verify under the configured verifier.
    #[error("proof rejected: {0}")]
    ProofInvalid(#[from] VerifyError),

    /// The submitted record or disclosed previous record names a different
    /// entity than the proof.
    #[error("identity mismatch: {0}")]
    IdentityMismatch(String),

    /// The witness was built against a root other than the current one.
    #[error("stale root: {0}")]
    RootMismatch(MapError),

    /// The witness, the disclosed previous record, and the proof do not
    /// describe the same slot.
    #[error("inconsistent witness: {0}")]
    WitnessInconsistency(String),

    /// The proof's timestamp precedes the entity's last accepted verification.
    #[error("verification at {submitted} precedes last verification at {last}")]
    StaleTimestamp {
        /// Timestamp carried by the proof.
        submitted: u64,
        /// `last_verification_time` of the committed record.
        last: u64,
    },

    /// The proof's score is above 100.
    #[error("compliance score {0} is outside 0..=100")]
    ScoreOutOfRange(u8),

    /// Applying the transition would break a record or aggregate invariant.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl From<MapError> for TransitionError {
    fn from(err: MapError) -> Self {
        match err {
            MapError::RootMismatch { .. } => Self::RootMismatch(err),
            MapError::KeyMismatch { .. } | MapError::MalformedWitness(_) => {
                Self::WitnessInconsistency(err.to_string())
            }
        }
    }
}

/// Payload-free discriminant of [`TransitionError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionErrorKind {
    ContractDisabled,
    ProofInvalid,
    IdentityMismatch,
    RootMismatch,
    WitnessInconsistency,
    StaleTimestamp,
    ScoreOutOfRange,
    InvariantViolation,
}

impl TransitionErrorKind {
    /// Stable label, used as the `reason` metric label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ContractDisabled => "contract_disabled",
            Self::ProofInvalid => "proof_invalid",
            Self::IdentityMismatch => "identity_mismatch",
            Self::RootMismatch => "root_mismatch",
            Self::WitnessInconsistency => "witness_inconsistency",
            Self::StaleTimestamp => "stale_timestamp",
            Self::ScoreOutOfRange => "score_out_of_range",
            Self::InvariantViolation => "invariant_violation",
        }
    }
}

impl std::fmt::Display for TransitionErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TransitionError {
    /// The discriminant of this error.
    pub fn kind(&self) -> TransitionErrorKind {
        match self {
            Self::ContractDisabled => TransitionErrorKind::ContractDisabled,
            Self::ProofInvalid(_) => TransitionErrorKind::ProofInvalid,
            Self::IdentityMismatch(_) => TransitionErrorKind::IdentityMismatch,
            Self::RootMismatch(_) => TransitionErrorKind::RootMismatch,
            Self::WitnessInconsistency(_) => TransitionErrorKind::WitnessInconsistency,
            Self::StaleTimestamp { .. } => TransitionErrorKind::StaleTimestamp,
            Self::ScoreOutOfRange(_) => TransitionErrorKind::ScoreOutOfRange,
            Self::InvariantViolation(_) => TransitionErrorKind::InvariantViolation,
        }
    }

    /// Whether rebuilding the witness from a refreshed mirror may succeed.
    ///
    /// Only stale-view failures qualify. A bad proof or a stale timestamp
    /// fails the same way however often it is resubmitted.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            TransitionErrorKind::RootMismatch | TransitionErrorKind::WitnessInconsistency
        )
    }
}

/// Failure to rebuild an aggregate from an event sequence.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplayError {
    /// Sequence numbers must start at 1 and increase by exactly 1.
    #[error("expected event sequence {expected}, found {found}")]
    SequenceGap {
        /// The next sequence number the log should contain.
        expected: u64,
        /// The sequence number actually found.
        found: u64,
    },

    /// An event's `previous_root` does not chain from the prior event.
    #[error("event {sequence} does not chain from the preceding root")]
    BrokenChain {
        /// Sequence number of the offending event.
        sequence: u64,
    },

    /// An event is internally inconsistent.
    #[error("event {sequence} is malformed: {reason}")]
    MalformedEvent {
        /// Sequence number of the offending event.
        sequence: u64,
        /// What was wrong with it.
        reason: String,
    },
}
