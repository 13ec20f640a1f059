//! # Client Errors

use std::path::PathBuf;

use pret_core::Digest;
use pret_crypto::MapError;
use pret_state::{ReplayError, TransitionError};
use pret_zkp::ProofError;
use thiserror::Error;

/// The mirror no longer reproduces the confirmed state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MirrorError {
    /// An event does not chain from the mirror's root.
    #[error("mirror at {local} cannot absorb event {sequence} built on {expected}")]
    Diverged {
        /// Sequence of the event being absorbed.
        sequence: u64,
        /// `previous_root` of that event.
        expected: Digest,
        /// The mirror's root.
        local: Digest,
    },

    /// Absorbing an event produced a different root than the event reports.
    #[error("event {sequence} yields root {computed}, event reports {reported}")]
    RootDivergence {
        sequence: u64,
        computed: Digest,
        reported: Digest,
    },

    /// Events must be absorbed in sequence order without gaps.
    #[error("mirror expects event {expected}, got {found}")]
    OutOfOrder { expected: u64, found: u64 },

    /// A snapshot's records do not reproduce its claimed root.
    #[error("snapshot records yield {computed}, snapshot claims {claimed}")]
    SnapshotMismatch { claimed: Digest, computed: Digest },

    #[error(transparent)]
    Map(#[from] MapError),

    #[error(transparent)]
    Replay(#[from] ReplayError),
}

/// Failure reading or writing a JSON-lines event log.
#[derive(Error, Debug)]
pub enum EventLogError {
    #[error("event log {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("event log line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode event {sequence}: {source}")]
    Encode {
        sequence: u64,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure of one pipeline submission.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The statement could not be turned into a submission.
    #[error("invalid statement: {0}")]
    InvalidStatement(String),

    #[error("proof generation failed: {0}")]
    Proof(#[from] ProofError),

    /// The executor refused the submission for a reason resubmission
    /// cannot fix.
    #[error("submission rejected: {0}")]
    Rejected(TransitionError),

    /// Every attempt hit a stale-view error.
    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: TransitionError,
    },

    #[error("mirror error: {0}")]
    Mirror(#[from] MirrorError),
}

/// Invalid client configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}
