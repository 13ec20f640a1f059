//! # Submissions and Transition Events
//!
//! A [`Submission`] is what a client hands the executor. A
//! [`TransitionEvent`] is what the executor emits on acceptance: enough for
//! any observer to replay the aggregate and rebuild the map without access
//! to the executor's state.

use pret_core::{Digest, EntityKey, EntityRecord};
use pret_crypto::MapWitness;
use serde::{Deserialize, Serialize};

use crate::error::ReplayError;

/// One proof-gated update request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission<P> {
    /// Proof whose public output drives the update.
    pub proof: P,
    /// The record the client expects to be committed. Only its
    /// jurisdiction is taken as input; every other field is recomputed.
    pub claimed: EntityRecord,
    /// The currently committed record, disclosed so its counters can be
    /// carried forward. Required exactly when the witness shows an
    /// occupied slot.
    pub previous: Option<EntityRecord>,
    /// Witness for the entity's slot against the root the client observed.
    pub witness: MapWitness,
}

/// Record of one accepted transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEvent {
    /// 1-based position in the event log.
    pub sequence: u64,
    pub entity_key: EntityKey,
    /// The committed record.
    pub record: EntityRecord,
    /// `record.record_hash()`, the value written into the map.
    pub record_hash: Digest,
    pub previous_root: Digest,
    pub new_root: Digest,
    pub is_new_entity: bool,
    /// Compliance flag of the record this one replaced; `None` for a new entity.
    pub was_compliant: Option<bool>,
    /// Registry version in force when the event was accepted.
    pub registry_version: u64,
}

impl TransitionEvent {
    /// Check the event is self-consistent: the hash matches the record,
    /// the key matches the record's identity, and the new-entity flag
    /// agrees with `was_compliant`.
    pub fn check_consistency(&self) -> Result<(), ReplayError> {
        let malformed = |reason: &str| ReplayError::MalformedEvent {
            sequence: self.sequence,
            reason: reason.to_string(),
        };
        if self.record.record_hash() != self.record_hash {
            return Err(malformed("record hash does not match record"));
        }
        if self.record.entity_key() != self.entity_key {
            return Err(malformed("entity key does not match record identity"));
        }
        if self.is_new_entity != self.was_compliant.is_none() {
            return Err(malformed("new-entity flag disagrees with prior state"));
        }
        if self.is_new_entity && self.record.total_verifications != 1 {
            return Err(malformed("new entity must have exactly one verification"));
        }
        self.record
            .validate()
            .map_err(|e| malformed(&e.to_string()))?;
        Ok(())
    }
}
