//! # Registry Aggregate
//!
//! The global counters, the current map root, and the admin flags. Every
//! counter is a fold over the accepted-event log:
//!
//! - `total_companies_tracked` counts events with `is_new_entity`.
//! - `total_verifications_global` counts events.
//! - `compliant_companies_count` follows the delta table below.
//! - `last_verification_time` is the largest accepted timestamp.
//! - `map_root` is the `new_root` of the last event.
//!
//! ## Compliant-count delta
//!
//! ```text
//! previous        new         delta
//! (none)          compliant     +1
//! (none)          failing        0
//! compliant       failing       -1
//! failing         compliant     +1
//! compliant       compliant      0
//! failing         failing        0
//! ```

use pret_core::Digest;
use pret_crypto::SparseMerkleMap;
use serde::{Deserialize, Serialize};

use crate::error::{ReplayError, TransitionError};
use crate::event::TransitionEvent;

/// Registry version assigned at genesis.
pub const GENESIS_VERSION: u64 = 1;

/// Change to `compliant_companies_count` caused by one transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplianceDelta {
    Increment,
    Decrement,
    Unchanged,
}

impl ComplianceDelta {
    /// Look up the delta for a transition from `previous` (`None` for a new
    /// entity) to `current`.
    pub fn between(previous: Option<bool>, current: bool) -> Self {
        match (previous, current) {
            (None, true) | (Some(false), true) => Self::Increment,
            (Some(true), false) => Self::Decrement,
            (None, false) | (Some(false), false) | (Some(true), true) => Self::Unchanged,
        }
    }

    /// Apply this delta to a count. `None` on underflow or overflow.
    pub fn apply(self, count: u64) -> Option<u64> {
        match self {
            Self::Increment => count.checked_add(1),
            Self::Decrement => count.checked_sub(1),
            Self::Unchanged => Some(count),
        }
    }
}

/// Registry-wide state held by the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryAggregate {
    pub total_companies_tracked: u64,
    pub compliant_companies_count: u64,
    pub total_verifications_global: u64,
    /// Largest timestamp of any accepted verification; 0 before the first.
    pub last_verification_time: u64,
    pub map_root: Digest,
    pub registry_version: u64,
    pub disabled: bool,
}

impl Default for RegistryAggregate {
    fn default() -> Self {
        Self::genesis()
    }
}

impl RegistryAggregate {
    /// The state before any transition: zero counters, empty-map root.
    pub fn genesis() -> Self {
        Self {
            total_companies_tracked: 0,
            compliant_companies_count: 0,
            total_verifications_global: 0,
            last_verification_time: 0,
            map_root: SparseMerkleMap::empty_root(),
            registry_version: GENESIS_VERSION,
            disabled: false,
        }
    }

    /// Sequence number the next accepted event will carry.
    pub fn next_sequence(&self) -> u64 {
        self.total_verifications_global.saturating_add(1)
    }

    /// Check the counter relations that must hold in every reachable state.
    pub fn check_invariants(&self) -> Result<(), TransitionError> {
        if self.compliant_companies_count > self.total_companies_tracked {
            return Err(TransitionError::InvariantViolation(format!(
                "compliant count {} exceeds tracked count {}",
                self.compliant_companies_count, self.total_companies_tracked
            )));
        }
        if self.total_companies_tracked > self.total_verifications_global {
            return Err(TransitionError::InvariantViolation(format!(
                "tracked count {} exceeds verification count {}",
                self.total_companies_tracked, self.total_verifications_global
            )));
        }
        Ok(())
    }

    /// Fold one accepted transition into the counters.
    ///
    /// `previous` is the compliance flag of the replaced record, or `None`
    /// if the entity is new.
    pub(crate) fn absorb_transition(
        &self,
        previous: Option<bool>,
        current: bool,
        timestamp: u64,
        new_root: Digest,
    ) -> Result<Self, TransitionError> {
        let overflow = |what: &str| TransitionError::InvariantViolation(format!("{what} overflow"));
        let mut next = self.clone();
        if previous.is_none() {
            next.total_companies_tracked = next
                .total_companies_tracked
                .checked_add(1)
                .ok_or_else(|| overflow("tracked count"))?;
        }
        next.compliant_companies_count = ComplianceDelta::between(previous, current)
            .apply(next.compliant_companies_count)
            .ok_or_else(|| overflow("compliant count"))?;
        next.total_verifications_global = next
            .total_verifications_global
            .checked_add(1)
            .ok_or_else(|| overflow("verification count"))?;
        next.last_verification_time = next.last_verification_time.max(timestamp);
        next.map_root = new_root;
        next.check_invariants()?;
        Ok(next)
    }

    /// Rebuild the counters and root by folding an event log from genesis.
    ///
    /// `registry_version` is taken from the last event; `disabled` is not
    /// recorded in the log and comes back `false`.
    pub fn replay<'a>(
        events: impl IntoIterator<Item = &'a TransitionEvent>,
    ) -> Result<Self, ReplayError> {
        let mut state = Self::genesis();
        for event in events {
            state = state.replay_one(event)?;
        }
        Ok(state)
    }

    /// Apply one logged event on top of this state.
    pub fn replay_one(&self, event: &TransitionEvent) -> Result<Self, ReplayError> {
        let expected = self.next_sequence();
        if event.sequence != expected {
            return Err(ReplayError::SequenceGap {
                expected,
                found: event.sequence,
            });
        }
        if event.previous_root != self.map_root {
            return Err(ReplayError::BrokenChain {
                sequence: event.sequence,
            });
        }
        event.check_consistency()?;
        let mut next = self
            .absorb_transition(
                event.was_compliant,
                event.record.is_compliant,
                event.record.last_verification_time,
                event.new_root,
            )
            .map_err(|e| ReplayError::MalformedEvent {
                sequence: event.sequence,
                reason: e.to_string(),
            })?;
        next.registry_version = event.registry_version;
        Ok(next)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// For any sequence of (entity, outcome) updates, the compliant
        /// count equals the number of entities whose latest outcome passed.
        #[test]
        fn compliant_count_matches_latest_flags(
            updates in prop::collection::vec((0usize..8, any::<bool>()), 0..64)
        ) {
            let mut latest: [Option<bool>; 8] = [None; 8];
            let mut state = RegistryAggregate::genesis();
            for (i, (entity, passed)) in updates.iter().enumerate() {
                state = state
                    .absorb_transition(latest[*entity], *passed, i as u64, Digest::ZERO)
                    .unwrap();
                latest[*entity] = Some(*passed);
            }
            let tracked = latest.iter().filter(|f| f.is_some()).count() as u64;
            let compliant = latest.iter().filter(|f| **f == Some(true)).count() as u64;
            prop_assert_eq!(state.total_companies_tracked, tracked);
            prop_assert_eq!(state.compliant_companies_count, compliant);
            prop_assert_eq!(state.total_verifications_global, updates.len() as u64);
            prop_assert!(state.check_invariants().is_ok());
        }
    }
}
