//! # Mirror Registry
//!
//! A client-held replica of the full `EntityKey -> EntityRecord` mapping,
//! kept in step with the confirmed event log so it can produce witnesses
//! and previous-record disclosures for the next submission.
//!
//! The mirror is a fold over accepted events. It never decides anything on
//! its own: [`MirrorRegistry::absorb`] refuses any event that does not chain
//! from the mirror's root or that would produce a root other than the one
//! the event reports, and the caller resynchronizes from the log or from a
//! [`MirrorSnapshot`].

use std::collections::BTreeMap;

use pret_core::{CoreError, Digest, EntityKey, EntityRecord};
use pret_crypto::{AuthenticatedMap, MapWitness, SparseMerkleMap};
use pret_state::{Submission, TransitionEvent};
use pret_zkp::ComplianceStatement;
use serde::{Deserialize, Serialize};

use crate::error::MirrorError;

/// Authoritative export of a mirror's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorSnapshot {
    /// Root the records must reproduce.
    pub root: Digest,
    /// Sequence number of the last event folded into `records`.
    pub last_sequence: u64,
    pub records: Vec<EntityRecord>,
}

/// Full plaintext replica of the registry map.
#[derive(Debug, Clone, Default)]
pub struct MirrorRegistry {
    map: SparseMerkleMap,
    records: BTreeMap<EntityKey, EntityRecord>,
    last_sequence: u64,
}

impl MirrorRegistry {
    /// An empty mirror, matching a registry at genesis.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a mirror by folding a complete event log from genesis.
    pub fn from_events<'a>(
        events: impl IntoIterator<Item = &'a TransitionEvent>,
    ) -> Result<Self, MirrorError> {
        let mut mirror = Self::new();
        mirror.absorb_all(events)?;
        Ok(mirror)
    }

    /// Replace this mirror's content with a rebuild from `events`.
    ///
    /// On error the mirror is left unchanged.
    pub fn rebuild_from_log<'a>(
        &mut self,
        events: impl IntoIterator<Item = &'a TransitionEvent>,
    ) -> Result<(), MirrorError> {
        let rebuilt = Self::from_events(events)?;
        tracing::info!(
            events = rebuilt.last_sequence,
            root = %rebuilt.root().short_hex(),
            "mirror rebuilt from event log"
        );
        *self = rebuilt;
        Ok(())
    }

    /// Load a snapshot, checking its records against its claimed root.
    pub fn bootstrap(snapshot: MirrorSnapshot) -> Result<Self, MirrorError> {
        let records: BTreeMap<EntityKey, EntityRecord> = snapshot
            .records
            .into_iter()
            .map(|r| (r.entity_key(), r))
            .collect();
        let map = SparseMerkleMap::from_leaves(
            records.iter().map(|(key, r)| (*key, r.record_hash())),
        );
        let computed = map.recompute_root();
        if computed != snapshot.root {
            return Err(MirrorError::SnapshotMismatch {
                claimed: snapshot.root,
                computed,
            });
        }
        Ok(Self {
            map,
            records,
            last_sequence: snapshot.last_sequence,
        })
    }

    /// Export the current content.
    pub fn snapshot(&self) -> MirrorSnapshot {
        MirrorSnapshot {
            root: self.root(),
            last_sequence: self.last_sequence,
            records: self.records.values().cloned().collect(),
        }
    }

    /// The mirror's map root.
    pub fn root(&self) -> Digest {
        self.map.root()
    }

    /// Sequence number of the last absorbed event; 0 at genesis.
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    /// Number of entities held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The plaintext record currently held for `key`.
    pub fn record(&self, key: &EntityKey) -> Option<&EntityRecord> {
        self.records.get(key)
    }

    /// All held records in key order.
    pub fn records(&self) -> impl Iterator<Item = &EntityRecord> {
        self.records.values()
    }

    /// Witness for `key` against the mirror's current root.
    pub fn witness(&self, key: &EntityKey) -> MapWitness {
        let witness = self.map.witness(key);
        tracing::debug!(
            entity = %key,
            member = witness.is_membership(),
            root = %self.root().short_hex(),
            "witness built"
        );
        witness
    }

    /// Assemble a submission for `statement` against the mirror's root.
    ///
    /// The claimed record is the successor of the held record, or a first
    /// record if none is held. It carries the statement's jurisdiction, so
    /// a jurisdiction change surfaces as a rejection rather than being
    /// silently dropped.
    pub fn submission_for<P>(
        &self,
        proof: P,
        statement: &ComplianceStatement,
    ) -> Result<Submission<P>, CoreError> {
        let identity = statement.identity()?;
        let jurisdiction_hash = statement.jurisdiction_hash()?;
        let key = identity.key();
        let outcome = pret_core::VerificationOutcome {
            is_compliant: statement.is_compliant,
            compliance_score: statement.compliance_score,
            timestamp: statement.verification_timestamp,
        };
        let previous = self.record(&key).cloned();
        let claimed = match &previous {
            Some(held) => EntityRecord {
                jurisdiction_hash,
                ..held.next_verification(outcome)
            },
            None => EntityRecord::first_verification(identity, jurisdiction_hash, outcome),
        };
        Ok(Submission {
            proof,
            claimed,
            previous,
            witness: self.witness(&key),
        })
    }

    /// Store `record` under its own key and return the witness as it stood
    /// before the write.
    pub fn add_or_update(&mut self, record: EntityRecord) -> Result<MapWitness, MirrorError> {
        let key = record.entity_key();
        let witness = self.map.insert(key, record.record_hash())?;
        self.records.insert(key, record);
        Ok(witness)
    }

    /// Fold one confirmed event into the mirror.
    ///
    /// Nothing is written unless the event chains from the current root,
    /// is next in sequence, is self-consistent, and reproduces its
    /// reported `new_root`.
    pub fn absorb(&mut self, event: &TransitionEvent) -> Result<(), MirrorError> {
        let expected = self.last_sequence.saturating_add(1);
        if event.sequence != expected {
            return Err(MirrorError::OutOfOrder {
                expected,
                found: event.sequence,
            });
        }
        let local = self.root();
        if event.previous_root != local {
            return Err(MirrorError::Diverged {
                sequence: event.sequence,
                expected: event.previous_root,
                local,
            });
        }
        event.check_consistency()?;
        let computed = self
            .map
            .witness(&event.entity_key)
            .compute_root_with(Some(&event.record_hash))?;
        if computed != event.new_root {
            return Err(MirrorError::RootDivergence {
                sequence: event.sequence,
                computed,
                reported: event.new_root,
            });
        }
        self.add_or_update(event.record.clone())?;
        self.last_sequence = event.sequence;
        Ok(())
    }

    /// Fold events in order, skipping any at or below `last_sequence`.
    pub fn absorb_all<'a>(
        &mut self,
        events: impl IntoIterator<Item = &'a TransitionEvent>,
    ) -> Result<usize, MirrorError> {
        let mut absorbed = 0;
        for event in events {
            if event.sequence <= self.last_sequence {
                continue;
            }
            self.absorb(event)?;
            absorbed += 1;
        }
        Ok(absorbed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pret_state::{ComplianceRegistry, TransitionErrorKind};
    use pret_zkp::{ComplianceProver, MockProofSystem};

    fn statement(lei: &str, name: &str, passed: bool, ts: u64) -> ComplianceStatement {
        ComplianceStatement {
            lei: lei.to_string(),
            legal_name: name.to_string(),
            jurisdiction: "FR".to_string(),
            is_compliant: passed,
            compliance_score: if passed { 75 } else { 20 },
            verification_timestamp: ts,
        }
    }

    /// Submit through `registry` using `mirror` for the witness.
    fn submit(
        registry: &mut ComplianceRegistry<MockProofSystem>,
        mirror: &MirrorRegistry,
        st: &ComplianceStatement,
    ) -> TransitionEvent {
        let proof = MockProofSystem::default().prove(st).unwrap();
        registry
            .verify_and_update(&mirror.submission_for(proof, st).unwrap())
            .unwrap()
    }

    fn populated() -> (ComplianceRegistry<MockProofSystem>, MirrorRegistry) {
        let mut registry = ComplianceRegistry::new(MockProofSystem::default());
        let mut mirror = MirrorRegistry::new();
        for st in [
            statement("5493001KJTIIGC8Y1R12", "ACME Corp", true, 1),
            statement("529900T8BM49AURSDO55", "Globex Ltd", false, 2),
            statement("5493001KJTIIGC8Y1R12", "ACME Corp", false, 3),
        ] {
            let event = submit(&mut registry, &mirror, &st);
            mirror.absorb(&event).unwrap();
        }
        (registry, mirror)
    }

    #[test]
    fn mirror_tracks_confirmed_root() {
        let (registry, mirror) = populated();
        assert_eq!(mirror.root(), registry.aggregate().map_root);
        assert_eq!(mirror.len(), 2);
        assert_eq!(mirror.last_sequence(), 3);
    }

    #[test]
    fn rebuild_from_log_matches_live_mirror() {
        let (registry, mirror) = populated();
        let rebuilt = MirrorRegistry::from_events(registry.events()).unwrap();
        assert_eq!(rebuilt.root(), mirror.root());
        assert_eq!(rebuilt.snapshot(), mirror.snapshot());
    }

    #[test]
    fn out_of_order_event_rejected() {
        let (registry, _) = populated();
        let mut mirror = MirrorRegistry::new();
        assert!(matches!(
            mirror.absorb(&registry.events()[1]),
            Err(MirrorError::OutOfOrder {
                expected: 1,
                found: 2
            })
        ));
    }

    #[test]
    fn locally_tampered_mirror_detects_divergence() {
        let (registry, _) = populated();
        let mut mirror = MirrorRegistry::from_events(&registry.events()[..1]).unwrap();
        let mut bogus = registry.events()[0].record.clone();
        bogus.compliance_score = 1;
        mirror.add_or_update(bogus).unwrap();
        let before = mirror.root();
        assert!(matches!(
            mirror.absorb(&registry.events()[1]),
            Err(MirrorError::Diverged { sequence: 2, .. })
        ));
        assert_eq!(mirror.root(), before);

        mirror.rebuild_from_log(registry.events()).unwrap();
        assert_eq!(mirror.root(), registry.aggregate().map_root);
    }

    #[test]
    fn wrong_reported_root_rejected_without_mutation() {
        let (registry, _) = populated();
        let mut event = registry.events()[0].clone();
        event.new_root = Digest::from_bytes([0xAB; 32]);
        let mut mirror = MirrorRegistry::new();
        assert!(matches!(
            mirror.absorb(&event),
            Err(MirrorError::RootDivergence { sequence: 1, .. })
        ));
        assert!(mirror.is_empty());
        assert_eq!(mirror.root(), SparseMerkleMap::empty_root());
    }

    #[test]
    fn absorb_all_skips_already_seen() {
        let (registry, _) = populated();
        let mut mirror = MirrorRegistry::from_events(&registry.events()[..2]).unwrap();
        assert_eq!(mirror.absorb_all(registry.events()).unwrap(), 1);
        assert_eq!(mirror.root(), registry.aggregate().map_root);
    }

    #[test]
    fn snapshot_bootstrap_roundtrip() {
        let (_, mirror) = populated();
        let restored = MirrorRegistry::bootstrap(mirror.snapshot()).unwrap();
        assert_eq!(restored.root(), mirror.root());
        assert_eq!(restored.last_sequence(), 3);
    }

    #[test]
    fn forged_snapshot_rejected() {
        let (_, mirror) = populated();
        let mut snap = mirror.snapshot();
        snap.records[0].total_verifications += 1;
        assert!(matches!(
            MirrorRegistry::bootstrap(snap),
            Err(MirrorError::SnapshotMismatch { .. })
        ));
    }

    #[test]
    fn add_or_update_returns_pre_write_witness() {
        let (_, mut mirror) = populated();
        let before = mirror.root();
        let mut record = mirror.records().next().unwrap().clone();
        record.compliance_score = 5;
        let witness = mirror.add_or_update(record).unwrap();
        assert!(witness.verify(&before));
        assert_ne!(mirror.root(), before);
    }

    #[test]
    fn submission_for_existing_entity_discloses_previous() {
        let (_, mirror) = populated();
        let st = statement("529900T8BM49AURSDO55", "Globex Ltd", true, 9);
        let sub = mirror.submission_for((), &st).unwrap();
        let previous = sub.previous.clone().unwrap();
        assert_eq!(sub.witness.leaf, Some(previous.record_hash()));
        assert_eq!(sub.claimed.total_verifications, 2);
        assert_eq!(sub.claimed.consecutive_failures, 0);
    }

    #[test]
    fn jurisdiction_change_is_rejected_by_executor() {
        let (mut registry, mirror) = populated();
        let mut st = statement("5493001KJTIIGC8Y1R12", "ACME Corp", true, 9);
        st.jurisdiction = "DE".to_string();
        let proof = MockProofSystem::default().prove(&st).unwrap();
        let err = registry
            .verify_and_update(&mirror.submission_for(proof, &st).unwrap())
            .unwrap_err();
        assert_eq!(err.kind(), TransitionErrorKind::IdentityMismatch);
    }
}
