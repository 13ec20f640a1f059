//! # State Transition
//!
//! [`apply_transition`] is the whole acceptance rule as a pure function of
//! the current aggregate, a verifier, and a submission. It either returns
//! the next aggregate together with the event describing the change, or an
//! error and no change at all.
//!
//! ## Order of checks
//!
//! 1. Registry enabled.
//! 2. Proof verifies; its score is at most 100.
//! 3. The claimed record names the proof's identity.
//! 4. The witness is for the proof's key and reconstructs the current root.
//! 5. The disclosed previous record agrees with the witnessed leaf, names
//!    the same entity and jurisdiction, and is not newer than the proof.
//! 6. The next record is computed from the previous one (or from scratch),
//!    written into the map, and folded into the counters.

use pret_core::{EntityRecord, MAX_COMPLIANCE_SCORE};
use pret_crypto::{verify_and_update, MapError};
use pret_zkp::ProofVerifier;

use crate::aggregate::RegistryAggregate;
use crate::error::TransitionError;
use crate::event::{Submission, TransitionEvent};

/// Result of an accepted transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    /// The aggregate after the transition.
    pub aggregate: RegistryAggregate,
    /// The event to append to the log.
    pub event: TransitionEvent,
}

/// Decide and compute one transition without mutating anything.
pub fn apply_transition<V: ProofVerifier>(
    state: &RegistryAggregate,
    verifier: &V,
    submission: &Submission<V::Proof>,
) -> Result<TransitionOutcome, TransitionError> {
    if state.disabled {
        return Err(TransitionError::ContractDisabled);
    }

    let output = verifier.verify(&submission.proof)?;
    if output.compliance_score > MAX_COMPLIANCE_SCORE {
        return Err(TransitionError::ScoreOutOfRange(output.compliance_score));
    }

    let identity = output.identity();
    if submission.claimed.identity() != identity {
        return Err(TransitionError::IdentityMismatch(
            "claimed record does not name the proven entity".to_string(),
        ));
    }

    let key = identity.key();
    let witness = &submission.witness;
    if witness.key != key {
        return Err(MapError::KeyMismatch {
            witness_key: witness.key,
            key,
        }
        .into());
    }
    let witnessed_root = witness.compute_root()?;
    if witnessed_root != state.map_root {
        return Err(MapError::RootMismatch {
            expected: state.map_root,
            computed: witnessed_root,
        }
        .into());
    }

    let outcome = output.outcome();
    let (record, was_compliant) = match (witness.leaf, &submission.previous) {
        (None, None) => (
            EntityRecord::first_verification(
                identity,
                submission.claimed.jurisdiction_hash,
                outcome,
            ),
            None,
        ),
        (None, Some(_)) => {
            return Err(TransitionError::WitnessInconsistency(
                "previous record disclosed for an unoccupied slot".to_string(),
            ))
        }
        (Some(_), None) => {
            return Err(TransitionError::WitnessInconsistency(
                "occupied slot requires the previous record".to_string(),
            ))
        }
        (Some(leaf), Some(previous)) => {
            if previous.record_hash() != leaf {
                return Err(TransitionError::WitnessInconsistency(
                    "disclosed previous record does not hash to the witnessed leaf"
                        .to_string(),
                ));
            }
            if previous.identity() != identity {
                return Err(TransitionError::IdentityMismatch(
                    "previous record names a different entity".to_string(),
                ));
            }
            if previous.jurisdiction_hash != submission.claimed.jurisdiction_hash {
                return Err(TransitionError::IdentityMismatch(
                    "jurisdiction differs from the committed record".to_string(),
                ));
            }
            if outcome.timestamp < previous.last_verification_time {
                return Err(TransitionError::StaleTimestamp {
                    submitted: outcome.timestamp,
                    last: previous.last_verification_time,
                });
            }
            (previous.next_verification(outcome), Some(previous.is_compliant))
        }
    };

    record
        .validate()
        .map_err(|e| TransitionError::InvariantViolation(e.to_string()))?;
    if record != submission.claimed {
        tracing::debug!(
            entity = %key,
            "claimed record differs from computed record; committing computed"
        );
    }

    let record_hash = record.record_hash();
    let new_root = verify_and_update(witness, &key, &state.map_root, &record_hash)?;
    let aggregate =
        state.absorb_transition(was_compliant, record.is_compliant, outcome.timestamp, new_root)?;

    let event = TransitionEvent {
        sequence: state.next_sequence(),
        entity_key: key,
        record,
        record_hash,
        previous_root: state.map_root,
        new_root,
        is_new_entity: was_compliant.is_none(),
        was_compliant,
        registry_version: state.registry_version,
    };
    Ok(TransitionOutcome { aggregate, event })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pret_core::{EntityIdentity, JurisdictionHash, VerificationOutcome};
    use pret_crypto::{AuthenticatedMap, SparseMerkleMap};
    use pret_zkp::{ComplianceProver, ComplianceStatement, MockProof, MockProofSystem};

    use crate::error::TransitionErrorKind;

    const LEI: &str = "5493001KJTIIGC8Y1R12";
    const NAME: &str = "ACME Corp";

    fn statement(passed: bool, score: u8, ts: u64) -> ComplianceStatement {
        ComplianceStatement {
            lei: LEI.to_string(),
            legal_name: NAME.to_string(),
            jurisdiction: "US-DE".to_string(),
            is_compliant: passed,
            compliance_score: score,
            verification_timestamp: ts,
        }
    }

    fn identity() -> EntityIdentity {
        EntityIdentity::from_plaintext(LEI, NAME).unwrap()
    }

    fn jurisdiction() -> JurisdictionHash {
        JurisdictionHash::from_code("US-DE").unwrap()
    }

    /// Build a submission the way an honest client would.
    fn submission(
        map: &SparseMerkleMap,
        previous: Option<&EntityRecord>,
        st: &ComplianceStatement,
    ) -> Submission<MockProof> {
        let proof = MockProofSystem::default().prove(st).unwrap();
        let outcome = VerificationOutcome {
            is_compliant: st.is_compliant,
            compliance_score: st.compliance_score,
            timestamp: st.verification_timestamp,
        };
        let claimed = match previous {
            Some(p) => p.next_verification(outcome),
            None => EntityRecord::first_verification(identity(), jurisdiction(), outcome),
        };
        Submission {
            proof,
            claimed,
            previous: previous.cloned(),
            witness: map.witness(&identity().key()),
        }
    }

    fn accept(
        state: &RegistryAggregate,
        map: &mut SparseMerkleMap,
        previous: Option<&EntityRecord>,
        st: &ComplianceStatement,
    ) -> TransitionOutcome {
        let sub = submission(map, previous, st);
        let out = apply_transition(state, &MockProofSystem::default(), &sub).unwrap();
        map.insert(out.event.entity_key, out.event.record_hash).unwrap();
        assert_eq!(map.root(), out.aggregate.map_root);
        out
    }

    #[test]
    fn new_entity_then_update() {
        let mut map = SparseMerkleMap::new();
        let genesis = RegistryAggregate::genesis();
        let first = accept(&genesis, &mut map, None, &statement(true, 90, 100));
        assert!(first.event.is_new_entity);
        assert_eq!(first.event.sequence, 1);
        assert_eq!(first.aggregate.total_companies_tracked, 1);
        assert_eq!(first.aggregate.compliant_companies_count, 1);

        let second = accept(
            &first.aggregate,
            &mut map,
            Some(&first.event.record),
            &statement(false, 40, 200),
        );
        assert!(!second.event.is_new_entity);
        assert_eq!(second.event.was_compliant, Some(true));
        assert_eq!(second.event.record.total_verifications, 2);
        assert_eq!(second.event.record.consecutive_failures, 1);
        assert_eq!(second.aggregate.total_companies_tracked, 1);
        assert_eq!(second.aggregate.compliant_companies_count, 0);
        assert_eq!(second.aggregate.total_verifications_global, 2);
        assert_eq!(second.aggregate.last_verification_time, 200);
    }

    #[test]
    fn disabled_registry_rejects() {
        let mut state = RegistryAggregate::genesis();
        state.disabled = true;
        let sub = submission(&SparseMerkleMap::new(), None, &statement(true, 90, 1));
        let err = apply_transition(&state, &MockProofSystem::default(), &sub).unwrap_err();
        assert_eq!(err.kind(), TransitionErrorKind::ContractDisabled);
    }

    #[test]
    fn forged_proof_rejects() {
        let mut sub = submission(&SparseMerkleMap::new(), None, &statement(false, 10, 1));
        sub.proof.public_output.is_compliant = true;
        let err = apply_transition(
            &RegistryAggregate::genesis(),
            &MockProofSystem::default(),
            &sub,
        )
        .unwrap_err();
        assert_eq!(err.kind(), TransitionErrorKind::ProofInvalid);
    }

    #[test]
    fn score_above_hundred_rejects() {
        let sub = submission(&SparseMerkleMap::new(), None, &statement(true, 101, 1));
        let err = apply_transition(
            &RegistryAggregate::genesis(),
            &MockProofSystem::default(),
            &sub,
        )
        .unwrap_err();
        assert!(matches!(err, TransitionError::ScoreOutOfRange(101)));
    }

    #[test]
    fn claimed_identity_must_match_proof() {
        let mut sub = submission(&SparseMerkleMap::new(), None, &statement(true, 90, 1));
        sub.claimed.legal_name_hash =
            pret_core::LegalNameHash::from_name("Someone Else Ltd").unwrap();
        let err = apply_transition(
            &RegistryAggregate::genesis(),
            &MockProofSystem::default(),
            &sub,
        )
        .unwrap_err();
        assert_eq!(err.kind(), TransitionErrorKind::IdentityMismatch);
    }

    #[test]
    fn stale_witness_rejects_with_root_mismatch() {
        let mut map = SparseMerkleMap::new();
        let genesis = RegistryAggregate::genesis();
        let stale_sub = submission(&map, None, &statement(true, 90, 1));
        let first = accept(&genesis, &mut map, None, &statement(true, 90, 1));
        let err = apply_transition(&first.aggregate, &MockProofSystem::default(), &stale_sub)
            .unwrap_err();
        assert_eq!(err.kind(), TransitionErrorKind::RootMismatch);
        assert!(err.is_retryable());
    }

    #[test]
    fn witness_for_other_key_rejects() {
        let mut sub = submission(&SparseMerkleMap::new(), None, &statement(true, 90, 1));
        let other = EntityIdentity::from_plaintext("529900T8BM49AURSDO55", "Other").unwrap();
        sub.witness = SparseMerkleMap::new().witness(&other.key());
        let err = apply_transition(
            &RegistryAggregate::genesis(),
            &MockProofSystem::default(),
            &sub,
        )
        .unwrap_err();
        assert_eq!(err.kind(), TransitionErrorKind::WitnessInconsistency);
    }

    #[test]
    fn existing_entity_requires_previous() {
        let mut map = SparseMerkleMap::new();
        let first = accept(
            &RegistryAggregate::genesis(),
            &mut map,
            None,
            &statement(true, 90, 1),
        );
        let mut sub = submission(&map, Some(&first.event.record), &statement(true, 90, 2));
        sub.previous = None;
        let err = apply_transition(&first.aggregate, &MockProofSystem::default(), &sub)
            .unwrap_err();
        assert_eq!(err.kind(), TransitionErrorKind::WitnessInconsistency);
    }

    #[test]
    fn new_entity_rejects_disclosed_previous() {
        let map = SparseMerkleMap::new();
        let mut sub = submission(&map, None, &statement(true, 90, 1));
        sub.previous = Some(sub.claimed.clone());
        let err = apply_transition(
            &RegistryAggregate::genesis(),
            &MockProofSystem::default(),
            &sub,
        )
        .unwrap_err();
        assert_eq!(err.kind(), TransitionErrorKind::WitnessInconsistency);
    }

    #[test]
    fn doctored_previous_record_rejects() {
        let mut map = SparseMerkleMap::new();
        let first = accept(
            &RegistryAggregate::genesis(),
            &mut map,
            None,
            &statement(false, 20, 1),
        );
        let mut doctored = first.event.record.clone();
        doctored.failed_verifications = 0;
        doctored.passed_verifications = 1;
        let sub = submission(&map, Some(&doctored), &statement(true, 90, 2));
        let err = apply_transition(&first.aggregate, &MockProofSystem::default(), &sub)
            .unwrap_err();
        assert_eq!(err.kind(), TransitionErrorKind::WitnessInconsistency);
    }

    #[test]
    fn jurisdiction_change_rejects() {
        let mut map = SparseMerkleMap::new();
        let first = accept(
            &RegistryAggregate::genesis(),
            &mut map,
            None,
            &statement(true, 90, 1),
        );
        let mut sub = submission(&map, Some(&first.event.record), &statement(true, 90, 2));
        sub.claimed.jurisdiction_hash = JurisdictionHash::from_code("GB").unwrap();
        let err = apply_transition(&first.aggregate, &MockProofSystem::default(), &sub)
            .unwrap_err();
        assert_eq!(err.kind(), TransitionErrorKind::IdentityMismatch);
    }

    #[test]
    fn older_timestamp_rejects_equal_accepts() {
        let mut map = SparseMerkleMap::new();
        let first = accept(
            &RegistryAggregate::genesis(),
            &mut map,
            None,
            &statement(true, 90, 500),
        );
        let sub = submission(&map, Some(&first.event.record), &statement(true, 90, 499));
        let err = apply_transition(&first.aggregate, &MockProofSystem::default(), &sub)
            .unwrap_err();
        assert!(matches!(
            err,
            TransitionError::StaleTimestamp {
                submitted: 499,
                last: 500
            }
        ));

        let same = accept(
            &first.aggregate,
            &mut map,
            Some(&first.event.record),
            &statement(true, 91, 500),
        );
        assert_eq!(same.event.record.total_verifications, 2);
    }

    #[test]
    fn inflated_claimed_counters_are_ignored() {
        let map = SparseMerkleMap::new();
        let mut sub = submission(&map, None, &statement(true, 90, 1));
        sub.claimed.total_verifications = 1_000;
        sub.claimed.passed_verifications = 1_000;
        let out = apply_transition(
            &RegistryAggregate::genesis(),
            &MockProofSystem::default(),
            &sub,
        )
        .unwrap();
        assert_eq!(out.event.record.total_verifications, 1);
        assert_eq!(out.event.record.passed_verifications, 1);
    }

    #[test]
    fn rejection_leaves_input_state_untouched() {
        let state = RegistryAggregate::genesis();
        let before = state.clone();
        let sub = submission(&SparseMerkleMap::new(), None, &statement(true, 150, 1));
        assert!(apply_transition(&state, &MockProofSystem::default(), &sub).is_err());
        assert_eq!(state, before);
    }
}
