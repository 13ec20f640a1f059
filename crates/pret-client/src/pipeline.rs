//! # Submission Pipeline
//!
//! Drives one compliance statement from proof to confirmed transition:
//!
//! ```text
//! prove ──▶ sync mirror ──▶ witness + disclosure ──▶ submit ──▶ absorb
//!               ▲                                       │
//!               └──── RootMismatch / WitnessInconsistency (backoff)
//! ```
//!
//! The proof does not depend on the map, so it is generated once. The
//! witness does, and proving can take long enough for other clients to
//! move the root, so the witness is rebuilt from a freshly synced mirror
//! before every attempt. Only stale-view errors are retried; anything
//! else is returned on the first attempt.
//!
//! A mirror that cannot absorb the confirmed log is rebuilt from the full
//! log before the pipeline continues.

use std::sync::Arc;

use pret_crypto::SparseMerkleMap;
use pret_state::TransitionEvent;
use pret_zkp::{ComplianceProver, ComplianceStatement, ProofError};
use uuid::Uuid;

use crate::config::RetryPolicy;
use crate::error::PipelineError;
use crate::ledger::Ledger;
use crate::mirror::MirrorRegistry;

/// Client-side submission driver for one ledger.
#[derive(Debug)]
pub struct SubmissionPipeline<P, L> {
    prover: Arc<P>,
    ledger: Arc<L>,
    mirror: MirrorRegistry,
    policy: RetryPolicy,
}

impl<P, L> SubmissionPipeline<P, L>
where
    P: ComplianceProver + 'static,
    P::Proof: Clone + Send + 'static,
    L: Ledger<Proof = P::Proof>,
{
    /// A pipeline with an empty mirror; the first submission syncs it.
    pub fn new(prover: Arc<P>, ledger: Arc<L>, policy: RetryPolicy) -> Self {
        Self {
            prover,
            ledger,
            mirror: MirrorRegistry::new(),
            policy,
        }
    }

    /// Start from an existing mirror, e.g. one bootstrapped from a snapshot.
    pub fn with_mirror(mut self, mirror: MirrorRegistry) -> Self {
        self.mirror = mirror;
        self
    }

    pub fn mirror(&self) -> &MirrorRegistry {
        &self.mirror
    }

    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Bring the mirror up to the ledger's confirmed log.
    ///
    /// Returns the number of events absorbed. The mirror is rebuilt from the
    /// full log if it cannot absorb the new events, if it claims a sequence
    /// the ledger has not reached, or if its root differs from the one the
    /// ledger confirmed at that sequence.
    pub fn sync(&mut self) -> Result<usize, PipelineError> {
        let events = self.ledger.events_since(self.mirror.last_sequence());
        match self.mirror.absorb_all(&events) {
            Ok(absorbed) if self.mirror_is_confirmed() => return Ok(absorbed),
            Ok(_) => tracing::warn!(
                sequence = self.mirror.last_sequence(),
                root = %self.mirror.root().short_hex(),
                "mirror root not confirmed by ledger; rebuilding from event log"
            ),
            Err(err) => {
                tracing::warn!(error = %err, "mirror diverged; rebuilding from event log")
            }
        }
        let all = self.ledger.events_since(0);
        self.mirror.rebuild_from_log(&all)?;
        Ok(all.len())
    }

    /// Whether the mirror's root is the root the ledger confirmed at the
    /// mirror's sequence.
    fn mirror_is_confirmed(&self) -> bool {
        let root = self.mirror.root();
        if root == self.ledger.confirmed_root() {
            return true;
        }
        // Other clients may have committed since the events were fetched.
        let confirmed_at = match self.mirror.last_sequence() {
            0 => Some(SparseMerkleMap::empty_root()),
            sequence => self
                .ledger
                .events_since(sequence - 1)
                .first()
                .filter(|event| event.sequence == sequence)
                .map(|event| event.new_root),
        };
        confirmed_at == Some(root)
    }

    async fn prove(&self, statement: &ComplianceStatement) -> Result<P::Proof, PipelineError> {
        let prover = Arc::clone(&self.prover);
        let statement = statement.clone();
        let proof = tokio::task::spawn_blocking(move || prover.prove(&statement))
            .await
            .map_err(|e| ProofError::GenerationFailed(format!("prover task failed: {e}")))??;
        Ok(proof)
    }

    /// Prove `statement` and submit it until it is confirmed, rejected, or
    /// the retry budget runs out.
    pub async fn submit(
        &mut self,
        statement: &ComplianceStatement,
    ) -> Result<TransitionEvent, PipelineError> {
        let submission_id = Uuid::new_v4();
        let key = statement
            .identity()
            .map_err(|e| PipelineError::InvalidStatement(e.to_string()))?
            .key();
        let proof = self.prove(statement).await?;

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            self.sync()?;
            let submission = self
                .mirror
                .submission_for(proof.clone(), statement)
                .map_err(|e| PipelineError::InvalidStatement(e.to_string()))?;

            match self.ledger.submit(&submission) {
                Ok(event) => {
                    // Acceptance is final; a failed refresh is retried by
                    // the next submission's sync.
                    if let Err(err) = self.sync() {
                        tracing::warn!(
                            %submission_id,
                            error = %err,
                            "mirror refresh after confirmation failed"
                        );
                    }
                    tracing::info!(
                        %submission_id,
                        entity = %key,
                        sequence = event.sequence,
                        attempts = attempt,
                        "submission confirmed"
                    );
                    return Ok(event);
                }
                Err(err) if err.is_retryable() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.backoff(attempt);
                    tracing::debug!(
                        %submission_id,
                        entity = %key,
                        attempt,
                        reason = %err.kind(),
                        delay_ms = delay.as_millis() as u64,
                        "stale view; retrying"
                    );
                    metrics::counter!("pret_pipeline_retries_total").increment(1);
                    tokio::time::sleep(delay).await;
                }
                Err(err) if err.is_retryable() => {
                    tracing::warn!(
                        %submission_id,
                        entity = %key,
                        attempts = attempt,
                        "retry budget exhausted"
                    );
                    return Err(PipelineError::RetriesExhausted {
                        attempts: attempt,
                        last: err,
                    });
                }
                Err(err) => return Err(PipelineError::Rejected(err)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pret_core::Digest;
    use pret_state::{
        GlobalComplianceStats, Submission, TransitionError, TransitionErrorKind,
    };
    use pret_zkp::{MockProof, MockProofSystem};

    use crate::ledger::InMemoryLedger;

    fn statement(lei: &str, name: &str, passed: bool, ts: u64) -> ComplianceStatement {
        ComplianceStatement {
            lei: lei.to_string(),
            legal_name: name.to_string(),
            jurisdiction: "US-DE".to_string(),
            is_compliant: passed,
            compliance_score: if passed { 90 } else { 25 },
            verification_timestamp: ts,
        }
    }

    fn acme(passed: bool, ts: u64) -> ComplianceStatement {
        statement("5493001KJTIIGC8Y1R12", "ACME Corp", passed, ts)
    }

    /// Lands one rival submission ahead of each incoming submission while
    /// rivals remain, so the incoming witness is always one root behind.
    struct RacingLedger {
        inner: InMemoryLedger<MockProofSystem>,
        rivals: Mutex<Vec<ComplianceStatement>>,
    }

    impl RacingLedger {
        fn new(rivals: Vec<ComplianceStatement>) -> Self {
            Self {
                inner: InMemoryLedger::new(MockProofSystem::default()),
                rivals: Mutex::new(rivals),
            }
        }
    }

    impl Ledger for RacingLedger {
        type Proof = MockProof;

        fn submit(
            &self,
            submission: &Submission<MockProof>,
        ) -> Result<TransitionEvent, TransitionError> {
            if let Some(rival) = self.rivals.lock().pop() {
                let mirror = MirrorRegistry::from_events(&self.inner.events_since(0)).unwrap();
                let proof = MockProofSystem::default().prove(&rival).unwrap();
                self.inner
                    .submit(&mirror.submission_for(proof, &rival).unwrap())
                    .unwrap();
            }
            self.inner.submit(submission)
        }

        fn confirmed_root(&self) -> Digest {
            self.inner.confirmed_root()
        }

        fn events_since(&self, sequence: u64) -> Vec<TransitionEvent> {
            self.inner.events_since(sequence)
        }

        fn stats(&self) -> GlobalComplianceStats {
            self.inner.stats()
        }
    }

    fn rivals(n: usize) -> Vec<ComplianceStatement> {
        ["529900T8BM49AURSDO55", "213800D1EI4B9WTWWD28", "549300MLUDYVRQOOXS22"]
            .iter()
            .take(n)
            .enumerate()
            .map(|(i, lei)| statement(lei, &format!("Rival {i}"), i % 2 == 0, 1))
            .collect()
    }

    #[tokio::test]
    async fn scenario_through_pipeline() {
        let ledger = Arc::new(InMemoryLedger::new(MockProofSystem::default()));
        let mut pipeline = SubmissionPipeline::new(
            Arc::new(MockProofSystem::default()),
            Arc::clone(&ledger),
            RetryPolicy::immediate(3),
        );

        pipeline.submit(&acme(true, 100)).await.unwrap();
        let event = pipeline.submit(&acme(false, 200)).await.unwrap();
        assert_eq!(event.record.consecutive_failures, 1);
        pipeline
            .submit(&statement("529900T8BM49AURSDO55", "Globex Ltd", true, 300))
            .await
            .unwrap();

        let stats = ledger.stats();
        assert_eq!(stats.total_companies, 2);
        assert_eq!(stats.compliant_companies, 1);
        assert_eq!(stats.total_verifications, 3);
        assert_eq!(pipeline.mirror().root(), ledger.confirmed_root());
    }

    #[tokio::test]
    async fn stale_root_is_retried() {
        let ledger = Arc::new(RacingLedger::new(rivals(2)));
        let mut pipeline = SubmissionPipeline::new(
            Arc::new(MockProofSystem::default()),
            Arc::clone(&ledger),
            RetryPolicy::immediate(5),
        );
        let event = pipeline.submit(&acme(true, 10)).await.unwrap();
        assert_eq!(event.sequence, 3);
        assert_eq!(ledger.stats().total_companies, 3);
        assert_eq!(pipeline.mirror().root(), ledger.confirmed_root());
    }

    #[tokio::test]
    async fn retry_budget_is_bounded() {
        let ledger = Arc::new(RacingLedger::new(rivals(3)));
        let mut pipeline = SubmissionPipeline::new(
            Arc::new(MockProofSystem::default()),
            Arc::clone(&ledger),
            RetryPolicy::immediate(2),
        );
        let err = pipeline.submit(&acme(true, 10)).await.unwrap_err();
        match err {
            PipelineError::RetriesExhausted { attempts, last } => {
                assert_eq!(attempts, 2);
                assert_eq!(last.kind(), TransitionErrorKind::RootMismatch);
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_retryable_rejection_returns_immediately() {
        let ledger = Arc::new(RacingLedger::new(Vec::new()));
        ledger.inner.with_registry(|r| r.disable());
        let mut pipeline = SubmissionPipeline::new(
            Arc::new(MockProofSystem::default()),
            Arc::clone(&ledger),
            RetryPolicy::immediate(5),
        );
        let err = pipeline.submit(&acme(true, 10)).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Rejected(TransitionError::ContractDisabled)
        ));
    }

    #[tokio::test]
    async fn prover_key_mismatch_is_proof_invalid() {
        let ledger = Arc::new(InMemoryLedger::new(MockProofSystem::new("ledger-key")));
        let mut pipeline = SubmissionPipeline::new(
            Arc::new(MockProofSystem::new("other-key")),
            Arc::clone(&ledger),
            RetryPolicy::immediate(5),
        );
        let err = pipeline.submit(&acme(true, 10)).await.unwrap_err();
        match err {
            PipelineError::Rejected(e) => assert_eq!(e.kind(), TransitionErrorKind::ProofInvalid),
            other => panic!("expected Rejected, got {other:?}"),
        }
        assert_eq!(ledger.stats().total_verifications, 0);
    }

    #[tokio::test]
    async fn invalid_statement_never_reaches_ledger() {
        let ledger = Arc::new(InMemoryLedger::new(MockProofSystem::default()));
        let mut pipeline = SubmissionPipeline::new(
            Arc::new(MockProofSystem::default()),
            Arc::clone(&ledger),
            RetryPolicy::immediate(5),
        );
        let err = pipeline
            .submit(&statement("bad", "ACME Corp", true, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidStatement(_)));
        assert!(ledger.events_since(0).is_empty());
    }

    #[tokio::test]
    async fn corrupted_mirror_is_rebuilt() {
        let ledger = Arc::new(InMemoryLedger::new(MockProofSystem::default()));
        let mut first = SubmissionPipeline::new(
            Arc::new(MockProofSystem::default()),
            Arc::clone(&ledger),
            RetryPolicy::immediate(3),
        );
        first.submit(&acme(true, 1)).await.unwrap();

        let mut corrupted = MirrorRegistry::new();
        let mut bogus = first.mirror().records().next().unwrap().clone();
        bogus.compliance_score = 3;
        corrupted.add_or_update(bogus).unwrap();

        let mut second = SubmissionPipeline::new(
            Arc::new(MockProofSystem::default()),
            Arc::clone(&ledger),
            RetryPolicy::immediate(3),
        )
        .with_mirror(corrupted);
        second.submit(&acme(false, 2)).await.unwrap();
        assert_eq!(second.mirror().root(), ledger.confirmed_root());
        assert_eq!(ledger.stats().compliant_companies, 0);
    }

    #[tokio::test]
    async fn caught_up_but_diverged_mirror_is_rebuilt() {
        let ledger = Arc::new(InMemoryLedger::new(MockProofSystem::default()));
        let mut first = SubmissionPipeline::new(
            Arc::new(MockProofSystem::default()),
            Arc::clone(&ledger),
            RetryPolicy::immediate(3),
        );
        first.submit(&acme(true, 1)).await.unwrap();

        let mut diverged = first.mirror().clone();
        let mut doctored = diverged.records().next().unwrap().clone();
        doctored.compliance_score = 7;
        diverged.add_or_update(doctored).unwrap();
        assert_eq!(diverged.last_sequence(), 1);
        assert_ne!(diverged.root(), ledger.confirmed_root());

        let mut second = SubmissionPipeline::new(
            Arc::new(MockProofSystem::default()),
            Arc::clone(&ledger),
            RetryPolicy::immediate(3),
        )
        .with_mirror(diverged);
        let event = second.submit(&acme(false, 2)).await.unwrap();
        assert_eq!(event.sequence, 2);
        assert_eq!(event.record.total_verifications, 2);
        assert_eq!(second.mirror().root(), ledger.confirmed_root());
    }

    #[tokio::test]
    async fn mirror_ahead_of_ledger_is_rebuilt() {
        let elsewhere_ledger = Arc::new(InMemoryLedger::new(MockProofSystem::default()));
        let mut elsewhere = SubmissionPipeline::new(
            Arc::new(MockProofSystem::default()),
            Arc::clone(&elsewhere_ledger),
            RetryPolicy::immediate(3),
        );
        elsewhere.submit(&acme(true, 1)).await.unwrap();
        elsewhere
            .submit(&statement("529900T8BM49AURSDO55", "Globex Ltd", true, 2))
            .await
            .unwrap();

        let ledger = Arc::new(InMemoryLedger::new(MockProofSystem::default()));
        let mut pipeline = SubmissionPipeline::new(
            Arc::new(MockProofSystem::default()),
            Arc::clone(&ledger),
            RetryPolicy::immediate(3),
        )
        .with_mirror(elsewhere.mirror().clone());
        let event = pipeline.submit(&acme(false, 3)).await.unwrap();
        assert!(event.is_new_entity);
        assert_eq!(event.sequence, 1);
        assert_eq!(pipeline.mirror().last_sequence(), 1);
        assert_eq!(pipeline.mirror().root(), ledger.confirmed_root());
    }

    /// Reports every confirmed event with a wrong `new_root`, so no mirror
    /// can absorb or rebuild from its log.
    struct ForgedLogLedger {
        inner: InMemoryLedger<MockProofSystem>,
    }

    impl Ledger for ForgedLogLedger {
        type Proof = MockProof;

        fn submit(
            &self,
            submission: &Submission<MockProof>,
        ) -> Result<TransitionEvent, TransitionError> {
            self.inner.submit(submission)
        }

        fn confirmed_root(&self) -> Digest {
            self.inner.confirmed_root()
        }

        fn events_since(&self, sequence: u64) -> Vec<TransitionEvent> {
            let mut events = self.inner.events_since(sequence);
            for event in &mut events {
                event.new_root = Digest::from_bytes([0xee; 32]);
            }
            events
        }

        fn stats(&self) -> GlobalComplianceStats {
            self.inner.stats()
        }
    }

    #[tokio::test]
    async fn confirmation_stands_when_refresh_fails() {
        let ledger = Arc::new(ForgedLogLedger {
            inner: InMemoryLedger::new(MockProofSystem::default()),
        });
        let mut pipeline = SubmissionPipeline::new(
            Arc::new(MockProofSystem::default()),
            Arc::clone(&ledger),
            RetryPolicy::immediate(3),
        );
        let event = pipeline.submit(&acme(true, 1)).await.unwrap();
        assert_eq!(event.sequence, 1);
        assert!(pipeline.sync().is_err());
        assert_eq!(ledger.stats().total_verifications, 1);
    }
}
