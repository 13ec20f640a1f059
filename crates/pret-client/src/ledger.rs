//! # Ledger Abstraction
//!
//! The client's view of the authoritative executor: submit a transition,
//! read the confirmed root, and page through confirmed events. Writes are
//! serialized by the ledger; clients share no state beyond what these
//! methods return.

use parking_lot::Mutex;
use pret_core::Digest;
use pret_state::{
    ComplianceRegistry, GlobalComplianceStats, RegistryAggregate, Submission, TransitionError,
    TransitionEvent,
};
use pret_zkp::ProofVerifier;

/// Handle to the authoritative registry.
pub trait Ledger: Send + Sync {
    /// Proof type the ledger's verifier accepts.
    type Proof;

    /// Submit one transition. Acceptance is final.
    fn submit(
        &self,
        submission: &Submission<Self::Proof>,
    ) -> Result<TransitionEvent, TransitionError>;

    /// The last confirmed map root.
    fn confirmed_root(&self) -> Digest;

    /// Confirmed events with sequence greater than `sequence`.
    fn events_since(&self, sequence: u64) -> Vec<TransitionEvent>;

    /// Global counters as of the last confirmed transition.
    fn stats(&self) -> GlobalComplianceStats;
}

/// A [`ComplianceRegistry`] behind a mutex, shared by any number of
/// pipelines in one process.
#[derive(Debug)]
pub struct InMemoryLedger<V: ProofVerifier> {
    registry: Mutex<ComplianceRegistry<V>>,
}

impl<V: ProofVerifier> InMemoryLedger<V> {
    pub fn new(verifier: V) -> Self {
        Self::from_registry(ComplianceRegistry::new(verifier))
    }

    pub fn from_registry(registry: ComplianceRegistry<V>) -> Self {
        Self {
            registry: Mutex::new(registry),
        }
    }

    /// Snapshot of the current aggregate.
    pub fn aggregate(&self) -> RegistryAggregate {
        self.registry.lock().aggregate().clone()
    }

    /// Run `f` with exclusive access to the registry, for admin operations.
    pub fn with_registry<R>(&self, f: impl FnOnce(&mut ComplianceRegistry<V>) -> R) -> R {
        f(&mut *self.registry.lock())
    }

    /// Take the registry back out.
    pub fn into_registry(self) -> ComplianceRegistry<V> {
        self.registry.into_inner()
    }
}

impl<V: ProofVerifier> Ledger for InMemoryLedger<V> {
    type Proof = V::Proof;

    fn submit(&self, submission: &Submission<V::Proof>) -> Result<TransitionEvent, TransitionError> {
        self.registry.lock().verify_and_update(submission)
    }

    fn confirmed_root(&self) -> Digest {
        self.registry.lock().aggregate().map_root
    }

    fn events_since(&self, sequence: u64) -> Vec<TransitionEvent> {
        self.registry.lock().events_since(sequence).to_vec()
    }

    fn stats(&self) -> GlobalComplianceStats {
        self.registry.lock().query().global_compliance_stats()
    }
}
