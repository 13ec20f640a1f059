//! # Compliance Registry Executor
//!
//! Holds the authoritative [`RegistryAggregate`] and the append-only event
//! log, and exposes the single state-mutating entrypoint
//! [`ComplianceRegistry::verify_and_update`]. A transition is computed in
//! full by [`apply_transition`] before anything is written, so a rejected
//! submission leaves both the aggregate and the log exactly as they were.
//!
//! The executor stores no per-entity data beyond the map root. Callers
//! reconstruct the map from [`ComplianceRegistry::events_since`].
//!
//! ## Administration
//!
//! `disable`, `enable`, and `bump_version` change only the admin flags.
//! There is no operation that resets counters or the root.

use pret_zkp::ProofVerifier;

use crate::aggregate::RegistryAggregate;
use crate::error::{ReplayError, TransitionError};
use crate::event::{Submission, TransitionEvent};
use crate::query::QueryService;
use crate::transition::apply_transition;

/// Authoritative executor for proof-gated registry updates.
#[derive(Debug)]
pub struct ComplianceRegistry<V: ProofVerifier> {
    verifier: V,
    aggregate: RegistryAggregate,
    events: Vec<TransitionEvent>,
}

impl<V: ProofVerifier> ComplianceRegistry<V> {
    /// A fresh registry at genesis.
    pub fn new(verifier: V) -> Self {
        Self {
            verifier,
            aggregate: RegistryAggregate::genesis(),
            events: Vec::new(),
        }
    }

    /// Restore a registry from a previously exported event log.
    pub fn from_events(verifier: V, events: Vec<TransitionEvent>) -> Result<Self, ReplayError> {
        let aggregate = RegistryAggregate::replay(&events)?;
        Ok(Self {
            verifier,
            aggregate,
            events,
        })
    }

    /// Verify a submission and, if it is accepted, commit it atomically.
    pub fn verify_and_update(
        &mut self,
        submission: &Submission<V::Proof>,
    ) -> Result<TransitionEvent, TransitionError> {
        match apply_transition(&self.aggregate, &self.verifier, submission) {
            Ok(outcome) => {
                self.aggregate = outcome.aggregate;
                self.events.push(outcome.event.clone());
                let event = outcome.event;
                tracing::info!(
                    sequence = event.sequence,
                    entity = %event.entity_key,
                    new_entity = event.is_new_entity,
                    compliant = event.record.is_compliant,
                    root = %event.new_root.short_hex(),
                    "transition accepted"
                );
                metrics::counter!("pret_transitions_accepted_total").increment(1);
                metrics::gauge!("pret_registry_companies_tracked")
                    .set(self.aggregate.total_companies_tracked as f64);
                Ok(event)
            }
            Err(err) => {
                let kind = err.kind();
                tracing::warn!(
                    reason = %kind,
                    entity = %submission.witness.key,
                    error = %err,
                    "transition rejected"
                );
                metrics::counter!("pret_transitions_rejected_total", "reason" => kind.as_str())
                    .increment(1);
                Err(err)
            }
        }
    }

    /// The current aggregate.
    pub fn aggregate(&self) -> &RegistryAggregate {
        &self.aggregate
    }

    /// All accepted events in order.
    pub fn events(&self) -> &[TransitionEvent] {
        &self.events
    }

    /// Events with a sequence number strictly greater than `sequence`.
    pub fn events_since(&self, sequence: u64) -> &[TransitionEvent] {
        let start = usize::try_from(sequence)
            .unwrap_or(usize::MAX)
            .min(self.events.len());
        &self.events[start..]
    }

    /// Read-only view over the aggregate.
    pub fn query(&self) -> QueryService<'_> {
        QueryService::new(&self.aggregate)
    }

    /// The verifier submissions are checked against.
    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    // ─── Administration ──────────────────────────────────────────────

    /// Refuse all further submissions until [`Self::enable`].
    pub fn disable(&mut self) {
        if !self.aggregate.disabled {
            tracing::info!(version = self.aggregate.registry_version, "registry disabled");
        }
        self.aggregate.disabled = true;
    }

    /// Accept submissions again.
    pub fn enable(&mut self) {
        if self.aggregate.disabled {
            tracing::info!(version = self.aggregate.registry_version, "registry enabled");
        }
        self.aggregate.disabled = false;
    }

    /// Increment the registry version and return the new value.
    ///
    /// Events accepted afterwards carry the new version; counters and the
    /// root are untouched.
    pub fn bump_version(&mut self) -> u64 {
        self.aggregate.registry_version = self.aggregate.registry_version.saturating_add(1);
        tracing::info!(version = self.aggregate.registry_version, "registry version bumped");
        self.aggregate.registry_version
    }
}
