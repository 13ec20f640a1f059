//! # pret-state — Proof-Gated Registry State
//!
//! The authoritative side of the registry: the aggregate counters, the
//! single state-mutating entrypoint, and the read-only query surface.
//!
//! ## Modules
//!
//! - **Aggregate** (`aggregate.rs`): global counters, map root, admin flags,
//!   and replay from an event log.
//!
//! - **Transition** (`transition.rs`): the acceptance rule as a pure
//!   function from (aggregate, verifier, submission) to (aggregate, event).
//!
//! - **Registry** (`registry.rs`): the executor. Commits accepted
//!   transitions atomically, keeps the event log, and handles admin
//!   operations.
//!
//! - **Query** (`query.rs`): registry info, global stats, and per-entity
//!   lookup by identity and witness.
//!
//! ## Design
//!
//! The executor never stores per-entity records. Clients keep a mirror of
//! the map, build witnesses from it, and disclose the previous record on
//! update; the executor checks the disclosure against the witnessed leaf.

pub mod aggregate;
pub mod error;
pub mod event;
pub mod query;
pub mod registry;
pub mod transition;

pub use aggregate::{ComplianceDelta, RegistryAggregate, GENESIS_VERSION};
pub use error::{ReplayError, TransitionError, TransitionErrorKind};
pub use event::{Submission, TransitionEvent};
pub use query::{EntityLookup, GlobalComplianceStats, QueryService};
pub use registry::ComplianceRegistry;
pub use transition::{apply_transition, TransitionOutcome};
