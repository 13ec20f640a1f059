//! # Query Service
//!
//! Read-only views over the registry aggregate. No query mutates state.
//!
//! Ratios such as the compliance percentage are left to callers; the
//! registry reports integer counters only.

use pret_core::{Digest, EntityIdentity, EntityRecord};
use pret_crypto::MapWitness;
use serde::{Deserialize, Serialize};

use crate::aggregate::RegistryAggregate;

/// Global compliance counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalComplianceStats {
    pub total_companies: u64,
    pub compliant_companies: u64,
    pub total_verifications: u64,
    pub last_verification_time: u64,
}

/// Result of looking an entity up by identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityLookup {
    /// Whether the witness proves an occupied slot under the current root.
    pub exists: bool,
    /// The committed record hash, when `exists`.
    pub committed_hash: Option<Digest>,
    /// The root the witness was checked against.
    pub root: Digest,
    /// Whether the witness is for this identity and reconstructs `root`.
    pub witness_valid: bool,
}

/// Borrowed read-only view over a [`RegistryAggregate`].
#[derive(Debug, Clone, Copy)]
pub struct QueryService<'a> {
    aggregate: &'a RegistryAggregate,
}

impl<'a> QueryService<'a> {
    pub fn new(aggregate: &'a RegistryAggregate) -> Self {
        Self { aggregate }
    }

    /// Snapshot of the full aggregate, with no derived figures.
    pub fn registry_info(&self) -> RegistryAggregate {
        self.aggregate.clone()
    }

    pub fn global_compliance_stats(&self) -> GlobalComplianceStats {
        GlobalComplianceStats {
            total_companies: self.aggregate.total_companies_tracked,
            compliant_companies: self.aggregate.compliant_companies_count,
            total_verifications: self.aggregate.total_verifications_global,
            last_verification_time: self.aggregate.last_verification_time,
        }
    }

    /// Check a caller-supplied witness for `identity` against the current root.
    ///
    /// The registry holds commitments, not records: a valid witness proves
    /// which record hash is committed for the entity, never the record's
    /// content. Callers that need the fields must obtain the plaintext
    /// record elsewhere (a mirror) and check it with [`Self::is_committed`].
    ///
    /// An invalid witness reports `exists = false` and no hash; it says
    /// nothing about whether the entity is registered.
    pub fn entity_by_identity(
        &self,
        identity: &EntityIdentity,
        witness: &MapWitness,
    ) -> EntityLookup {
        let root = self.aggregate.map_root;
        let witness_valid = witness.key == identity.key() && witness.verify(&root);
        let committed_hash = if witness_valid { witness.leaf } else { None };
        EntityLookup {
            exists: committed_hash.is_some(),
            committed_hash,
            root,
            witness_valid,
        }
    }

    /// Whether `record` is the record currently committed for its entity,
    /// as proven by `witness`.
    pub fn is_committed(&self, record: &EntityRecord, witness: &MapWitness) -> bool {
        let lookup = self.entity_by_identity(&record.identity(), witness);
        lookup.committed_hash == Some(record.record_hash())
    }
}
