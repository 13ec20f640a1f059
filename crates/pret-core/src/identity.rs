//! # Entity Identity Hashes
//!
//! The registry never stores plaintext identifiers. An entity is known by
//! three hashes derived from normalized strings, and addressed in the
//! authenticated map by `EntityKey = H(leiHash, legalNameHash)`.
//!
//! ## Normalization
//!
//! - **LEI** (ISO 17442): trimmed, upper-cased, exactly 20 ASCII
//!   alphanumeric characters.
//! - **Legal name**: trimmed, internal whitespace collapsed to single
//!   spaces. Case is preserved; registries disagree on casing and the
//!   proof binds whatever the data source returned.
//! - **Jurisdiction**: trimmed and upper-cased (`IN`, `US-DE`, ...).
//!
//! Each hash uses its own domain tag so an LEI hash can never be replayed
//! as a name hash.

use serde::{Deserialize, Serialize};

use crate::digest::{tagged_sha256, Digest};
use crate::error::CoreError;

const LEI_TAG: &[u8] = b"pret.lei.v1";
const LEGAL_NAME_TAG: &[u8] = b"pret.legal-name.v1";
const JURISDICTION_TAG: &[u8] = b"pret.jurisdiction.v1";
const ENTITY_KEY_TAG: &[u8] = b"pret.entity-key.v1";

/// Length of an ISO 17442 Legal Entity Identifier.
pub const LEI_LENGTH: usize = 20;

/// Hash of a normalized Legal Entity Identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeiHash(Digest);

/// Hash of a normalized legal name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LegalNameHash(Digest);

/// Hash of a normalized jurisdiction code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JurisdictionHash(Digest);

/// Address of an entity in the authenticated map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityKey(Digest);

impl LeiHash {
    /// Validate, normalize and hash an LEI.
    pub fn from_lei(lei: &str) -> Result<Self, CoreError> {
        let normalized = lei.trim().to_ascii_uppercase();
        if normalized.len() != LEI_LENGTH {
            return Err(CoreError::InvalidIdentifier {
                kind: "LEI",
                reason: format!(
                    "expected {LEI_LENGTH} characters, got {}",
                    normalized.len()
                ),
            });
        }
        if !normalized.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(CoreError::InvalidIdentifier {
                kind: "LEI",
                reason: "must be ASCII alphanumeric".to_string(),
            });
        }
        Ok(Self(tagged_sha256(LEI_TAG, &[normalized.as_bytes()])))
    }

    /// Wrap an already-computed hash, e.g. one taken from a proof's public output.
    pub fn from_digest(digest: Digest) -> Self {
        Self(digest)
    }

    /// The underlying digest.
    pub fn digest(&self) -> &Digest {
        &self.0
    }
}

impl LegalNameHash {
    /// Normalize and hash a legal name.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        let normalized = name.split_whitespace().collect::<Vec<_>>().join(" ");
        if normalized.is_empty() {
            return Err(CoreError::InvalidIdentifier {
                kind: "legal name",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(Self(tagged_sha256(LEGAL_NAME_TAG, &[normalized.as_bytes()])))
    }

    /// Wrap an already-computed hash.
    pub fn from_digest(digest: Digest) -> Self {
        Self(digest)
    }

    /// The underlying digest.
    pub fn digest(&self) -> &Digest {
        &self.0
    }
}

impl JurisdictionHash {
    /// Normalize and hash a jurisdiction code.
    pub fn from_code(code: &str) -> Result<Self, CoreError> {
        let normalized = code.trim().to_ascii_uppercase();
        if normalized.is_empty() {
            return Err(CoreError::InvalidIdentifier {
                kind: "jurisdiction",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(Self(tagged_sha256(JURISDICTION_TAG, &[normalized.as_bytes()])))
    }

    /// Wrap an already-computed hash.
    pub fn from_digest(digest: Digest) -> Self {
        Self(digest)
    }

    /// The underlying digest.
    pub fn digest(&self) -> &Digest {
        &self.0
    }
}

impl EntityKey {
    /// Derive the map key from the two identity hashes.
    pub fn derive(lei_hash: &LeiHash, legal_name_hash: &LegalNameHash) -> Self {
        Self(tagged_sha256(
            ENTITY_KEY_TAG,
            &[lei_hash.0.as_bytes(), legal_name_hash.0.as_bytes()],
        ))
    }

    /// Wrap an already-computed key, e.g. one parsed from an event log.
    pub fn from_digest(digest: Digest) -> Self {
        Self(digest)
    }

    /// The underlying digest. Its bits form the path in the map.
    pub fn digest(&self) -> &Digest {
        &self.0
    }
}

impl std::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "entity:{}", self.0.short_hex())
    }
}

/// The identity pair that determines an entity's map key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityIdentity {
    /// Hash of the entity's LEI.
    pub lei_hash: LeiHash,
    /// Hash of the entity's legal name.
    pub legal_name_hash: LegalNameHash,
}

impl EntityIdentity {
    /// Build an identity from plaintext LEI and legal name.
    pub fn from_plaintext(lei: &str, legal_name: &str) -> Result<Self, CoreError> {
        Ok(Self {
            lei_hash: LeiHash::from_lei(lei)?,
            legal_name_hash: LegalNameHash::from_name(legal_name)?,
        })
    }

    /// The map key for this identity.
    pub fn key(&self) -> EntityKey {
        EntityKey::derive(&self.lei_hash, &self.legal_name_hash)
    }
}
