//! # Digest — 32-Byte Hash Values
//!
//! Every commitment in the registry (identity hashes, record hashes, map
//! nodes, roots) is a SHA-256 output wrapped in [`Digest`]. Digests
//! serialize as 64 lowercase hex characters.
//!
//! Two construction paths exist:
//!
//! - [`sha256_digest()`] over [`CanonicalBytes`], for serde values.
//! - [`tagged_sha256()`] over a domain tag plus raw parts, for fixed binary
//!   encodings (record fields, identity strings, map nodes).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest as _, Sha256};

use crate::canonical::CanonicalBytes;
use crate::error::CoreError;

/// A 32-byte SHA-256 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Digest([u8; 32]);

impl Digest {
    /// The all-zero digest. Used as the empty leaf placeholder.
    pub const ZERO: Digest = Digest([0u8; 32]);

    /// Number of bits in a digest, and so the depth of a key path.
    pub const BITS: usize = 256;

    /// Wrap raw digest bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render the digest as lowercase hex.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// The first eight hex characters, for log lines.
    pub fn short_hex(&self) -> String {
        self.0[..4].iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(hex: &str) -> Result<Self, CoreError> {
        let hex = hex.trim();
        if hex.len() != 64 {
            return Err(CoreError::InvalidDigest(format!(
                "expected 64 hex chars, got {}",
                hex.len()
            )));
        }
        let mut out = [0u8; 32];
        for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
            let s = std::str::from_utf8(chunk)
                .map_err(|e| CoreError::InvalidDigest(format!("invalid hex: {e}")))?;
            out[i] = u8::from_str_radix(s, 16)
                .map_err(|e| CoreError::InvalidDigest(format!("invalid hex at {i}: {e}")))?;
        }
        Ok(Self(out))
    }

    /// The bit at `index`, counting from the most significant bit of byte 0.
    ///
    /// `index` must be below [`Digest::BITS`].
    pub fn bit(&self, index: usize) -> bool {
        (self.0[index / 8] >> (7 - index % 8)) & 1 == 1
    }
}

impl std::fmt::Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::fmt::Debug for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Digest::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Compute a SHA-256 digest from canonical bytes.
pub fn sha256_digest(data: &CanonicalBytes) -> Digest {
    let hash = Sha256::digest(data.as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    Digest(bytes)
}

/// Compute `SHA256(tag || parts[0] || parts[1] || ...)`.
///
/// The tag provides domain separation: two encodings with different tags
/// never collide even if their parts are byte-identical.
pub fn tagged_sha256(tag: &[u8], parts: &[&[u8]]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(tag);
    for part in parts {
        hasher.update(part);
    }
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hasher.finalize());
    Digest(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_sha256_vector() {
        let cb = CanonicalBytes::new(&serde_json::json!({})).unwrap();
        // SHA256("{}")
        assert_eq!(
            sha256_digest(&cb).to_hex(),
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }

    #[test]
    fn tagged_hash_of_empty_parts_is_hash_of_tag() {
        // SHA256("") with an empty tag.
        assert_eq!(
            tagged_sha256(b"", &[]).to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn tag_separates_domains() {
        assert_ne!(
            tagged_sha256(b"a", &[b"payload"]),
            tagged_sha256(b"b", &[b"payload"])
        );
    }

    #[test]
    fn hex_roundtrip_and_case_insensitive_parse() {
        let d = tagged_sha256(b"x", &[b"y"]);
        assert_eq!(Digest::from_hex(&d.to_hex()).unwrap(), d);
        assert_eq!(Digest::from_hex(&d.to_hex().to_uppercase()).unwrap(), d);
    }

    #[test]
    fn invalid_hex_rejected() {
        assert!(Digest::from_hex("abcd").is_err());
        assert!(Digest::from_hex(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn bit_indexing_is_msb_first() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0b1000_0000;
        bytes[31] = 0b0000_0001;
        let d = Digest::from_bytes(bytes);
        assert!(d.bit(0));
        assert!(!d.bit(1));
        assert!(d.bit(255));
        assert!(!d.bit(254));
    }

    #[test]
    fn serializes_as_hex_string() {
        let d = Digest::from_bytes([0xab; 32]);
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(32)));
        let back: Digest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
    }

    #[test]
    fn short_hex_is_prefix() {
        let d = Digest::from_bytes([0x12; 32]);
        assert_eq!(d.short_hex(), "12121212");
        assert!(d.to_hex().starts_with(&d.short_hex()));
    }
}
