//! Identity and content-addressing primitives.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Raw 256-bit content hash, used for `ProviderData`/`RawDefinition`
/// content comparison and as the building block of `Fingerprint`.
pub type ContentHash = [u8; 32];

/// Compute the SHA-256 hash of arbitrary bytes.
pub fn compute_content_hash(content: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// Unique identifier for one in-flight lookup request.
///
/// Threaded through the pipeline, the state tracker, and the SSE driver so
/// that logs, cancellation, and progress events can all be correlated.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RequestId({})", self.0)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::from_str(s).map(Self)
    }
}

impl Serialize for RequestId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RequestId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Uuid::deserialize(deserializer).map(Self)
    }
}

/// A 256-bit content-addressing fingerprint, rendered as lowercase hex.
///
/// Per §3, `fingerprint = H(provider_set, raw_content_hashes,
/// model_info.identity, pipeline_version)`. Two fingerprints are equal iff
/// all those inputs were equal, which is the equality contract the whole
/// cache/versioning layer (§4.1) relies on.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(transparent)]
pub struct Fingerprint(#[cfg_attr(feature = "openapi", schema(value_type = String))] ContentHash);

impl Fingerprint {
    pub fn from_hash(hash: ContentHash) -> Self {
        Self(hash)
    }

    /// Build a fingerprint from a canonical ordered list of byte slices.
    /// Order matters: callers are responsible for sorting anything that
    /// should be order-independent (e.g. `provider_set`) before calling.
    pub fn compute<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            // length-prefix each part so that ["ab", "c"] != ["a", "bc"]
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part);
        }
        let result = hasher.finalize();
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&result);
        Self(hash)
    }

    pub fn as_bytes(&self) -> &ContentHash {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Fingerprint {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        let mut hash = [0u8; 32];
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        hash.copy_from_slice(&bytes);
        Ok(Self(hash))
    }
}

/// Cache key, always the hex encoding of a 256-bit hash over a canonicalized
/// argument tuple. See `lex_cache::key` for the construction (§4.1 "Keys").
pub type CacheKey = String;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_hex_roundtrips() {
        let fp = Fingerprint::compute([b"a".as_slice(), b"b".as_slice()]);
        let hex = fp.to_hex();
        let parsed: Fingerprint = hex.parse().unwrap();
        assert_eq!(fp, parsed);
    }

    #[test]
    fn fingerprint_is_sensitive_to_part_boundaries() {
        let a = Fingerprint::compute([b"ab".as_slice(), b"c".as_slice()]);
        let b = Fingerprint::compute([b"a".as_slice(), b"bc".as_slice()]);
        assert_ne!(a, b);
    }

    #[test]
    fn fingerprint_equal_inputs_equal_fingerprint() {
        let a = Fingerprint::compute([b"x".as_slice(), b"y".as_slice()]);
        let b = Fingerprint::compute([b"x".as_slice(), b"y".as_slice()]);
        assert_eq!(a, b);
    }
}
