//! SHA-256 digests for artifact integrity checks.

use crate::error::{ResolveError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use subtle::ConstantTimeEq;

/// A SHA-256 digest, always exactly 32 bytes (64 hex digits).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sha256Digest([u8; 32]);

impl Sha256Digest {
    /// Digest used by release tables that have not been filled in yet.
    pub const PLACEHOLDER: Sha256Digest = Sha256Digest([0; 32]);

    /// Hash a byte slice.
    pub fn compute(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hasher.finalize().into())
    }

    /// Parse 64 hex digits (either case).
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.len() != 64 {
            return Err(ResolveError::Manifest(format!(
                "sha256 must be 64 hex digits, got {} characters",
                s.len()
            )));
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| ResolveError::Manifest(format!("sha256 {:?} is not hex: {}", s, e)))?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_placeholder(&self) -> bool {
        *self == Self::PLACEHOLDER
    }

    /// Compare against another digest without short-circuiting on the first
    /// differing byte.
    pub fn matches(&self, other: &Sha256Digest) -> bool {
        self.0[..].ct_eq(&other.0[..]).into()
    }
}

/// Check `bytes` against `expected`, failing with an integrity error that
/// names both digests.
pub fn verify(bytes: &[u8], expected: &Sha256Digest, url: &str) -> Result<()> {
    let actual = Sha256Digest::compute(bytes);
    if actual.matches(expected) {
        Ok(())
    } else {
        Err(ResolveError::Integrity {
            url: url.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}

impl fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sha256Digest({})", self)
    }
}

impl FromStr for Sha256Digest {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl Serialize for Sha256Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Sha256Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
