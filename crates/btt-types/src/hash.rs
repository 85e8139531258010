use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Content hash of a single configuration value.
///
/// The first 16 hex characters of the SHA-256 digest over the value's
/// canonical serialization. The truncation length is part of the on-store
/// contract: values written by any publisher live under this key in the
/// `values` mapping.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ValueHash(String);

impl ValueHash {
    /// Number of hex characters kept from the digest.
    pub const HEX_LEN: usize = 16;

    /// Truncate a full digest into a value hash.
    pub fn from_digest(digest: &[u8; 32]) -> Self {
        Self(hex::encode(&digest[..Self::HEX_LEN / 2]))
    }

    /// Parse from a hex string, checking length and alphabet.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        validate_hex(s, Self::HEX_LEN)?;
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// The hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ValueHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueHash({})", self.0)
    }
}

impl fmt::Display for ValueHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ValueHash {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ValueHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ValueHash {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<ValueHash> for String {
    fn from(h: ValueHash) -> Self {
        h.0
    }
}

/// Digest identifying a whole rule-set.
///
/// The first 8 hex characters of the SHA-256 digest over every key's
/// serialized rule list, fed in lexicographic key order. A version pointer
/// stores one of these; the rule-set lives under `rules:<all-hash>`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AllHash(String);

impl AllHash {
    /// Number of hex characters kept from the digest.
    pub const HEX_LEN: usize = 8;

    /// Truncate a full digest into an all-hash.
    pub fn from_digest(digest: &[u8; 32]) -> Self {
        Self(hex::encode(&digest[..Self::HEX_LEN / 2]))
    }

    /// Parse from a hex string, checking length and alphabet.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        validate_hex(s, Self::HEX_LEN)?;
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// The hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AllHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AllHash({})", self.0)
    }
}

impl fmt::Display for AllHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AllHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AllHash {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::from_hex(&s)
    }
}

impl From<AllHash> for String {
    fn from(h: AllHash) -> Self {
        h.0
    }
}

fn validate_hex(s: &str, expected: usize) -> Result<(), TypeError> {
    if s.len() != expected {
        return Err(TypeError::InvalidLength {
            expected,
            actual: s.len(),
        });
    }
    if !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(TypeError::InvalidHex(s.to_string()));
    }
    Ok(())
}
