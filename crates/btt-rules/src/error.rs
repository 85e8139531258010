//! Error types for rule-set operations.

use btt_crypto::HashError;
use thiserror::Error;

/// Errors that can occur while decoding, encoding, or hashing a rule-set.
#[derive(Debug, Error)]
pub enum RuleError {
    /// A stored rule list could not be decoded.
    #[error("corrupt rule list for key {key}: {reason}")]
    Decode { key: String, reason: String },

    /// A rule list could not be serialized.
    #[error("cannot encode rule list for key {key}: {reason}")]
    Encode { key: String, reason: String },

    #[error("hash error: {0}")]
    Hash(#[from] HashError),
}

/// Convenience type alias for rule-set operations.
pub type Result<T> = std::result::Result<T, RuleError>;
