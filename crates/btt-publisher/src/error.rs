use btt_rules::RuleError;
use btt_store::{Cancelled, StoreError};
use btt_types::Version;
use thiserror::Error;

/// Errors that can occur while publishing.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Another publisher moved the version pointer after this one read it.
    #[error("version mismatch on {version}: expected {expected:?}, found {actual:?}")]
    VersionMismatch {
        version: Version,
        expected: String,
        actual: String,
    },

    /// A raw-text input is not valid serialized text.
    #[error("invalid raw value for {key}: {reason}")]
    InvalidRawValue { key: String, reason: String },

    /// A value could not be serialized for hashing.
    #[error("cannot encode value for {key}: {reason}")]
    Encode { key: String, reason: String },

    /// The base rule-set could not be decoded, or the new one encoded.
    #[error("rule-set error: {0}")]
    Rules(#[from] RuleError),

    /// The version has never been published.
    #[error("version {0} has no published rule-set")]
    NoVersion(Version),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("operation cancelled")]
    Cancelled,
}

impl PublishError {
    /// Whether retrying against fresh base state may succeed.
    pub fn is_version_mismatch(&self) -> bool {
        matches!(self, Self::VersionMismatch { .. })
    }
}

impl From<Cancelled> for PublishError {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

pub type PublishResult<T> = Result<T, PublishError>;
