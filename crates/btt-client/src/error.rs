use std::fmt;

use btt_store::{Cancelled, StoreError};
use thiserror::Error;

/// Why a lookup found nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MissReason {
    /// The snapshot has no rules for the key.
    UnknownKey,
    /// The key exists but no rule matched the caller's tags.
    NoMatchingRule,
}

impl fmt::Display for MissReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownKey => f.write_str("unknown key"),
            Self::NoMatchingRule => f.write_str("no matching rule"),
        }
    }
}

/// Errors surfaced by the read side.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("config not found: {key} ({reason})")]
    NotFound { key: String, reason: MissReason },

    /// The stored value could not be decoded as the requested type, or the
    /// caller's L1 holds the key under a different type.
    #[error("decode error for {key}: {reason}")]
    Decode { key: String, reason: String },

    /// Stored data breaks a publish invariant, e.g. a rule references a
    /// value that does not exist.
    #[error("internal inconsistency: {0}")]
    InternalInconsistency(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("operation cancelled")]
    Cancelled,
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<Cancelled> for ClientError {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
