use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hash::AllHash;

/// Application-chosen release channel. Each version pins one all-hash.
pub type Version = i64;

/// Entry appended to the `history` list on every successful publish.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub version: Version,
    pub all_hash: AllHash,
    /// Unix seconds.
    pub timestamp: i64,
}

/// Kind of update announced on the `updates` stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// A publish moved the version pointer.
    Publish,
    /// Subscribers should reload without any pointer change.
    Reload,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Publish => "publish",
            Self::Reload => "reload",
        };
        f.write_str(s)
    }
}

/// Payload of the single `data` field on each stream entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateEvent {
    pub event: EventKind,
    pub version: Version,
    pub all_hash: AllHash,
    /// Unix seconds.
    pub timestamp: i64,
}

impl UpdateEvent {
    pub fn publish(version: Version, all_hash: AllHash, timestamp: i64) -> Self {
        Self {
            event: EventKind::Publish,
            version,
            all_hash,
            timestamp,
        }
    }

    pub fn reload(version: Version, all_hash: AllHash, timestamp: i64) -> Self {
        Self {
            event: EventKind::Reload,
            version,
            all_hash,
            timestamp,
        }
    }
}
