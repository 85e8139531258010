//! The atomic compare-and-swap commit.
//!
//! A publish becomes visible in one step: the version pointer moves, a
//! history record is appended, and an update event is emitted, all or
//! nothing. A Redis-backed [`SettingStore`](crate::SettingStore) runs
//! [`COMMIT_SCRIPT`] with [`CasCommit::keys`] and [`CasCommit::args`]; other
//! backends reproduce the same semantics under their own atomicity.

/// Error name the commit script raises when the pointer moved.
pub const VERSION_MISMATCH: &str = "version_mismatch";

/// Server-side commit script.
///
/// `KEYS = [versions, history, updates]`,
/// `ARGV = [version, expected-hash, new-hash, history-json, event-json, stream-max-len]`.
/// An absent pointer compares equal to the empty string.
pub const COMMIT_SCRIPT: &str = r#"
local versionKey = KEYS[1]
local historyKey = KEYS[2]
local streamKey = KEYS[3]

local version = ARGV[1]
local oldHash = ARGV[2]
local newHash = ARGV[3]
local historyJSON = ARGV[4]
local streamData = ARGV[5]
local maxLen = ARGV[6]

local currentHash = redis.call('HGET', versionKey, version)
if currentHash == false then
    currentHash = ""
end

if currentHash ~= oldHash then
    return redis.error_reply('version_mismatch: ' .. currentHash .. ' != ' .. oldHash)
end

redis.call('HSET', versionKey, version, newHash)
redis.call('RPUSH', historyKey, historyJSON)
redis.call('XADD', streamKey, 'MAXLEN', '~', maxLen, '*', 'data', streamData)

return "OK"
"#;

/// Inputs of one atomic commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CasCommit {
    pub versions_key: String,
    pub history_key: String,
    pub updates_key: String,
    /// Field of the version inside `versions_key`.
    pub version_field: String,
    /// Pointer value the publisher started from; empty when absent.
    pub expected: String,
    pub new_hash: String,
    /// Serialized history record.
    pub history_entry: String,
    /// Serialized update event, written as the stream's `data` field.
    pub event_data: String,
    /// Approximate cap on the stream length.
    pub stream_max_len: usize,
}

impl CasCommit {
    /// Script `KEYS`.
    pub fn keys(&self) -> [&str; 3] {
        [&self.versions_key, &self.history_key, &self.updates_key]
    }

    /// Script `ARGV`.
    pub fn args(&self) -> [String; 6] {
        [
            self.version_field.clone(),
            self.expected.clone(),
            self.new_hash.clone(),
            self.history_entry.clone(),
            self.event_data.clone(),
            self.stream_max_len.to_string(),
        ]
    }
}

/// Result of a commit attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// Another writer moved the pointer first. `current` is what it holds
    /// now (empty when absent).
    VersionMismatch { current: String },
}

impl CommitOutcome {
    /// Interpret an error reply from [`COMMIT_SCRIPT`].
    ///
    /// Returns `None` when the reply is not a version mismatch.
    pub fn from_script_error(message: &str) -> Option<Self> {
        let rest = message.trim().strip_prefix(VERSION_MISMATCH)?;
        let rest = rest.strip_prefix(':').unwrap_or(rest).trim_start();
        let current = rest
            .split_once(" != ")
            .map(|(cur, _)| cur)
            .unwrap_or(rest)
            .trim()
            .to_string();
        Some(Self::VersionMismatch { current })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit() -> CasCommit {
        CasCommit {
            versions_key: "p:versions".into(),
            history_key: "p:history".into(),
            updates_key: "p:updates".into(),
            version_field: "1".into(),
            expected: String::new(),
            new_hash: "abcd1234".into(),
            history_entry: "{}".into(),
            event_data: "{}".into(),
            stream_max_len: 1000,
        }
    }

    #[test]
    fn keys_and_args_follow_script_layout() {
        let c = commit();
        assert_eq!(c.keys(), ["p:versions", "p:history", "p:updates"]);
        let args = c.args();
        assert_eq!(args[0], "1");
        assert_eq!(args[1], "");
        assert_eq!(args[2], "abcd1234");
        assert_eq!(args[5], "1000");
    }

    #[test]
    fn script_mentions_every_step() {
        for cmd in ["HGET", "HSET", "RPUSH", "XADD", "MAXLEN"] {
            assert!(COMMIT_SCRIPT.contains(cmd), "missing {cmd}");
        }
        assert!(COMMIT_SCRIPT.contains(VERSION_MISMATCH));
    }

    #[test]
    fn parses_mismatch_reply() {
        assert_eq!(
            CommitOutcome::from_script_error("version_mismatch: 11112222 != 33334444"),
            Some(CommitOutcome::VersionMismatch {
                current: "11112222".into()
            })
        );
        assert_eq!(
            CommitOutcome::from_script_error("version_mismatch:  != 33334444"),
            Some(CommitOutcome::VersionMismatch {
                current: String::new()
            })
        );
        assert_eq!(CommitOutcome::from_script_error("ERR unknown"), None);
    }
}
