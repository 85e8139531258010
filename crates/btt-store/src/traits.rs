use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::script::{CasCommit, CommitOutcome};
use crate::stream::{StreamCursor, StreamEntry, StreamId};

/// Operations btt-setting needs from its backing store.
///
/// The shapes follow Redis hashes, lists, and streams. Implementations must
/// be thread-safe and must make [`commit_version`](Self::commit_version)
/// atomic with respect to every other operation on the same keys.
///
/// Transport failures surface as [`StoreError::Transport`](crate::StoreError::Transport)
/// and are passed through unchanged by callers.
#[async_trait]
pub trait SettingStore: Send + Sync {
    /// Read one field of a mapping. `Ok(None)` if the key or field is absent.
    async fn hash_get(&self, key: &str, field: &str) -> StoreResult<Option<String>>;

    /// Read every field of a mapping. Absent keys read as empty.
    async fn hash_get_all(&self, key: &str) -> StoreResult<HashMap<String, String>>;

    /// Read several fields of a mapping, positionally.
    async fn hash_get_many(&self, key: &str, fields: &[String])
        -> StoreResult<Vec<Option<String>>>;

    /// Write several fields of a mapping, overwriting existing values.
    async fn hash_set_many(&self, key: &str, entries: &[(String, String)]) -> StoreResult<()>;

    /// Write a field only if it is absent. Returns `true` if it was written.
    async fn hash_set_if_absent(&self, key: &str, field: &str, value: &str) -> StoreResult<bool>;

    /// Append to the tail of a list and return the new length.
    async fn list_push(&self, key: &str, value: &str) -> StoreResult<u64>;

    /// Read list elements `start..=stop`; negative indices count from the tail.
    async fn list_range(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>>;

    /// Append an entry to a stream, trimming it to roughly `max_len` entries.
    async fn stream_add(
        &self,
        key: &str,
        fields: &[(String, String)],
        max_len: usize,
    ) -> StoreResult<StreamId>;

    /// Read up to `count` entries after `cursor`, waiting at most `block` for
    /// one to arrive. An empty result means the wait timed out.
    async fn stream_read(
        &self,
        key: &str,
        cursor: StreamCursor,
        block: Duration,
        count: usize,
    ) -> StoreResult<Vec<StreamEntry>>;

    /// Atomically move a version pointer if it still holds the expected
    /// value, appending history and emitting the update event.
    async fn commit_version(&self, commit: &CasCommit) -> StoreResult<CommitOutcome>;

    /// Write one field of a mapping.
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> StoreResult<()> {
        self.hash_set_many(key, &[(field.to_string(), value.to_string())])
            .await
    }

    /// Write several fields, each only if absent. Returns how many were new.
    ///
    /// Default implementation issues one call per field. Backends may
    /// override to pipeline.
    async fn hash_set_many_if_absent(
        &self,
        key: &str,
        entries: &[(String, String)],
    ) -> StoreResult<usize> {
        let mut written = 0;
        for (field, value) in entries {
            if self.hash_set_if_absent(key, field, value).await? {
                written += 1;
            }
        }
        Ok(written)
    }
}
