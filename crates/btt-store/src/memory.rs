use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::script::{CasCommit, CommitOutcome};
use crate::stream::{StreamCursor, StreamEntry, StreamId};
use crate::traits::SettingStore;

/// In-memory, `HashMap`-based setting store.
///
/// Intended for tests and embedding. Mappings, lists, and streams share one
/// mutex, which makes [`commit_version`](SettingStore::commit_version)
/// trivially atomic. Blocking stream reads park on a [`Notify`] that every
/// stream append wakes.
///
/// [`set_unavailable`](Self::set_unavailable) makes every operation fail with
/// a transport error until it is cleared.
pub struct InMemorySettingStore {
    state: Mutex<State>,
    appended: Notify,
    unavailable: AtomicBool,
}

#[derive(Default)]
struct State {
    hashes: HashMap<String, HashMap<String, String>>,
    lists: HashMap<String, Vec<String>>,
    streams: HashMap<String, Stream>,
}

#[derive(Default)]
struct Stream {
    entries: VecDeque<StreamEntry>,
    last_id: StreamId,
}

impl State {
    fn stream_add(
        &mut self,
        key: &str,
        fields: &[(String, String)],
        max_len: usize,
    ) -> StreamId {
        let stream = self.streams.entry(key.to_string()).or_default();
        let id = stream.last_id.next(now_ms());
        stream.last_id = id;
        stream.entries.push_back(StreamEntry {
            id,
            fields: fields.to_vec(),
        });
        while max_len > 0 && stream.entries.len() > max_len {
            stream.entries.pop_front();
        }
        id
    }

    fn stream_after(&self, key: &str, after: StreamId, count: usize) -> Vec<StreamEntry> {
        let Some(stream) = self.streams.get(key) else {
            return Vec::new();
        };
        stream
            .entries
            .iter()
            .filter(|e| e.id > after)
            .take(count.max(1))
            .cloned()
            .collect()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

impl InMemorySettingStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            appended: Notify::new(),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Simulate losing (or regaining) the connection to the store.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
        // Wake blocked readers so they observe the change.
        self.appended.notify_waiters();
    }

    /// Number of fields in a mapping.
    pub fn hash_len(&self, key: &str) -> usize {
        self.lock()
            .map(|s| s.hashes.get(key).map_or(0, HashMap::len))
            .unwrap_or(0)
    }

    /// Number of elements in a list.
    pub fn list_len(&self, key: &str) -> usize {
        self.lock()
            .map(|s| s.lists.get(key).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    /// Number of entries currently retained by a stream.
    pub fn stream_len(&self, key: &str) -> usize {
        self.lock()
            .map(|s| s.streams.get(key).map_or(0, |st| st.entries.len()))
            .unwrap_or(0)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|e| StoreError::Transport(format!("lock poisoned: {e}")))
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Transport("connection refused".into()));
        }
        Ok(())
    }

    fn resolve_cursor(&self, key: &str, cursor: StreamCursor) -> StoreResult<StreamId> {
        match cursor {
            StreamCursor::After(id) => Ok(id),
            StreamCursor::Latest => {
                let state = self.lock()?;
                Ok(state
                    .streams
                    .get(key)
                    .map(|s| s.last_id)
                    .unwrap_or_default())
            }
        }
    }

    fn read_after(&self, key: &str, after: StreamId, count: usize) -> StoreResult<Vec<StreamEntry>> {
        Ok(self.lock()?.stream_after(key, after, count))
    }
}

impl Default for InMemorySettingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SettingStore for InMemorySettingStore {
    async fn hash_get(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        self.check_available()?;
        let state = self.lock()?;
        Ok(state.hashes.get(key).and_then(|h| h.get(field)).cloned())
    }

    async fn hash_get_all(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        self.check_available()?;
        let state = self.lock()?;
        Ok(state.hashes.get(key).cloned().unwrap_or_default())
    }

    async fn hash_get_many(
        &self,
        key: &str,
        fields: &[String],
    ) -> StoreResult<Vec<Option<String>>> {
        self.check_available()?;
        let state = self.lock()?;
        let hash = state.hashes.get(key);
        Ok(fields
            .iter()
            .map(|f| hash.and_then(|h| h.get(f)).cloned())
            .collect())
    }

    async fn hash_set_many(&self, key: &str, entries: &[(String, String)]) -> StoreResult<()> {
        self.check_available()?;
        let mut state = self.lock()?;
        let hash = state.hashes.entry(key.to_string()).or_default();
        for (field, value) in entries {
            hash.insert(field.clone(), value.clone());
        }
        Ok(())
    }

    async fn hash_set_if_absent(&self, key: &str, field: &str, value: &str) -> StoreResult<bool> {
        self.check_available()?;
        let mut state = self.lock()?;
        let hash = state.hashes.entry(key.to_string()).or_default();
        if hash.contains_key(field) {
            return Ok(false);
        }
        hash.insert(field.to_string(), value.to_string());
        Ok(true)
    }

    async fn list_push(&self, key: &str, value: &str) -> StoreResult<u64> {
        self.check_available()?;
        let mut state = self.lock()?;
        let list = state.lists.entry(key.to_string()).or_default();
        list.push(value.to_string());
        Ok(list.len() as u64)
    }

    async fn list_range(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>> {
        self.check_available()?;
        let state = self.lock()?;
        let Some(list) = state.lists.get(key) else {
            return Ok(Vec::new());
        };
        let len = list.len() as i64;
        let resolve = |i: i64| if i < 0 { len + i } else { i };
        let start = resolve(start).max(0);
        let stop = resolve(stop).min(len - 1);
        if start > stop {
            return Ok(Vec::new());
        }
        Ok(list[start as usize..=stop as usize].to_vec())
    }

    async fn stream_add(
        &self,
        key: &str,
        fields: &[(String, String)],
        max_len: usize,
    ) -> StoreResult<StreamId> {
        self.check_available()?;
        let id = self.lock()?.stream_add(key, fields, max_len);
        self.appended.notify_waiters();
        Ok(id)
    }

    async fn stream_read(
        &self,
        key: &str,
        cursor: StreamCursor,
        block: Duration,
        count: usize,
    ) -> StoreResult<Vec<StreamEntry>> {
        self.check_available()?;
        let after = self.resolve_cursor(key, cursor)?;
        let deadline = Instant::now() + block;
        loop {
            let notified = self.appended.notified();
            tokio::pin!(notified);
            // Register before checking so an append in between is not lost.
            notified.as_mut().enable();

            let entries = self.read_after(key, after, count)?;
            if !entries.is_empty() || block.is_zero() {
                return Ok(entries);
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(Vec::new());
            }
            self.check_available()?;
        }
    }

    async fn commit_version(&self, commit: &CasCommit) -> StoreResult<CommitOutcome> {
        self.check_available()?;
        {
            let mut state = self.lock()?;
            let current = state
                .hashes
                .get(&commit.versions_key)
                .and_then(|h| h.get(&commit.version_field))
                .cloned()
                .unwrap_or_default();
            if current != commit.expected {
                debug!(
                    version = %commit.version_field,
                    expected = %commit.expected,
                    current = %current,
                    "commit rejected"
                );
                return Ok(CommitOutcome::VersionMismatch { current });
            }

            state
                .hashes
                .entry(commit.versions_key.clone())
                .or_default()
                .insert(commit.version_field.clone(), commit.new_hash.clone());
            state
                .lists
                .entry(commit.history_key.clone())
                .or_default()
                .push(commit.history_entry.clone());
            state.stream_add(
                &commit.updates_key,
                &[("data".to_string(), commit.event_data.clone())],
                commit.stream_max_len,
            );
        }
        self.appended.notify_waiters();
        Ok(CommitOutcome::Committed)
    }
}

impl std::fmt::Debug for InMemorySettingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (hashes, lists, streams) = self
            .lock()
            .map(|s| (s.hashes.len(), s.lists.len(), s.streams.len()))
            .unwrap_or_default();
        f.debug_struct("InMemorySettingStore")
            .field("hashes", &hashes)
            .field("lists", &lists)
            .field("streams", &streams)
            .finish()
    }
}
