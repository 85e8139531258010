//! Process-wide cache of decoded values (L2).

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use btt_types::ValueHash;
use dashmap::DashMap;

use crate::snapshot::Snapshot;

/// A decoded value, type-erased.
pub type Decoded = Arc<dyn Any + Send + Sync>;

/// L2 key: a value hash plus the name of the type it was decoded into.
///
/// The same raw value decoded as two different types occupies two entries.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub value_hash: ValueHash,
    pub type_name: &'static str,
}

impl CacheKey {
    pub fn new(value_hash: ValueHash, type_name: &'static str) -> Self {
        Self {
            value_hash,
            type_name,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.value_hash, self.type_name)
    }
}

/// Concurrent map from [`CacheKey`] to decoded value.
///
/// Read-mostly: entries are inserted on decode misses and removed only by
/// [`retain_reachable`](Self::retain_reachable) after a reload.
#[derive(Default)]
pub struct ValueCache {
    entries: DashMap<CacheKey, Decoded>,
}

impl ValueCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<Decoded> {
        self.entries.get(key).map(|e| Arc::clone(e.value()))
    }

    pub fn insert(&self, key: CacheKey, value: Decoded) {
        self.entries.insert(key, value);
    }

    /// Insert, then drop the entry again if the live snapshot no longer
    /// references its value hash. Returns whether the entry was kept.
    ///
    /// The loader swaps the snapshot before pruning, so a decode that raced a
    /// reload either lands before the prune or sees the new snapshot here.
    pub fn insert_reachable(&self, key: CacheKey, value: Decoded, live: &ArcSwap<Snapshot>) -> bool {
        let hash = key.value_hash.clone();
        self.entries.insert(key.clone(), value);
        if live.load().contains_value(hash.as_str()) {
            return true;
        }
        self.entries.remove(&key);
        false
    }

    /// Drop every entry whose value hash the snapshot no longer references.
    /// Returns the number of entries removed.
    pub fn retain_reachable(&self, snapshot: &Snapshot) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|k, _| snapshot.contains_value(k.value_hash.as_str()));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct value hashes currently cached.
    pub fn value_hashes(&self) -> Vec<ValueHash> {
        let mut hashes: Vec<ValueHash> = self
            .entries
            .iter()
            .map(|e| e.key().value_hash.clone())
            .collect();
        hashes.sort();
        hashes.dedup();
        hashes
    }
}

impl fmt::Debug for ValueCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueCache")
            .field("entries", &self.entries.len())
            .finish()
    }
}
