//! Per-caller typed reads.

use std::any::type_name;
use std::collections::HashMap;
use std::sync::Arc;

use btt_rules::match_rule;
use btt_types::{AllHash, TagMap};
use serde::de::DeserializeOwned;
use tracing::trace;

use crate::cache::{CacheKey, Decoded};
use crate::client::Client;
use crate::error::{ClientError, ClientResult, MissReason};

struct CacheEntry {
    value: Decoded,
    type_name: &'static str,
    /// Snapshot the entry was resolved against.
    snapshot_hash: Option<AllHash>,
}

/// A reader bound to one set of tags.
///
/// Owned by a single task. The L1 cache maps a configuration key to the
/// value it resolved to under the current snapshot; an entry is reused only
/// while the snapshot's all-hash is unchanged.
pub struct Getter {
    client: Client,
    tags: TagMap,
    l1: HashMap<String, CacheEntry>,
}

impl Getter {
    pub fn new(client: Client, tags: TagMap) -> Self {
        Self {
            client,
            tags,
            l1: HashMap::new(),
        }
    }

    pub fn tags(&self) -> &TagMap {
        &self.tags
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Rebind to new tags. Clears L1.
    pub fn update_tags(&mut self, tags: TagMap) {
        self.tags = tags;
        self.l1.clear();
    }

    /// Resolve `key` for this getter's tags and decode it as `T`.
    pub fn get<T>(&mut self, key: &str) -> ClientResult<T>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
    {
        self.get_shared::<T>(key).map(|v| (*v).clone())
    }

    /// Like [`get`](Self::get) but hands out the cached value without cloning.
    pub fn get_shared<T>(&mut self, key: &str) -> ClientResult<Arc<T>>
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        let type_name = type_name::<T>();
        let snapshot = self.client.inner.snapshot.load();

        if let Some(entry) = self.l1.get(key) {
            if entry.snapshot_hash == snapshot.all_hash {
                return downcast(key, Arc::clone(&entry.value), entry.type_name);
            }
        }

        let rules = snapshot.rules.get(key).ok_or_else(|| ClientError::NotFound {
            key: key.to_string(),
            reason: MissReason::UnknownKey,
        })?;
        let rule = match_rule(rules, &self.tags).ok_or_else(|| ClientError::NotFound {
            key: key.to_string(),
            reason: MissReason::NoMatchingRule,
        })?;
        let raw = snapshot.raw_value(rule.value_hash.as_str()).ok_or_else(|| {
            ClientError::InternalInconsistency(format!(
                "value {} for {key} missing from snapshot",
                rule.value_hash
            ))
        })?;

        let l2_key = CacheKey::new(rule.value_hash.clone(), type_name);
        let value: Decoded = match self.client.value_cache().get(&l2_key) {
            Some(value) => value,
            None => {
                let decoded: T = serde_json::from_str(raw).map_err(|e| ClientError::Decode {
                    key: key.to_string(),
                    reason: e.to_string(),
                })?;
                trace!(key, cache_key = %l2_key, "decoded value");
                let value: Decoded = Arc::new(decoded);
                self.client.value_cache().insert_reachable(
                    l2_key,
                    Arc::clone(&value),
                    &self.client.inner.snapshot,
                );
                value
            }
        };

        self.l1.insert(
            key.to_string(),
            CacheEntry {
                value: Arc::clone(&value),
                type_name,
                snapshot_hash: snapshot.all_hash.clone(),
            },
        );
        downcast(key, value, type_name)
    }
}

fn downcast<T>(key: &str, value: Decoded, cached_as: &'static str) -> ClientResult<Arc<T>>
where
    T: Send + Sync + 'static,
{
    value.downcast::<T>().map_err(|_| ClientError::Decode {
        key: key.to_string(),
        reason: format!(
            "cached as {cached_as}, requested as {}",
            type_name::<T>()
        ),
    })
}

impl std::fmt::Debug for Getter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Getter")
            .field("tags", &self.tags)
            .field("l1", &self.l1.len())
            .finish()
    }
}

/// Typed lookup through `getter`.
pub fn get<T>(getter: &mut Getter, key: &str) -> ClientResult<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    getter.get(key)
}
