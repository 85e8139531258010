//! Incremental snapshot loading.
//!
//! A load reads the version pointer, fetches the rule-set it names, and
//! assembles the values those rules reference. Values already present in the
//! current snapshot are reused by hash; only the rest are fetched. The new
//! snapshot is swapped in whole, then L2 is pruned to what it references.

use std::collections::HashMap;
use std::sync::Arc;

use btt_rules::RuleSet;
use btt_store::{cancellable, Keyspace};
use btt_types::{AllHash, ValueHash};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::client::Client;
use crate::error::{ClientError, ClientResult};
use crate::snapshot::Snapshot;

/// What a successful load installed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadReport {
    pub all_hash: AllHash,
    /// Configuration keys in the new snapshot.
    pub keys: usize,
    /// Values fetched from the store.
    pub fetched: usize,
    /// Values carried over from the previous snapshot.
    pub reused: usize,
    /// L2 entries dropped because nothing references them any more.
    pub evicted: usize,
}

impl Client {
    /// Reload this client's version from the store.
    ///
    /// Returns `Ok(None)` when the version has no pointer yet. Idempotent and
    /// safe to run concurrently with publishes; concurrent loads on the same
    /// client are serialized. Reads keep seeing the previous snapshot until
    /// the swap.
    pub async fn load(&self, cancel: &CancellationToken) -> ClientResult<Option<LoadReport>> {
        cancellable(cancel, async {
            let _guard = self.inner.reload_lock.lock().await;
            self.reload().await
        })
        .await
    }

    async fn reload(&self) -> ClientResult<Option<LoadReport>> {
        let inner = &self.inner;
        let version = inner.version;

        let pointer = inner
            .store
            .hash_get(&inner.keyspace.versions(), &Keyspace::version_field(version))
            .await?
            .filter(|p| !p.is_empty());
        let Some(pointer) = pointer else {
            debug!(version, "version not published yet");
            return Ok(None);
        };
        let all_hash = AllHash::from_hex(&pointer).map_err(|e| {
            ClientError::InternalInconsistency(format!(
                "version {version} points at {pointer:?}: {e}"
            ))
        })?;

        let fields = inner
            .store
            .hash_get_all(&inner.keyspace.rules(&all_hash))
            .await?;
        let rules = RuleSet::from_stored(fields).map_err(|e| {
            ClientError::InternalInconsistency(format!("rule-set {all_hash}: {e}"))
        })?;

        let prior = inner.snapshot.load_full();
        let mut values: HashMap<ValueHash, Arc<str>> = HashMap::new();
        let mut missing: Vec<ValueHash> = Vec::new();
        for hash in rules.value_hashes() {
            match prior.values.get(hash) {
                Some(raw) => {
                    values.insert(hash.clone(), Arc::clone(raw));
                }
                None => missing.push(hash.clone()),
            }
        }
        let reused = values.len();

        if !missing.is_empty() {
            let fields: Vec<String> = missing.iter().map(ToString::to_string).collect();
            let fetched = inner
                .store
                .hash_get_many(&inner.keyspace.values(), &fields)
                .await?;
            debug!(count = missing.len(), "fetched missing values");
            for (hash, raw) in missing.iter().zip(fetched) {
                let raw = raw.ok_or_else(|| {
                    ClientError::InternalInconsistency(format!(
                        "value {hash} referenced by rule-set {all_hash} is missing"
                    ))
                })?;
                values.insert(hash.clone(), Arc::from(raw));
            }
        }

        let keys = rules.len();
        let snapshot = Arc::new(Snapshot {
            version,
            all_hash: Some(all_hash.clone()),
            rules,
            values,
        });
        inner.snapshot.store(Arc::clone(&snapshot));

        let evicted = inner.values.retain_reachable(&snapshot);
        info!(
            version,
            all_hash = %all_hash,
            keys,
            fetched = missing.len(),
            reused,
            evicted,
            "config loaded"
        );

        Ok(Some(LoadReport {
            all_hash,
            keys,
            fetched: missing.len(),
            reused,
            evicted,
        }))
    }
}
