use std::collections::BTreeMap;
use std::sync::Arc;

use btt_crypto::hash_value;
use btt_rules::RuleSet;
use btt_store::{cancellable, CasCommit, CommitOutcome, Keyspace, SettingStore, StoreError};
use btt_types::{AllHash, HistoryRecord, Rule, UpdateEvent, ValueHash, Version};
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::PublisherConfig;
use crate::error::{PublishError, PublishResult};
use crate::request::PublishRequest;

/// Outcome of a successful publish.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishReceipt {
    pub version: Version,
    /// Pointer the publish started from; `None` for the first publish.
    pub base_hash: Option<AllHash>,
    pub all_hash: AllHash,
    /// Keys in the committed rule-set.
    pub keys: usize,
    /// Distinct values written in stage 1 (including ones already present).
    pub values_staged: usize,
}

/// Writer for one version.
#[derive(Clone)]
pub struct Publisher {
    store: Arc<dyn SettingStore>,
    version: Version,
    keyspace: Keyspace,
    stream_max_len: usize,
}

impl Publisher {
    pub fn new(store: Arc<dyn SettingStore>, version: Version) -> Self {
        Self::with_config(store, version, PublisherConfig::default())
    }

    pub fn with_config(store: Arc<dyn SettingStore>, version: Version, config: PublisherConfig) -> Self {
        Self {
            store,
            version,
            keyspace: config.keyspace.unwrap_or_else(Keyspace::current),
            stream_max_len: config.stream_max_len,
        }
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn keyspace(&self) -> &Keyspace {
        &self.keyspace
    }

    /// Apply `req` to the version's current rule-set and commit the result.
    ///
    /// Fails with [`PublishError::VersionMismatch`] when another publisher
    /// committed first. Stage-1 writes of a failed publish are left in place;
    /// they are content-addressed and unreferenced.
    pub async fn publish(
        &self,
        req: &PublishRequest,
        cancel: &CancellationToken,
    ) -> PublishResult<PublishReceipt> {
        cancellable(cancel, self.publish_inner(req)).await
    }

    async fn publish_inner(&self, req: &PublishRequest) -> PublishResult<PublishReceipt> {
        let base = self.current_pointer().await?;

        let mut current = match (&base, req.full_replace) {
            (Some(base), false) => {
                let fields = self.store.hash_get_all(&self.keyspace.rules(base)).await?;
                RuleSet::from_stored(fields)?
            }
            _ => RuleSet::new(),
        };

        for op in &req.deletes {
            match &op.tags {
                None => {
                    current.remove_key(&op.key);
                }
                Some(tags) => {
                    current.remove_exact(&op.key, tags);
                }
            }
        }

        let mut staged: BTreeMap<ValueHash, String> = BTreeMap::new();
        for (key, inputs) in &req.items {
            let mut rules = Vec::with_capacity(inputs.len());
            for input in inputs {
                let value = input.value.resolve(key)?;
                let (hash, bytes) = hash_value(&value).map_err(|e| PublishError::Encode {
                    key: key.clone(),
                    reason: e.to_string(),
                })?;
                let raw = String::from_utf8(bytes).map_err(|e| PublishError::Encode {
                    key: key.clone(),
                    reason: e.to_string(),
                })?;
                staged.insert(hash.clone(), raw);
                rules.push(Rule::new(input.tags.clone(), hash));
            }
            current.replace(key.clone(), rules);
        }

        let all_hash = current.all_hash()?;
        let stored_rules = current.to_stored()?;

        // Stage 1: content-addressed data.
        let values: Vec<(String, String)> = staged
            .iter()
            .map(|(hash, raw)| (hash.to_string(), raw.clone()))
            .collect();
        let created = self
            .store
            .hash_set_many_if_absent(&self.keyspace.values(), &values)
            .await?;
        if !stored_rules.is_empty() {
            self.store
                .hash_set_many(&self.keyspace.rules(&all_hash), &stored_rules)
                .await?;
        }
        debug!(
            version = self.version,
            all_hash = %all_hash,
            values = values.len(),
            created,
            keys = stored_rules.len(),
            "staged rule-set"
        );

        // Stage 2: move the pointer.
        let expected = base.as_ref().map(ToString::to_string).unwrap_or_default();
        let now = Utc::now().timestamp();
        let commit = CasCommit {
            versions_key: self.keyspace.versions(),
            history_key: self.keyspace.history(),
            updates_key: self.keyspace.updates(),
            version_field: Keyspace::version_field(self.version),
            expected: expected.clone(),
            new_hash: all_hash.to_string(),
            history_entry: encode(&HistoryRecord {
                version: self.version,
                all_hash: all_hash.clone(),
                timestamp: now,
            })?,
            event_data: encode(&UpdateEvent::publish(self.version, all_hash.clone(), now))?,
            stream_max_len: self.stream_max_len,
        };
        match self.store.commit_version(&commit).await? {
            CommitOutcome::Committed => {}
            CommitOutcome::VersionMismatch { current } => {
                return Err(PublishError::VersionMismatch {
                    version: self.version,
                    expected,
                    actual: current,
                });
            }
        }

        info!(
            version = self.version,
            base = %expected,
            all_hash = %all_hash,
            keys = current.len(),
            "publish committed"
        );
        Ok(PublishReceipt {
            version: self.version,
            base_hash: base,
            all_hash,
            keys: current.len(),
            values_staged: staged.len(),
        })
    }

    /// Ask every watcher of this version to reload, without moving the
    /// pointer.
    pub async fn request_reload(&self, cancel: &CancellationToken) -> PublishResult<AllHash> {
        cancellable(cancel, async {
            let all_hash = self
                .current_pointer()
                .await?
                .ok_or(PublishError::NoVersion(self.version))?;
            let event = UpdateEvent::reload(self.version, all_hash.clone(), Utc::now().timestamp());
            let id = self
                .store
                .stream_add(
                    &self.keyspace.updates(),
                    &[("data".to_string(), encode(&event)?)],
                    self.stream_max_len,
                )
                .await?;
            info!(version = self.version, all_hash = %all_hash, id = %id, "reload requested");
            Ok(all_hash)
        })
        .await
    }

    /// The newest `limit` history records across all versions, oldest first.
    pub async fn history(&self, limit: usize) -> PublishResult<Vec<HistoryRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let start = -(i64::try_from(limit).unwrap_or(i64::MAX));
        let entries = self
            .store
            .list_range(&self.keyspace.history(), start, -1)
            .await?;
        entries
            .iter()
            .map(|raw| {
                serde_json::from_str(raw).map_err(|e| {
                    PublishError::Store(StoreError::Malformed(format!("history record: {e}")))
                })
            })
            .collect()
    }

    /// The version's current all-hash, if it has been published.
    pub async fn current_pointer(&self) -> PublishResult<Option<AllHash>> {
        let raw = self
            .store
            .hash_get(&self.keyspace.versions(), &Keyspace::version_field(self.version))
            .await?;
        raw.filter(|s| !s.is_empty())
            .map(|s| {
                AllHash::from_hex(&s).map_err(|e| {
                    PublishError::Store(StoreError::Malformed(format!(
                        "version {} pointer {s:?}: {e}",
                        self.version
                    )))
                })
            })
            .transpose()
    }
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("version", &self.version)
            .field("prefix", &self.keyspace.prefix())
            .field("stream_max_len", &self.stream_max_len)
            .finish()
    }
}

fn encode<T: serde::Serialize>(value: &T) -> PublishResult<String> {
    serde_json::to_string(value).map_err(|e| PublishError::Encode {
        key: String::new(),
        reason: e.to_string(),
    })
}
