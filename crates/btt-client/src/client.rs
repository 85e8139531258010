use std::sync::Arc;

use arc_swap::ArcSwap;
use btt_store::{Keyspace, SettingStore};
use btt_types::{TagMap, Version};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::cache::ValueCache;
use crate::config::WatchConfig;
use crate::error::ClientResult;
use crate::getter::Getter;
use crate::snapshot::Snapshot;

/// Construction options for a [`Client`].
#[derive(Clone, Debug, Default)]
pub struct ClientOptions {
    /// Key layout; defaults to the process-wide prefix at construction time.
    pub keyspace: Option<Keyspace>,
    pub watch: WatchConfig,
}

/// Long-lived, shareable handle on one version's configuration.
///
/// Cloning is cheap; all clones share the snapshot pointer and the L2 cache.
#[derive(Clone)]
pub struct Client {
    pub(crate) inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    pub(crate) store: Arc<dyn SettingStore>,
    pub(crate) keyspace: Keyspace,
    pub(crate) version: Version,
    pub(crate) watch: WatchConfig,
    pub(crate) snapshot: ArcSwap<Snapshot>,
    pub(crate) values: ValueCache,
    /// Serializes reloads so the snapshot pointer has a single writer.
    pub(crate) reload_lock: Mutex<()>,
}

impl Client {
    /// Create a client for `version` and load it once.
    ///
    /// A version that has never been published is not an error: the client
    /// starts empty and picks up the first publish through [`load`](Self::load)
    /// or [`watch`](Self::watch).
    pub async fn new(store: Arc<dyn SettingStore>, version: Version) -> ClientResult<Self> {
        Self::with_options(store, version, ClientOptions::default()).await
    }

    /// Create a client with explicit options and load it once.
    pub async fn with_options(
        store: Arc<dyn SettingStore>,
        version: Version,
        options: ClientOptions,
    ) -> ClientResult<Self> {
        let client = Self::unloaded(store, version, options);
        client.load(&CancellationToken::new()).await?;
        Ok(client)
    }

    /// Create a client without touching the store.
    pub fn unloaded(store: Arc<dyn SettingStore>, version: Version, options: ClientOptions) -> Self {
        let inner = ClientInner {
            store,
            keyspace: options.keyspace.unwrap_or_else(Keyspace::current),
            version,
            watch: options.watch.normalized(),
            snapshot: ArcSwap::from_pointee(Snapshot::empty(version)),
            values: ValueCache::new(),
            reload_lock: Mutex::new(()),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// A per-caller reader bound to `tags`.
    pub fn with_tags(&self, tags: TagMap) -> Getter {
        Getter::new(self.clone(), tags)
    }

    /// The snapshot currently installed.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.snapshot.load_full()
    }

    pub fn version(&self) -> Version {
        self.inner.version
    }

    pub fn keyspace(&self) -> &Keyspace {
        &self.inner.keyspace
    }

    /// Number of decoded values held in L2.
    pub fn l2_len(&self) -> usize {
        self.inner.values.len()
    }

    /// The process-wide decoded-value cache shared by every getter.
    pub fn value_cache(&self) -> &ValueCache {
        &self.inner.values
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.inner.snapshot.load();
        f.debug_struct("Client")
            .field("version", &self.inner.version)
            .field("prefix", &self.inner.keyspace.prefix())
            .field("all_hash", &snapshot.all_hash)
            .field("l2", &self.inner.values.len())
            .finish()
    }
}
