//! End-to-end scenarios across publisher, store, watcher, loader, and getter.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use btt_client::{Client, ClientOptions, WatchConfig};
use btt_crypto::hash_value;
use btt_publisher::{InputValue, PublishError, PublishRequest, Publisher, PublisherConfig, RuleInput};
use btt_store::{
    CasCommit, CommitOutcome, InMemorySettingStore, Keyspace, SettingStore, StoreResult,
    StreamCursor, StreamEntry, StreamId,
};
use btt_types::{tag_map, TagMap, Version};
use serde_json::json;
use tokio::sync::Barrier;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn keyspace() -> Keyspace {
    Keyspace::new("scenario")
}

fn fast_watch() -> WatchConfig {
    WatchConfig {
        block_timeout: Duration::from_millis(100),
        anti_entropy_interval: Duration::from_millis(300),
        error_backoff: Duration::from_millis(50),
    }
}

fn publisher(store: Arc<dyn SettingStore>, version: Version) -> Publisher {
    Publisher::with_config(
        store,
        version,
        PublisherConfig {
            keyspace: Some(keyspace()),
            ..Default::default()
        },
    )
}

async fn client(store: Arc<dyn SettingStore>, version: Version) -> Client {
    Client::with_options(
        store,
        version,
        ClientOptions {
            keyspace: Some(keyspace()),
            watch: fast_watch(),
        },
    )
    .await
    .unwrap()
}

fn spawn_watch(client: &Client, shutdown: &CancellationToken) -> tokio::task::JoinHandle<()> {
    let client = client.clone();
    let shutdown = shutdown.clone();
    tokio::spawn(async move {
        client.watch(shutdown).await.unwrap();
    })
}

async fn eventually_equals(client: &Client, tags: TagMap, key: &str, want: &str) {
    let mut getter = client.with_tags(tags);
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        if getter.get::<String>(key).ok().as_deref() == Some(want) {
            return;
        }
        assert!(Instant::now() < deadline, "{key} never became {want:?}");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn text(v: &str) -> InputValue {
    InputValue::Object(json!(v))
}

#[tokio::test]
async fn basic_routing() {
    init_tracing();
    let store: Arc<dyn SettingStore> = Arc::new(InMemorySettingStore::new());
    publisher(Arc::clone(&store), 1)
        .publish(
            &PublishRequest::new().upsert(
                "limit",
                vec![
                    RuleInput::json(tag_map([("city", "bj")]), json!(100)),
                    RuleInput::json(TagMap::new(), json!(200)),
                ],
            ),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let c = client(store, 1).await;
    let mut bj = c.with_tags(tag_map([("city", "bj"), ("uid", "123")]));
    assert_eq!(crate::get::<i64>(&mut bj, "limit").unwrap(), 100);
    let mut sh = c.with_tags(tag_map([("city", "sh")]));
    assert_eq!(crate::get::<i64>(&mut sh, "limit").unwrap(), 200);
}

#[tokio::test]
async fn gray_release_isolation() {
    init_tracing();
    let store: Arc<dyn SettingStore> = Arc::new(InMemorySettingStore::new());
    let cancel = CancellationToken::new();
    for version in [1, 2] {
        publisher(Arc::clone(&store), version)
            .publish(&PublishRequest::new().set("k", text("stable")), &cancel)
            .await
            .unwrap();
    }

    let stable = client(Arc::clone(&store), 1).await;
    let gray = client(Arc::clone(&store), 2).await;
    let shutdown = CancellationToken::new();
    let watchers = [spawn_watch(&stable, &shutdown), spawn_watch(&gray, &shutdown)];
    tokio::time::sleep(Duration::from_millis(50)).await;

    publisher(Arc::clone(&store), 2)
        .publish(&PublishRequest::new().set("k", text("gray")), &cancel)
        .await
        .unwrap();

    eventually_equals(&gray, TagMap::new(), "k", "gray").await;
    let mut g = stable.with_tags(TagMap::new());
    assert_eq!(g.get::<String>("k").unwrap(), "stable");

    shutdown.cancel();
    for w in watchers {
        w.await.unwrap();
    }
}

#[tokio::test]
async fn incremental_publish_reuses_values() {
    init_tracing();
    let store: Arc<dyn SettingStore> = Arc::new(InMemorySettingStore::new());
    let cancel = CancellationToken::new();
    let p = publisher(Arc::clone(&store), 1);
    p.publish(
        &PublishRequest::new()
            .set("k1", text("v1"))
            .set("k2", text("v2")),
        &cancel,
    )
    .await
    .unwrap();

    let c = client(Arc::clone(&store), 1).await;
    p.publish(&PublishRequest::new().set("k1", text("v1-new")), &cancel)
        .await
        .unwrap();

    let report = c.load(&cancel).await.unwrap().unwrap();
    assert_eq!(report.fetched, 1);
    assert_eq!(report.reused, 1);

    let mut g = c.with_tags(TagMap::new());
    assert_eq!(g.get::<String>("k1").unwrap(), "v1-new");
    assert_eq!(g.get::<String>("k2").unwrap(), "v2");
}

/// Holds every commit until `parties` publishers have reached it.
struct CommitGate {
    inner: InMemorySettingStore,
    barrier: Barrier,
}

#[async_trait]
impl SettingStore for CommitGate {
    async fn hash_get(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        self.inner.hash_get(key, field).await
    }
    async fn hash_get_all(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        self.inner.hash_get_all(key).await
    }
    async fn hash_get_many(&self, key: &str, fields: &[String]) -> StoreResult<Vec<Option<String>>> {
        self.inner.hash_get_many(key, fields).await
    }
    async fn hash_set_many(&self, key: &str, entries: &[(String, String)]) -> StoreResult<()> {
        self.inner.hash_set_many(key, entries).await
    }
    async fn hash_set_if_absent(&self, key: &str, field: &str, value: &str) -> StoreResult<bool> {
        self.inner.hash_set_if_absent(key, field, value).await
    }
    async fn list_push(&self, key: &str, value: &str) -> StoreResult<u64> {
        self.inner.list_push(key, value).await
    }
    async fn list_range(&self, key: &str, start: i64, stop: i64) -> StoreResult<Vec<String>> {
        self.inner.list_range(key, start, stop).await
    }
    async fn stream_add(
        &self,
        key: &str,
        fields: &[(String, String)],
        max_len: usize,
    ) -> StoreResult<StreamId> {
        self.inner.stream_add(key, fields, max_len).await
    }
    async fn stream_read(
        &self,
        key: &str,
        cursor: StreamCursor,
        block: Duration,
        count: usize,
    ) -> StoreResult<Vec<StreamEntry>> {
        self.inner.stream_read(key, cursor, block, count).await
    }
    async fn commit_version(&self, commit: &CasCommit) -> StoreResult<CommitOutcome> {
        self.barrier.wait().await;
        self.inner.commit_version(commit).await
    }
}

#[tokio::test]
async fn cas_conflict_has_one_winner() {
    init_tracing();
    let inner = InMemorySettingStore::new();
    let ks = keyspace();
    let gate = Arc::new(CommitGate {
        inner,
        barrier: Barrier::new(2),
    });
    // Both publishers read the same (absent) base before either commits.
    let a = publisher(gate.clone(), 1);
    let b = publisher(gate.clone(), 1);
    let ta = tokio::spawn(async move {
        a.publish(
            &PublishRequest::new().set("k", InputValue::Object(json!("from-a"))),
            &CancellationToken::new(),
        )
        .await
    });
    let tb = tokio::spawn(async move {
        b.publish(
            &PublishRequest::new().set("k", InputValue::Object(json!("from-b"))),
            &CancellationToken::new(),
        )
        .await
    });
    let results = [ta.await.unwrap(), tb.await.unwrap()];

    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    let loser = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert!(matches!(loser, PublishError::VersionMismatch { .. }));

    assert_eq!(
        gate.inner.hash_get(&ks.versions(), "1").await.unwrap().as_deref(),
        Some(winners[0].all_hash.as_str())
    );
    assert_eq!(gate.inner.list_len(&ks.history()), 1);
    // The loser's value is stored but unreferenced.
    assert_eq!(gate.inner.hash_len(&ks.values()), 2);
}

#[tokio::test]
async fn full_replace_evicts_unreachable_l2_entries() {
    init_tracing();
    let store: Arc<dyn SettingStore> = Arc::new(InMemorySettingStore::new());
    let cancel = CancellationToken::new();
    let p = publisher(Arc::clone(&store), 1);
    p.publish(&PublishRequest::new().set("k", text("original")), &cancel)
        .await
        .unwrap();

    let c = client(Arc::clone(&store), 1).await;
    let mut g = c.with_tags(TagMap::new());
    assert_eq!(g.get::<String>("k").unwrap(), "original");
    let (original, _) = hash_value(&json!("original")).unwrap();
    assert!(c.value_cache().value_hashes().contains(&original));

    p.publish(&PublishRequest::full_replace().set("other", text("x")), &cancel)
        .await
        .unwrap();
    let report = c.load(&cancel).await.unwrap().unwrap();
    assert_eq!(report.evicted, 1);

    assert!(!c.value_cache().value_hashes().contains(&original));
    for hash in c.value_cache().value_hashes() {
        assert!(c.snapshot().contains_value(hash.as_str()));
    }
    assert!(g.get::<String>("k").unwrap_err().is_not_found());
}

#[tokio::test]
async fn watcher_converges_on_latest_publish() {
    init_tracing();
    let store = Arc::new(InMemorySettingStore::new());
    let dyn_store: Arc<dyn SettingStore> = store.clone();
    let c = client(Arc::clone(&dyn_store), 1).await;
    let shutdown = CancellationToken::new();
    let watcher = spawn_watch(&c, &shutdown);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let cancel = CancellationToken::new();
    let p = publisher(Arc::clone(&dyn_store), 1);
    p.publish(&PublishRequest::new().set("k", text("first")), &cancel)
        .await
        .unwrap();
    p.publish(&PublishRequest::new().set("k", text("second")), &cancel)
        .await
        .unwrap();
    eventually_equals(&c, TagMap::new(), "k", "second").await;

    // Events published during an outage are lost to the watcher; the
    // anti-entropy tick still converges once the store is back.
    store.set_unavailable(true);
    tokio::time::sleep(Duration::from_millis(150)).await;
    store.set_unavailable(false);
    move_pointer_silently(&store, "k", "third").await;
    eventually_equals(&c, TagMap::new(), "k", "third").await;

    shutdown.cancel();
    watcher.await.unwrap();
}

/// Point version 1 at a one-key rule-set without emitting an event.
async fn move_pointer_silently(store: &InMemorySettingStore, key: &str, value: &str) {
    let ks = keyspace();
    let (hash, bytes) = hash_value(&json!(value)).unwrap();
    let mut rules = btt_rules::RuleSet::new();
    rules.replace(key, vec![btt_types::Rule::new(TagMap::new(), hash.clone())]);
    let all_hash = rules.all_hash().unwrap();
    store
        .hash_set_if_absent(&ks.values(), hash.as_str(), std::str::from_utf8(&bytes).unwrap())
        .await
        .unwrap();
    store
        .hash_set_many(&ks.rules(&all_hash), &rules.to_stored().unwrap())
        .await
        .unwrap();
    store
        .hash_set(&ks.versions(), "1", all_hash.as_str())
        .await
        .unwrap();
}

#[tokio::test]
async fn reload_request_reaches_watchers() {
    init_tracing();
    let store = Arc::new(InMemorySettingStore::new());
    let dyn_store: Arc<dyn SettingStore> = store.clone();
    let cancel = CancellationToken::new();
    let p = publisher(Arc::clone(&dyn_store), 1);
    p.publish(&PublishRequest::new().set("k", text("v1")), &cancel)
        .await
        .unwrap();

    // Anti-entropy too slow to matter within the test.
    let c = Client::with_options(
        Arc::clone(&dyn_store),
        1,
        ClientOptions {
            keyspace: Some(keyspace()),
            watch: WatchConfig {
                anti_entropy_interval: Duration::from_secs(600),
                ..fast_watch()
            },
        },
    )
    .await
    .unwrap();
    let shutdown = CancellationToken::new();
    let watcher = spawn_watch(&c, &shutdown);
    tokio::time::sleep(Duration::from_millis(50)).await;

    move_pointer_silently(&store, "k", "v2").await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    let mut g = c.with_tags(TagMap::new());
    assert_eq!(g.get::<String>("k").unwrap(), "v1");

    let announced = p.request_reload(&cancel).await.unwrap();
    assert_eq!(c.version(), 1);
    eventually_equals(&c, TagMap::new(), "k", "v2").await;
    assert_eq!(c.snapshot().all_hash.as_ref(), Some(&announced));

    // A reload is not a publish: history holds only the real commit.
    assert_eq!(p.history(10).await.unwrap().len(), 1);

    shutdown.cancel();
    watcher.await.unwrap();
}
