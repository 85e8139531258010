//! Update-stream watcher with periodic anti-entropy.
//!
//! The watcher tails the `updates` stream and reloads when an event names
//! this client's version. Stream reads block for a bounded time, so the loop
//! also wakes on a fixed interval and compares the remote version pointer to
//! the local snapshot. That comparison recovers from events lost while the
//! store was unreachable or trimmed off the stream.

use btt_store::{Keyspace, StreamCursor, StreamEntry};
use btt_types::{AllHash, UpdateEvent};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::Client;
use crate::error::{ClientError, ClientResult};

impl Client {
    /// Run the watcher until `shutdown` fires.
    ///
    /// Errors from the store or the loader are logged and retried; the only
    /// way out is cancellation, which returns `Ok(())`.
    pub async fn watch(&self, shutdown: CancellationToken) -> ClientResult<()> {
        let watch = &self.inner.watch;
        let stream = self.inner.keyspace.updates();
        info!(
            version = self.inner.version,
            stream = %stream,
            block_ms = watch.block_timeout.as_millis() as u64,
            anti_entropy_ms = watch.anti_entropy_interval.as_millis() as u64,
            "watcher started"
        );

        self.check_consistency(&shutdown).await;

        let period = watch.anti_entropy_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cursor = StreamCursor::Latest;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!(version = self.inner.version, "watcher stopped");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    self.check_consistency(&shutdown).await;
                }
                read = self.inner.store.stream_read(&stream, cursor, watch.block_timeout, 1) => {
                    match read {
                        Ok(entries) => {
                            for entry in entries {
                                cursor = StreamCursor::After(entry.id);
                                self.handle_entry(&entry, &shutdown).await;
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "update stream read failed");
                            tokio::select! {
                                _ = shutdown.cancelled() => {}
                                _ = tokio::time::sleep(watch.error_backoff) => {}
                            }
                        }
                    }
                }
            }
        }
    }

    async fn handle_entry(&self, entry: &StreamEntry, shutdown: &CancellationToken) {
        let Some(data) = entry.field("data") else {
            debug!(id = %entry.id, "stream entry without data field");
            return;
        };
        let event: UpdateEvent = match serde_json::from_str(data) {
            Ok(event) => event,
            Err(e) => {
                warn!(id = %entry.id, error = %e, "undecodable update event");
                return;
            }
        };
        if event.version != self.inner.version {
            return;
        }
        debug!(
            id = %entry.id,
            event = %event.event,
            all_hash = %event.all_hash,
            "update event"
        );
        self.reload_logged(shutdown).await;
    }

    /// Reload when the remote pointer exists and differs from the local one.
    async fn check_consistency(&self, shutdown: &CancellationToken) {
        let remote = self
            .inner
            .store
            .hash_get(
                &self.inner.keyspace.versions(),
                &Keyspace::version_field(self.inner.version),
            )
            .await;
        let remote = match remote {
            Ok(Some(remote)) if !remote.is_empty() => remote,
            Ok(_) => return,
            Err(e) => {
                warn!(error = %e, "version pointer check failed");
                return;
            }
        };
        let local = self.snapshot().all_hash.clone();
        if local.as_ref().map(AllHash::as_str) == Some(remote.as_str()) {
            return;
        }
        info!(
            version = self.inner.version,
            local = ?local.as_ref().map(AllHash::as_str),
            remote = %remote,
            "version pointer drifted, reloading"
        );
        self.reload_logged(shutdown).await;
    }

    async fn reload_logged(&self, shutdown: &CancellationToken) {
        match self.load(shutdown).await {
            Ok(_) | Err(ClientError::Cancelled) => {}
            Err(e) => warn!(version = self.inner.version, error = %e, "reload failed"),
        }
    }
}
