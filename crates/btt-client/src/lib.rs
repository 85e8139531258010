//! Read side of btt-setting.
//!
//! A [`Client`] holds one immutable [`Snapshot`] of a version's rule-set
//! behind an atomically swappable pointer. The loader builds replacement
//! snapshots off to the side and swaps them in whole; the watcher tails the
//! update stream and triggers the loader. Reads never block.
//!
//! Typed reads go through a per-caller [`Getter`], which owns an L1 cache
//! keyed by configuration key. Decoded values are also shared process-wide
//! in an L2 cache keyed by value hash and decode type, pruned after every
//! reload to what the new snapshot still references.
//!
//! ```rust,ignore
//! let client = Client::new(store, 1).await?;
//! tokio::spawn({
//!     let client = client.clone();
//!     async move { client.watch(shutdown).await }
//! });
//!
//! let mut getter = client.with_tags(tag_map([("city", "bj")]));
//! let limit: i64 = get(&mut getter, "limit")?;
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod getter;
pub mod loader;
pub mod snapshot;
pub mod watcher;

pub use cache::{CacheKey, ValueCache};
pub use client::{Client, ClientOptions};
pub use config::WatchConfig;
pub use error::{ClientError, ClientResult, MissReason};
pub use getter::{get, Getter};
pub use loader::LoadReport;
pub use snapshot::Snapshot;
