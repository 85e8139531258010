//! Tag-routed dynamic configuration.
//!
//! Publishers roll a version's rule-set forward with an atomic
//! compare-and-swap; clients hold an immutable snapshot of it, refreshed by a
//! stream watcher, and resolve typed values by matching their tags against
//! each key's ordered rules.
//!
//! This crate is the main entry point for applications. It re-exports the
//! public API of the component crates and adds [`Setting`], which binds a
//! backing store to one [`SettingConfig`].
//!
//! ```rust,ignore
//! let setting = Setting::new(store, SettingConfig::from_toml_str(text)?);
//! setting
//!     .publisher(1)
//!     .publish(
//!         &PublishRequest::new().upsert("limit", vec![
//!             RuleInput::json(tag_map([("city", "bj")]), json!(100)),
//!             RuleInput::json(TagMap::new(), json!(200)),
//!         ]),
//!         &cancel,
//!     )
//!     .await?;
//!
//! let client = setting.client(1).await?;
//! let limit: i64 = get(&mut client.with_tags(tag_map([("city", "bj")])), "limit")?;
//! ```

pub mod config;
pub mod error;
pub mod setting;

#[cfg(test)]
mod scenarios;

pub use config::{PublisherSection, SettingConfig, WatchSection};
pub use error::{SettingError, SettingResult};
pub use setting::Setting;

pub use btt_client::{
    get, CacheKey, Client, ClientError, ClientOptions, ClientResult, Getter, LoadReport,
    MissReason, Snapshot, ValueCache, WatchConfig,
};
pub use btt_crypto::{hash_rule_set, hash_value, EMPTY_ALL_HASH};
pub use btt_publisher::{
    DeleteOp, InputValue, PublishError, PublishReceipt, PublishRequest, PublishResult, Publisher,
    PublisherConfig, RuleInput,
};
pub use btt_rules::{match_rule, RuleSet};
pub use btt_store::{
    current_prefix, set_prefix, InMemorySettingStore, Keyspace, SettingStore, StoreError,
    COMMIT_SCRIPT, DEFAULT_PREFIX,
};
pub use btt_types::{
    tag_map, AllHash, EventKind, HistoryRecord, Rule, TagMap, TagValue, TypeError, UpdateEvent,
    ValueHash, Version,
};
pub use tokio_util::sync::CancellationToken;
