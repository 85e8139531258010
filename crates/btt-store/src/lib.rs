//! Backing-store contract and key layout for btt-setting.
//!
//! The source of truth is a Redis-compatible key-value store. This crate
//! names every key the system touches, defines the operations the rest of
//! the workspace needs from the store, and ships an in-memory backend.
//!
//! # Key Layout
//!
//! All keys live under one prefix `P` (default `btt-setting:`):
//!
//! - `P versions`: mapping `version → all-hash`
//! - `P rules:<all-hash>`: mapping `config-key → serialized rule list`
//! - `P values`: mapping `value-hash → canonical value text`
//! - `P history`: append-only list of history records
//! - `P updates`: log stream, one `data` field per entry
//!
//! # Design Rules
//!
//! 1. Values and rule-sets are written under content-addressed keys and are
//!    never mutated.
//! 2. The version pointer only moves through [`SettingStore::commit_version`],
//!    which also appends history and emits the stream event, atomically.
//! 3. The core never deletes from `values`.

pub mod cancel;
pub mod error;
pub mod keyspace;
pub mod memory;
pub mod script;
pub mod stream;
pub mod traits;

pub use cancel::{cancellable, Cancelled};
pub use error::{StoreError, StoreResult};
pub use keyspace::{current_prefix, set_prefix, Keyspace, DEFAULT_PREFIX};
pub use memory::InMemorySettingStore;
pub use script::{CasCommit, CommitOutcome, COMMIT_SCRIPT, VERSION_MISMATCH};
pub use stream::{StreamCursor, StreamEntry, StreamId};
pub use traits::SettingStore;
