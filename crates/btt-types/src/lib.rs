//! Foundation types for btt-setting.
//!
//! Every other btt crate depends on `btt-types`.
//!
//! # Key Types
//!
//! - [`TagValue`] / [`TagMap`]: routing predicates on rules and callers
//! - [`Rule`]: a tag map paired with the hash of the value it selects
//! - [`ValueHash`]: 16-hex content hash of one value
//! - [`AllHash`]: 8-hex digest identifying a whole rule-set
//! - [`HistoryRecord`] / [`UpdateEvent`]: records written at commit time

pub mod error;
pub mod hash;
pub mod record;
pub mod rule;
pub mod tag;

pub use error::TypeError;
pub use hash::{AllHash, ValueHash};
pub use record::{EventKind, HistoryRecord, UpdateEvent, Version};
pub use rule::Rule;
pub use tag::{tag_map, tag_map_from_json, TagMap, TagValue};
