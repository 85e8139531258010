use serde::{Deserialize, Serialize};

use crate::hash::ValueHash;
use crate::tag::{deserialize_tag_map, TagMap};

/// A single routing rule: when `tags` is a subset of the caller's tags, the
/// value identified by `value_hash` is selected.
///
/// Stored form: `{"tags":{...},"val_hash":"<hex16>"}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default, deserialize_with = "deserialize_tag_map")]
    pub tags: TagMap,
    #[serde(rename = "val_hash")]
    pub value_hash: ValueHash,
}

impl Rule {
    pub fn new(tags: TagMap, value_hash: ValueHash) -> Self {
        Self { tags, value_hash }
    }

    /// A rule with no tags matches every caller.
    pub fn is_default(&self) -> bool {
        self.tags.is_empty()
    }
}
