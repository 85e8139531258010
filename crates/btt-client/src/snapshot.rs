use std::collections::HashMap;
use std::sync::Arc;

use btt_rules::RuleSet;
use btt_types::{AllHash, ValueHash, Version};

/// Immutable view of one version's configuration.
///
/// Built whole by the loader and never mutated afterwards. `values` holds the
/// raw canonical text of every value the rules reference.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub version: Version,
    /// `None` until the first successful load.
    pub all_hash: Option<AllHash>,
    pub rules: RuleSet,
    pub values: HashMap<ValueHash, Arc<str>>,
}

impl Snapshot {
    /// The snapshot a client starts with before anything is loaded.
    pub fn empty(version: Version) -> Self {
        Self {
            version,
            all_hash: None,
            rules: RuleSet::new(),
            values: HashMap::new(),
        }
    }

    /// Raw text of a value by hash.
    pub fn raw_value(&self, hash: &str) -> Option<&str> {
        self.values.get(hash).map(|v| &**v)
    }

    pub fn contains_value(&self, hash: &str) -> bool {
        self.values.contains_key(hash)
    }
}
