//! The key → rule-list mapping that a single all-hash identifies.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use btt_crypto::hash_rule_set;
use btt_types::{AllHash, Rule, TagMap, ValueHash};

use crate::error::{Result, RuleError};
use crate::matcher::tags_exact;

/// A complete rule-set, ordered by configuration key.
///
/// Stored as one mapping per all-hash: `config-key → serialized rule list`.
/// Keys iterate in lexicographic order, which is the order the all-hash is
/// computed in.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RuleSet {
    rules: BTreeMap<String, Vec<Rule>>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the stored mapping fetched from `rules:<all-hash>`.
    ///
    /// A `null` list decodes as a key with no rules.
    pub fn from_stored(fields: HashMap<String, String>) -> Result<Self> {
        let mut rules = BTreeMap::new();
        for (key, blob) in fields {
            let list: Option<Vec<Rule>> =
                serde_json::from_str(&blob).map_err(|e| RuleError::Decode {
                    key: key.clone(),
                    reason: e.to_string(),
                })?;
            rules.insert(key, list.unwrap_or_default());
        }
        Ok(Self { rules })
    }

    /// Encode every key's rule list into its stored text form.
    pub fn to_stored(&self) -> Result<Vec<(String, String)>> {
        self.rules
            .iter()
            .map(|(key, list)| {
                let blob = serde_json::to_string(list).map_err(|e| RuleError::Encode {
                    key: key.clone(),
                    reason: e.to_string(),
                })?;
                Ok((key.clone(), blob))
            })
            .collect()
    }

    /// Rules for `key`, in priority order.
    pub fn get(&self, key: &str) -> Option<&[Rule]> {
        self.rules.get(key).map(Vec::as_slice)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.rules.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Rule])> {
        self.rules.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Replace a key's rule list wholesale.
    pub fn replace(&mut self, key: impl Into<String>, rules: Vec<Rule>) {
        self.rules.insert(key.into(), rules);
    }

    /// Drop a key entirely. Returns `true` if it existed.
    pub fn remove_key(&mut self, key: &str) -> bool {
        self.rules.remove(key).is_some()
    }

    /// Drop the rules of `key` whose tags exactly equal `tags`.
    ///
    /// The key itself is removed once its list becomes empty. Returns the
    /// number of rules removed.
    pub fn remove_exact(&mut self, key: &str, tags: &TagMap) -> usize {
        let Some(list) = self.rules.get_mut(key) else {
            return 0;
        };
        let before = list.len();
        list.retain(|r| !tags_exact(&r.tags, tags));
        let removed = before - list.len();
        if list.is_empty() {
            self.rules.remove(key);
        }
        removed
    }

    /// Every value hash referenced by any rule.
    pub fn value_hashes(&self) -> BTreeSet<&ValueHash> {
        self.rules
            .values()
            .flat_map(|list| list.iter().map(|r| &r.value_hash))
            .collect()
    }

    /// Digest identifying this rule-set.
    pub fn all_hash(&self) -> Result<AllHash> {
        Ok(hash_rule_set(&self.rules)?)
    }

    pub fn as_map(&self) -> &BTreeMap<String, Vec<Rule>> {
        &self.rules
    }

    pub fn into_map(self) -> BTreeMap<String, Vec<Rule>> {
        self.rules
    }
}

impl From<BTreeMap<String, Vec<Rule>>> for RuleSet {
    fn from(rules: BTreeMap<String, Vec<Rule>>) -> Self {
        Self { rules }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use btt_crypto::EMPTY_ALL_HASH;
    use btt_types::{tag_map, TagValue};

    fn hash(n: u8) -> ValueHash {
        ValueHash::from_hex(&format!("{n:016x}")).unwrap()
    }

    fn sample() -> RuleSet {
        let mut set = RuleSet::new();
        set.replace(
            "limit",
            vec![
                Rule::new(tag_map([("city", "bj")]), hash(1)),
                Rule::new(TagMap::new(), hash(2)),
            ],
        );
        set.replace("flag", vec![Rule::new(TagMap::new(), hash(3))]);
        set
    }

    #[test]
    fn stored_roundtrip_preserves_order_within_key() {
        let set = sample();
        let stored: HashMap<String, String> = set.to_stored().unwrap().into_iter().collect();
        assert_eq!(
            stored["limit"],
            r#"[{"tags":{"city":"bj"},"val_hash":"0000000000000001"},{"tags":{},"val_hash":"0000000000000002"}]"#
        );
        let back = RuleSet::from_stored(stored).unwrap();
        assert_eq!(back, set);
        assert_eq!(back.all_hash().unwrap(), set.all_hash().unwrap());
    }

    #[test]
    fn corrupt_blob_names_the_key() {
        let mut stored = HashMap::new();
        stored.insert("broken".to_string(), "{not json".to_string());
        match RuleSet::from_stored(stored) {
            Err(RuleError::Decode { key, .. }) => assert_eq!(key, "broken"),
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn null_blob_is_a_key_without_rules() {
        let mut stored = HashMap::new();
        stored.insert("empty".to_string(), "null".to_string());
        let set = RuleSet::from_stored(stored).unwrap();
        assert_eq!(set.get("empty"), Some(&[][..]));
    }

    #[test]
    fn remove_exact_keeps_other_rules() {
        let mut set = sample();
        assert_eq!(set.remove_exact("limit", &tag_map([("city", "bj")])), 1);
        let rules = set.get("limit").unwrap();
        assert_eq!(rules.len(), 1);
        assert!(rules[0].is_default());
    }

    #[test]
    fn remove_exact_with_empty_tags_drops_default_rule() {
        let mut set = sample();
        assert_eq!(set.remove_exact("flag", &TagMap::new()), 1);
        assert!(!set.contains_key("flag"));
    }

    #[test]
    fn remove_exact_ignores_subsets_and_supersets() {
        let mut set = sample();
        let superset = tag_map([("city", TagValue::from("bj")), ("vip", TagValue::from(true))]);
        assert_eq!(set.remove_exact("limit", &superset), 0);
        assert_eq!(set.remove_exact("missing", &superset), 0);
        assert_eq!(set.get("limit").unwrap().len(), 2);
    }

    #[test]
    fn remove_key() {
        let mut set = sample();
        assert!(set.remove_key("flag"));
        assert!(!set.remove_key("flag"));
        assert_eq!(set.keys().collect::<Vec<_>>(), vec!["limit"]);
    }

    #[test]
    fn value_hashes_are_deduplicated() {
        let mut set = sample();
        set.replace("again", vec![Rule::new(TagMap::new(), hash(1))]);
        let hashes = set.value_hashes();
        assert_eq!(hashes.len(), 3);
        assert!(hashes.contains(&hash(1)));
    }

    #[test]
    fn empty_set_has_fixed_all_hash() {
        assert_eq!(RuleSet::new().all_hash().unwrap().as_str(), EMPTY_ALL_HASH);
    }

    #[test]
    fn all_hash_changes_with_content() {
        let a = sample();
        let mut b = sample();
        b.replace("flag", vec![Rule::new(TagMap::new(), hash(4))]);
        assert_ne!(a.all_hash().unwrap(), b.all_hash().unwrap());
    }
}
