use std::collections::BTreeMap;

use btt_types::{AllHash, Rule, ValueHash};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// All-hash of a rule-set with no keys: the SHA-256 of the empty input.
pub const EMPTY_ALL_HASH: &str = "e3b0c442";

/// Hash a value's canonical serialization.
///
/// The value is first lifted into a `serde_json::Value`, which orders object
/// keys, then written compactly. Returns the hash together with the exact
/// bytes that were hashed; those bytes are what gets stored.
pub fn hash_value<T: Serialize + ?Sized>(value: &T) -> Result<(ValueHash, Vec<u8>), HashError> {
    let canonical =
        serde_json::to_value(value).map_err(|e| HashError::Serialization(e.to_string()))?;
    let bytes =
        serde_json::to_vec(&canonical).map_err(|e| HashError::Serialization(e.to_string()))?;
    Ok((hash_value_bytes(&bytes), bytes))
}

/// Hash bytes that are already in canonical form.
pub fn hash_value_bytes(bytes: &[u8]) -> ValueHash {
    let digest: [u8; 32] = Sha256::digest(bytes).into();
    ValueHash::from_digest(&digest)
}

/// Compute the all-hash of a rule-set.
pub fn hash_rule_set(rules: &BTreeMap<String, Vec<Rule>>) -> Result<AllHash, HashError> {
    let mut hasher = RuleSetHasher::new();
    for list in rules.values() {
        hasher.update(list)?;
    }
    Ok(hasher.finish())
}

/// Running all-hash computation.
///
/// Callers must feed rule lists in lexicographic key order; the key itself is
/// not part of the digest.
pub struct RuleSetHasher {
    inner: Sha256,
}

impl RuleSetHasher {
    pub fn new() -> Self {
        Self {
            inner: Sha256::new(),
        }
    }

    /// Feed one key's serialized rule list.
    pub fn update(&mut self, rules: &[Rule]) -> Result<(), HashError> {
        let bytes =
            serde_json::to_vec(rules).map_err(|e| HashError::Serialization(e.to_string()))?;
        self.inner.update(&bytes);
        Ok(())
    }

    pub fn finish(self) -> AllHash {
        let digest: [u8; 32] = self.inner.finalize().into();
        AllHash::from_digest(&digest)
    }
}

impl Default for RuleSetHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HashError {
    #[error("serialization error: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use btt_types::tag_map;
    use proptest::prelude::*;
    use serde_json::json;

    fn rule(city: &str, hash: &str) -> Rule {
        Rule::new(tag_map([("city", city)]), ValueHash::from_hex(hash).unwrap())
    }

    #[test]
    fn value_hash_is_16_hex_of_sha256() {
        // sha256("100") = ad57366865126e55649ecb23ae1d48887544976efea46a48eb5d85a6eeb4d306
        let (hash, bytes) = hash_value(&100).unwrap();
        assert_eq!(bytes, b"100");
        assert_eq!(hash.as_str(), "ad57366865126e55");
    }

    #[test]
    fn empty_rule_set_hash_is_fixed() {
        let hash = hash_rule_set(&BTreeMap::new()).unwrap();
        assert_eq!(hash.as_str(), EMPTY_ALL_HASH);
    }

    #[test]
    fn object_keys_are_sorted_before_hashing() {
        #[derive(Serialize)]
        struct Limits {
            zeta: u32,
            alpha: u32,
        }
        let (h1, bytes) = hash_value(&Limits { zeta: 2, alpha: 1 }).unwrap();
        assert_eq!(bytes, br#"{"alpha":1,"zeta":2}"#);
        let (h2, _) = hash_value(&json!({"alpha": 1, "zeta": 2})).unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn nested_maps_are_canonical() {
        let mut a = std::collections::HashMap::new();
        a.insert("b", json!({"y": 1, "x": 2}));
        a.insert("a", json!([3, {"q": 1, "p": 0}]));
        let (_, bytes) = hash_value(&a).unwrap();
        assert_eq!(bytes, br#"{"a":[3,{"p":0,"q":1}],"b":{"x":2,"y":1}}"#);
    }

    #[test]
    fn rule_set_hash_depends_on_rule_order() {
        let mut one = BTreeMap::new();
        one.insert(
            "limit".to_string(),
            vec![rule("bj", "0000000000000001"), rule("sh", "0000000000000002")],
        );
        let mut two = BTreeMap::new();
        two.insert(
            "limit".to_string(),
            vec![rule("sh", "0000000000000002"), rule("bj", "0000000000000001")],
        );
        assert_ne!(hash_rule_set(&one).unwrap(), hash_rule_set(&two).unwrap());
    }

    #[test]
    fn running_hasher_matches_rule_set_hash() {
        let mut set = BTreeMap::new();
        set.insert("a".to_string(), vec![rule("bj", "00000000000000aa")]);
        set.insert("b".to_string(), vec![rule("sh", "00000000000000bb")]);

        let mut hasher = RuleSetHasher::new();
        hasher.update(&set["a"]).unwrap();
        hasher.update(&set["b"]).unwrap();
        assert_eq!(hasher.finish(), hash_rule_set(&set).unwrap());
    }

    #[test]
    fn non_finite_tag_fails_rule_set_hash() {
        let bad = tag_map([("x", f64::INFINITY)]);
        let mut set = BTreeMap::new();
        set.insert(
            "k".to_string(),
            vec![Rule::new(bad, ValueHash::from_hex("0000000000000000").unwrap())],
        );
        assert!(matches!(
            hash_rule_set(&set),
            Err(HashError::Serialization(_))
        ));
    }

    proptest! {
        #[test]
        fn hashing_is_deterministic(entries in proptest::collection::hash_map("[a-z]{1,6}", any::<i32>(), 0..12)) {
            let (h1, b1) = hash_value(&entries).unwrap();
            let sorted: BTreeMap<_, _> = entries.iter().collect();
            let (h2, b2) = hash_value(&sorted).unwrap();
            prop_assert_eq!(h1, h2);
            prop_assert_eq!(b1, b2);
        }
    }
}
