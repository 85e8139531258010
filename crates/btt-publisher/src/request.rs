//! Publish request model.

use std::collections::BTreeMap;

use btt_types::TagMap;
use serde::Serialize;
use serde_json::Value;

use crate::error::{PublishError, PublishResult};

/// A value supplied for publishing.
#[derive(Clone, Debug, PartialEq)]
pub enum InputValue {
    /// An already-decoded value.
    Object(Value),
    /// Serialized text. Parsed before hashing so key order does not matter.
    RawText(String),
    /// Serialized text as bytes.
    RawBytes(Vec<u8>),
}

impl InputValue {
    /// The decoded value that gets hashed and stored.
    pub(crate) fn resolve(&self, key: &str) -> PublishResult<Value> {
        let invalid = |e: serde_json::Error| PublishError::InvalidRawValue {
            key: key.to_string(),
            reason: e.to_string(),
        };
        match self {
            Self::Object(value) => Ok(value.clone()),
            Self::RawText(text) => serde_json::from_str(text).map_err(invalid),
            Self::RawBytes(bytes) => serde_json::from_slice(bytes).map_err(invalid),
        }
    }
}

/// One rule of an upsert: the tags it routes on and its value.
#[derive(Clone, Debug, PartialEq)]
pub struct RuleInput {
    pub tags: TagMap,
    pub value: InputValue,
}

impl RuleInput {
    pub fn new(tags: TagMap, value: InputValue) -> Self {
        Self { tags, value }
    }

    /// Rule whose value is any serializable type.
    pub fn object<T: Serialize + ?Sized>(tags: TagMap, value: &T) -> serde_json::Result<Self> {
        Ok(Self::new(tags, InputValue::Object(serde_json::to_value(value)?)))
    }

    /// Rule whose value is an already-built JSON value.
    pub fn json(tags: TagMap, value: Value) -> Self {
        Self::new(tags, InputValue::Object(value))
    }

    /// Rule whose value is serialized text.
    pub fn raw_text(tags: TagMap, text: impl Into<String>) -> Self {
        Self::new(tags, InputValue::RawText(text.into()))
    }

    /// Rule whose value is serialized text given as bytes.
    pub fn raw_bytes(tags: TagMap, bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(tags, InputValue::RawBytes(bytes.into()))
    }
}

/// Removal of a whole key, or of the rules whose tags exactly equal `tags`.
#[derive(Clone, Debug, PartialEq)]
pub struct DeleteOp {
    pub key: String,
    /// `None` drops the key. `Some` of an empty map drops the default rule.
    pub tags: Option<TagMap>,
}

impl DeleteOp {
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            tags: None,
        }
    }

    pub fn rule(key: impl Into<String>, tags: TagMap) -> Self {
        Self {
            key: key.into(),
            tags: Some(tags),
        }
    }
}

/// Changes to apply on top of the version's current rule-set.
///
/// Deletes run first, then every key in `items` has its rule list replaced.
/// With `full_replace` the current rule-set is ignored and the result holds
/// only `items`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PublishRequest {
    pub full_replace: bool,
    pub items: BTreeMap<String, Vec<RuleInput>>,
    pub deletes: Vec<DeleteOp>,
}

impl PublishRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an empty rule-set instead of the current one.
    pub fn full_replace() -> Self {
        Self {
            full_replace: true,
            ..Self::default()
        }
    }

    /// Replace `key`'s rule list.
    pub fn upsert(mut self, key: impl Into<String>, rules: Vec<RuleInput>) -> Self {
        self.items.insert(key.into(), rules);
        self
    }

    /// Replace `key` with a single default rule.
    pub fn set(self, key: impl Into<String>, value: InputValue) -> Self {
        self.upsert(key, vec![RuleInput::new(TagMap::new(), value)])
    }

    pub fn delete(mut self, op: DeleteOp) -> Self {
        self.deletes.push(op);
        self
    }
}
