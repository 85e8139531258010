//! Tag scalars and tag maps.
//!
//! Tags are the routing predicates attached to rules and supplied by callers.
//! Only three scalar kinds exist: strings, booleans, and numbers. Every
//! numeric input is coerced to `f64` on insert, so an integer `3` supplied by
//! a caller equals a `3.0` that came back from the text encoding.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::TypeError;

/// Largest magnitude at which every integer is exactly representable in `f64`.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// A single tag value.
///
/// Equality is per-variant; the numeric arm compares as `f64`. A string never
/// equals a number or a boolean, even when their text looks alike.
#[derive(Clone, Debug, PartialEq)]
pub enum TagValue {
    Str(String),
    Bool(bool),
    Num(f64),
}

/// Tag map attached to a rule or supplied by a caller.
///
/// A `BTreeMap` so serialization always emits keys in sorted order.
pub type TagMap = BTreeMap<String, TagValue>;

impl TagValue {
    /// Convert a decoded JSON value, rejecting nulls, arrays, and objects.
    pub fn from_json(key: &str, value: Value) -> Result<Self, TypeError> {
        match value {
            Value::String(s) => Ok(Self::Str(s)),
            Value::Bool(b) => Ok(Self::Bool(b)),
            Value::Number(n) => n.as_f64().map(Self::Num).ok_or_else(|| {
                TypeError::UnsupportedTagValue {
                    key: key.to_string(),
                    kind: "number",
                }
            }),
            other => Err(TypeError::UnsupportedTagValue {
                key: key.to_string(),
                kind: json_kind(&other),
            }),
        }
    }

    /// Short name of the scalar kind, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Bool(_) => "bool",
            Self::Num(_) => "number",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Num(n) => Some(*n),
            _ => None,
        }
    }
}

/// Build a tag map from any iterator of convertible pairs.
pub fn tag_map<K, V, I>(pairs: I) -> TagMap
where
    K: Into<String>,
    V: Into<TagValue>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Build a tag map from a JSON object, rejecting unsupported value kinds.
///
/// `null` is accepted as the empty map.
pub fn tag_map_from_json(value: Value) -> Result<TagMap, TypeError> {
    match value {
        Value::Null => Ok(TagMap::new()),
        Value::Object(obj) => obj
            .into_iter()
            .map(|(k, v)| {
                let tv = TagValue::from_json(&k, v)?;
                Ok((k, tv))
            })
            .collect(),
        other => Err(TypeError::UnsupportedTagValue {
            key: String::new(),
            kind: json_kind(&other),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Num(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for TagValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for TagValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<bool> for TagValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl TryFrom<Value> for TagValue {
    type Error = TypeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_json("", value)
    }
}

macro_rules! numeric_tag_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for TagValue {
                fn from(n: $t) -> Self {
                    Self::Num(n as f64)
                }
            }
        )*
    };
}

numeric_tag_from!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl Serialize for TagValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Str(s) => serializer.serialize_str(s),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Num(n) if !n.is_finite() => Err(serde::ser::Error::custom(format!(
                "non-finite tag number: {n}"
            ))),
            // Integral numbers are written without a fraction so every writer
            // produces the same bytes for the same rule.
            Self::Num(n) if n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER => {
                serializer.serialize_i64(*n as i64)
            }
            Self::Num(n) => serializer.serialize_f64(*n),
        }
    }
}

impl<'de> Deserialize<'de> for TagValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TagValueVisitor;

        impl Visitor<'_> for TagValueVisitor {
            type Value = TagValue;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a string, bool, or number tag value")
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<TagValue, E> {
                Ok(TagValue::Bool(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<TagValue, E> {
                Ok(TagValue::Num(v as f64))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<TagValue, E> {
                Ok(TagValue::Num(v as f64))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<TagValue, E> {
                Ok(TagValue::Num(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<TagValue, E> {
                Ok(TagValue::Str(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<TagValue, E> {
                Ok(TagValue::Str(v))
            }
        }

        deserializer.deserialize_any(TagValueVisitor)
    }
}

/// Deserialize a tag map, treating JSON `null` as the empty map.
pub fn deserialize_tag_map<'de, D>(deserializer: D) -> Result<TagMap, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<TagMap>::deserialize(deserializer)?.unwrap_or_default())
}
