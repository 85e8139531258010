//! Content hashing for btt-setting.
//!
//! Values are identified by a 16-hex truncation of SHA-256 over their
//! canonical JSON; rule-sets by an 8-hex truncation over every key's rule
//! list in sorted key order. Both truncations are part of the on-store
//! contract and must never change.
//!
//! Canonical JSON relies on `serde_json`'s default map type, which keeps
//! object keys sorted. Nothing in this workspace may enable its
//! `preserve_order` feature.

pub mod hasher;

pub use hasher::{
    hash_rule_set, hash_value, hash_value_bytes, HashError, RuleSetHasher, EMPTY_ALL_HASH,
};
