//! Key naming under a configurable prefix.

use std::sync::{LazyLock, PoisonError, RwLock};

use btt_types::{AllHash, Version};

/// Prefix used when none has been configured.
pub const DEFAULT_PREFIX: &str = "btt-setting:";

static PREFIX: LazyLock<RwLock<String>> =
    LazyLock::new(|| RwLock::new(DEFAULT_PREFIX.to_string()));

/// Set the process-wide key prefix.
///
/// A trailing `:` is appended when missing. Clients and publishers capture
/// the prefix when they are constructed, so call this before creating any.
pub fn set_prefix(prefix: impl Into<String>) {
    let normalized = normalize(prefix.into());
    *PREFIX.write().unwrap_or_else(PoisonError::into_inner) = normalized;
}

/// The process-wide key prefix.
pub fn current_prefix() -> String {
    PREFIX
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

fn normalize(mut prefix: String) -> String {
    if !prefix.is_empty() && !prefix.ends_with(':') {
        prefix.push(':');
    }
    prefix
}

/// Resolved key names for one prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Keyspace {
    prefix: String,
}

impl Keyspace {
    /// Keyspace under an explicit prefix, normalized like [`set_prefix`].
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: normalize(prefix.into()),
        }
    }

    /// Keyspace under the current process-wide prefix.
    pub fn current() -> Self {
        Self {
            prefix: current_prefix(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Mapping of `version → all-hash`.
    pub fn versions(&self) -> String {
        format!("{}versions", self.prefix)
    }

    /// Mapping of `config-key → rule list` for one rule-set.
    pub fn rules(&self, all_hash: &AllHash) -> String {
        format!("{}rules:{}", self.prefix, all_hash)
    }

    /// Mapping of `value-hash → canonical value`.
    pub fn values(&self) -> String {
        format!("{}values", self.prefix)
    }

    /// Append-only history list.
    pub fn history(&self) -> String {
        format!("{}history", self.prefix)
    }

    /// Update notification stream.
    pub fn updates(&self) -> String {
        format!("{}updates", self.prefix)
    }

    /// Field name of a version inside the `versions` mapping.
    pub fn version_field(version: Version) -> String {
        version.to_string()
    }
}

impl Default for Keyspace {
    fn default() -> Self {
        Self::current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout() {
        let ks = Keyspace::new(DEFAULT_PREFIX);
        let hash = AllHash::from_hex("0a1b2c3d").unwrap();
        assert_eq!(ks.versions(), "btt-setting:versions");
        assert_eq!(ks.rules(&hash), "btt-setting:rules:0a1b2c3d");
        assert_eq!(ks.values(), "btt-setting:values");
        assert_eq!(ks.history(), "btt-setting:history");
        assert_eq!(ks.updates(), "btt-setting:updates");
    }

    #[test]
    fn colon_is_appended() {
        assert_eq!(Keyspace::new("app").prefix(), "app:");
        assert_eq!(Keyspace::new("app:").prefix(), "app:");
        assert_eq!(Keyspace::new("").prefix(), "");
    }

    #[test]
    fn version_field_is_decimal() {
        assert_eq!(Keyspace::version_field(12), "12");
        assert_eq!(Keyspace::version_field(-3), "-3");
    }

    #[test]
    fn set_prefix_normalizes() {
        // Re-installs the default so concurrently running tests see no change.
        set_prefix("btt-setting");
        assert_eq!(current_prefix(), DEFAULT_PREFIX);
        assert_eq!(Keyspace::current().prefix(), DEFAULT_PREFIX);
    }
}
