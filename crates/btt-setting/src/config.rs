use std::time::Duration;

use btt_client::{ClientOptions, WatchConfig};
use btt_publisher::PublisherConfig;
use btt_store::{set_prefix, Keyspace, DEFAULT_PREFIX};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{SettingError, SettingResult};

/// Process configuration, loadable from TOML.
///
/// ```toml
/// prefix = "myapp:"
///
/// [watch]
/// block_timeout_secs = 5
/// anti_entropy_secs = 60
/// error_backoff_secs = 5
///
/// [publisher]
/// stream_max_len = 1000
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingConfig {
    pub prefix: String,
    pub watch: WatchSection,
    pub publisher: PublisherSection,
}

/// Watcher timing, in whole seconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchSection {
    pub block_timeout_secs: u64,
    pub anti_entropy_secs: u64,
    pub error_backoff_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherSection {
    pub stream_max_len: usize,
}

impl Default for SettingConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            watch: WatchSection::default(),
            publisher: PublisherSection::default(),
        }
    }
}

impl Default for WatchSection {
    fn default() -> Self {
        let d = WatchConfig::default();
        Self {
            block_timeout_secs: d.block_timeout.as_secs(),
            anti_entropy_secs: d.anti_entropy_interval.as_secs(),
            error_backoff_secs: d.error_backoff.as_secs(),
        }
    }
}

impl Default for PublisherSection {
    fn default() -> Self {
        Self {
            stream_max_len: PublisherConfig::default().stream_max_len,
        }
    }
}

impl SettingConfig {
    pub fn from_toml_str(text: &str) -> SettingResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SettingResult<()> {
        if self.publisher.stream_max_len == 0 {
            return Err(SettingError::Config(
                "publisher.stream_max_len must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Install `prefix` as the process-wide default.
    ///
    /// Only affects clients and publishers constructed afterwards.
    pub fn apply_prefix(&self) {
        set_prefix(self.prefix.clone());
        info!(prefix = %self.prefix, "key prefix installed");
    }

    pub fn keyspace(&self) -> Keyspace {
        Keyspace::new(self.prefix.clone())
    }

    /// Watcher timing; zero durations fall back to the defaults.
    pub fn watch_config(&self) -> WatchConfig {
        WatchConfig {
            block_timeout: Duration::from_secs(self.watch.block_timeout_secs),
            anti_entropy_interval: Duration::from_secs(self.watch.anti_entropy_secs),
            error_backoff: Duration::from_secs(self.watch.error_backoff_secs),
        }
        .normalized()
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            keyspace: Some(self.keyspace()),
            watch: self.watch_config(),
        }
    }

    pub fn publisher_config(&self) -> PublisherConfig {
        PublisherConfig {
            keyspace: Some(self.keyspace()),
            stream_max_len: self.publisher.stream_max_len,
        }
    }
}
