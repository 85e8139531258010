use std::time::Duration;

/// Timing of the update watcher.
///
/// Both the stream block and the anti-entropy period must stay bounded so
/// cancellation and missed-event recovery remain responsive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WatchConfig {
    /// Longest a single stream read may block.
    pub block_timeout: Duration,
    /// Period of the version-pointer consistency check.
    pub anti_entropy_interval: Duration,
    /// Pause after a failed stream read.
    pub error_backoff: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            block_timeout: Duration::from_secs(5),
            anti_entropy_interval: Duration::from_secs(60),
            error_backoff: Duration::from_secs(5),
        }
    }
}

impl WatchConfig {
    /// Replace zero durations with the defaults.
    pub fn normalized(self) -> Self {
        let defaults = Self::default();
        let pick = |d: Duration, fallback: Duration| if d.is_zero() { fallback } else { d };
        Self {
            block_timeout: pick(self.block_timeout, defaults.block_timeout),
            anti_entropy_interval: pick(self.anti_entropy_interval, defaults.anti_entropy_interval),
            error_backoff: pick(self.error_backoff, defaults.error_backoff),
        }
    }
}
