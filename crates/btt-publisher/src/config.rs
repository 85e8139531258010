use btt_store::Keyspace;

/// Default approximate cap on the update stream.
pub const DEFAULT_STREAM_MAX_LEN: usize = 1000;

/// Publisher settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublisherConfig {
    /// Key layout; defaults to the process-wide prefix at construction time.
    pub keyspace: Option<Keyspace>,
    /// Approximate number of entries the update stream is trimmed to.
    pub stream_max_len: usize,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            keyspace: None,
            stream_max_len: DEFAULT_STREAM_MAX_LEN,
        }
    }
}
