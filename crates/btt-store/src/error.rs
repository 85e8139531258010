/// Errors from backing-store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached or the connection failed mid-call.
    #[error("transport error: {0}")]
    Transport(String),

    /// The atomic commit script failed for a reason other than a CAS miss.
    #[error("script error: {0}")]
    Script(String),

    /// A stream id or reply could not be parsed.
    #[error("malformed reply: {0}")]
    Malformed(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
