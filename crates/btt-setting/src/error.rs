use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("type error: {0}")]
    Type(#[from] btt_types::TypeError),

    #[error("store error: {0}")]
    Store(#[from] btt_store::StoreError),

    #[error("client error: {0}")]
    Client(#[from] btt_client::ClientError),

    #[error("publish error: {0}")]
    Publish(#[from] btt_publisher::PublishError),
}

impl From<toml::de::Error> for SettingError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}

pub type SettingResult<T> = Result<T, SettingError>;
