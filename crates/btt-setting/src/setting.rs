use std::sync::Arc;

use btt_client::Client;
use btt_publisher::Publisher;
use btt_store::{InMemorySettingStore, SettingStore};
use btt_types::Version;

use crate::config::SettingConfig;
use crate::error::SettingResult;

/// A backing store bound to one configuration.
///
/// Hands out clients and publishers that share the store and the key prefix,
/// without touching the process-wide prefix.
#[derive(Clone)]
pub struct Setting {
    store: Arc<dyn SettingStore>,
    config: SettingConfig,
}

impl Setting {
    pub fn new(store: Arc<dyn SettingStore>, config: SettingConfig) -> Self {
        Self { store, config }
    }

    /// A setting over a fresh in-memory store.
    pub fn in_memory(config: SettingConfig) -> Self {
        Self::new(Arc::new(InMemorySettingStore::new()), config)
    }

    /// A client for `version`, loaded once.
    pub async fn client(&self, version: Version) -> SettingResult<Client> {
        let client =
            Client::with_options(Arc::clone(&self.store), version, self.config.client_options())
                .await?;
        Ok(client)
    }

    pub fn publisher(&self, version: Version) -> Publisher {
        Publisher::with_config(
            Arc::clone(&self.store),
            version,
            self.config.publisher_config(),
        )
    }

    pub fn store(&self) -> &Arc<dyn SettingStore> {
        &self.store
    }

    pub fn config(&self) -> &SettingConfig {
        &self.config
    }
}

impl std::fmt::Debug for Setting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Setting")
            .field("prefix", &self.config.prefix)
            .finish()
    }
}
