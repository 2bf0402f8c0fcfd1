use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::Config;
use crate::repository::CollectionRepository;
use crate::services::defaults_provider::DefaultsProvider;
use crate::store::{Store, StoreError};

/// Everything a front end needs after startup: the opened store and the
/// repository holding the in-memory collection set.
#[derive(Clone)]
pub struct AppState {
    store: Arc<Store>,
    repository: Arc<Mutex<CollectionRepository>>,
    config: Arc<Config>,
}

impl AppState {
    /// Open the store, migrate it, load collections and seed defaults on first run.
    pub async fn bootstrap(config: &Config) -> Result<Self, StoreError> {
        let store = Arc::new(Store::open_with_limit(
            &config.sled_path,
            config.max_snapshot_bytes,
        )?);
        store.run_migrations()?;

        let mut repository = CollectionRepository::open(store.clone());
        let provider = DefaultsProvider::from_config(&config.defaults);
        repository.initialize(provider.as_ref()).await;

        Ok(Self {
            store,
            repository: Arc::new(Mutex::new(repository)),
            config: Arc::new(config.clone()),
        })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn repository(&self) -> &Arc<Mutex<CollectionRepository>> {
        &self.repository
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn share_base_url(&self) -> &str {
        &self.config.share_base_url
    }
}
