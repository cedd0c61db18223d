//! Adapter wiring shared by every command
//!
//! Each command builds one [`AppContext`]: config, database pool, and the
//! port adapters, injected into the orchestrators. All wiring is explicit
//! dependency injection; nothing depends on construction order.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use fieldsync_cache::{
    KvCredentialStore, OfflineInterviewStore, ReferenceDataCache, SqliteKeyValueStore,
};
use fieldsync_core::config::Config;
use fieldsync_core::ports::{IConnectivityProbe, IKeyValueStore, IRemoteDataSource};
use fieldsync_remote::{HttpConnectivityProbe, SurveyApiClient};

/// Wired adapters and stores for one CLI invocation
pub struct AppContext {
    pub config: Config,
    pub store: Arc<dyn IKeyValueStore>,
    pub cache: Arc<ReferenceDataCache>,
    pub interviews: Arc<OfflineInterviewStore>,
    pub remote: Arc<dyn IRemoteDataSource>,
    pub probe: Arc<dyn IConnectivityProbe>,
}

impl AppContext {
    /// Loads config and builds the full adapter stack
    pub async fn build(config_path: Option<&str>) -> Result<Self> {
        let config = match config_path {
            Some(path) => Config::load(Path::new(path))
                .with_context(|| format!("Failed to load config from {path}"))?,
            None => Config::load_or_default(&Config::default_path()),
        };

        let store: Arc<dyn IKeyValueStore> = Arc::new(
            SqliteKeyValueStore::open(&config.storage.database_path)
                .await
                .context("Failed to open local database")?,
        );
        let cache = Arc::new(ReferenceDataCache::new(store.clone()));
        let interviews = Arc::new(OfflineInterviewStore::new(store.clone()));

        let credentials = Arc::new(KvCredentialStore::new(store.clone()));
        let remote: Arc<dyn IRemoteDataSource> = Arc::new(
            SurveyApiClient::new(
                &config.server.base_url,
                credentials,
                Duration::from_secs(config.server.fetch_timeout_secs),
                Duration::from_secs(config.server.upload_timeout_secs),
            )
            .context("Failed to build API client")?,
        );
        let probe: Arc<dyn IConnectivityProbe> = Arc::new(
            HttpConnectivityProbe::new(
                &config.server.base_url,
                Duration::from_secs(config.server.probe_timeout_secs),
            )
            .context("Failed to build connectivity probe")?,
        );

        Ok(Self {
            config,
            store,
            cache,
            interviews,
            remote,
            probe,
        })
    }
}
