//! Wires the configured sources, cache and retry policy into one pipeline.

use crate::cache::CacheConfig;
use crate::cache::CacheStore;
use crate::cache::SledStore;
use crate::cache::StoreError;
use crate::clock::Clock;
use crate::clock::SystemClock;
use crate::config::Config;
use crate::dataset::Dataset;
use crate::error::RetryError;
use crate::orchestrator::Orchestrator;
use crate::retry::RetryController;
use crate::retry::RetryPolicy;
use crate::sources::BackupSnapshotAdapter;
use crate::sources::GlobalSlot;
use crate::sources::GlobalVariableAdapter;
use crate::sources::LocalFileAdapter;
use crate::sources::RemoteDatabaseAdapter;
use crate::sources::RemoteSubscription;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

const USER_AGENT: &str = concat!("auctiondash/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to open cache: {0}")]
    Store(#[from] StoreError),
    #[error("failed to build http client: {0}")]
    Http(#[from] reqwest::Error),
}

pub struct Pipeline {
    pub orchestrator: Arc<Orchestrator>,
    pub retry: RetryController,
    pub remote: Option<Arc<RemoteDatabaseAdapter>>,
    pub global: GlobalSlot,
    pub cache: Arc<CacheStore>,
    subscribe: bool,
}

impl Pipeline {
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &Config, clock: Arc<dyn Clock>) -> Result<Self, PipelineError> {
        let cache = open_cache(config)?;
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        let global = GlobalSlot::new();

        let remote = RemoteDatabaseAdapter::from_config(&config.remote, client.clone(), Arc::clone(&cache))
            .map(Arc::new);
        let mut builder = Orchestrator::builder(Arc::clone(&cache))
            .clock(clock)
            .source(Arc::new(LocalFileAdapter::from_config(&config.local_file, client)))
            .source(Arc::new(BackupSnapshotAdapter::new(Arc::clone(&cache))))
            .source(Arc::new(GlobalVariableAdapter::new(global.clone())));
        if let Some(remote) = remote.as_ref() {
            builder = builder.source(remote.clone());
        }
        let orchestrator = Arc::new(builder.build());
        info!(
            sources = ?orchestrator.sources(),
            home = %config.home.display(),
            "pipeline ready"
        );

        let retry = RetryController::new(Arc::clone(&orchestrator), RetryPolicy::from(&config.retry));
        Ok(Self {
            orchestrator,
            retry,
            remote,
            global,
            cache,
            subscribe: config.remote.subscribe,
        })
    }

    /// Resolve with retries.
    pub async fn resolve(&self, force_refresh: bool) -> Result<Arc<Dataset>, RetryError> {
        if force_refresh {
            self.retry.refresh().await
        } else {
            self.retry.run(false).await
        }
    }

    /// Start the push subscription when a remote database is configured.
    pub fn start_subscription(&self) -> Option<RemoteSubscription> {
        let remote = self.remote.as_ref()?;
        Some(remote.subscribe(Arc::clone(&self.orchestrator)))
    }

    pub fn subscribe_enabled(&self) -> bool {
        self.subscribe && self.remote.is_some()
    }
}

/// Open the sled-backed cache described by `[cache]`.
pub fn open_cache(config: &Config) -> Result<Arc<CacheStore>, StoreError> {
    let settings = CacheConfig {
        path: if config.cache.temporary {
            None
        } else {
            Some(config.cache_path())
        },
        ..config.cache.clone()
    };
    let store = SledStore::open(&settings)?;
    Ok(Arc::new(CacheStore::new(Arc::new(store))))
}
