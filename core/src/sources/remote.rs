use crate::cache::CacheStore;
use crate::dataset::Dataset;
use crate::dataset::SourceTag;
use crate::sources::FetchContext;
use crate::sources::FetchError;
use crate::sources::SourceAdapter;
use crate::validate;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use tracing::info;
use tracing::warn;
use url::Url;

pub const DEFAULT_NODE: &str = "auction_data";
const LAST_UPDATED_CHILD: &str = "last_updated";
const DEFAULT_WATCHDOG_MS: u64 = 10_000;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Realtime database root, e.g. `https://<project>.firebasedatabase.app`.
    pub database_url: Option<Url>,
    pub node: String,
    pub auth_token: Option<String>,
    pub watchdog_ms: u64,
    pub subscribe: bool,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            node: DEFAULT_NODE.to_string(),
            auth_token: None,
            watchdog_ms: DEFAULT_WATCHDOG_MS,
            subscribe: false,
        }
    }
}

/// Reads the auction node of a realtime database over its REST interface.
pub struct RemoteDatabaseAdapter {
    pub(crate) client: Client,
    base: Url,
    node: String,
    auth_token: Option<String>,
    watchdog: Duration,
    cache: Arc<CacheStore>,
}

impl RemoteDatabaseAdapter {
    pub fn new(client: Client, base: Url, cache: Arc<CacheStore>) -> Self {
        Self {
            client,
            base,
            node: DEFAULT_NODE.to_string(),
            auth_token: None,
            watchdog: Duration::from_millis(DEFAULT_WATCHDOG_MS),
            cache,
        }
    }

    /// `None` when no database URL is configured.
    pub fn from_config(config: &RemoteConfig, client: Client, cache: Arc<CacheStore>) -> Option<Self> {
        let base = config.database_url.clone()?;
        Some(
            Self::new(client, base, cache)
                .with_node(config.node.clone())
                .with_auth_token(config.auth_token.clone())
                .with_watchdog(Duration::from_millis(config.watchdog_ms)),
        )
    }

    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.node = node.into();
        self
    }

    pub fn with_auth_token(mut self, token: Option<String>) -> Self {
        self.auth_token = token;
        self
    }

    pub fn with_watchdog(mut self, watchdog: Duration) -> Self {
        self.watchdog = watchdog;
        self
    }

    pub fn watchdog(&self) -> Duration {
        self.watchdog
    }

    /// REST endpoint for the node, or one of its children.
    pub(crate) fn endpoint(&self, child: Option<&str>) -> Result<Url, FetchError> {
        let mut segments: Vec<String> = self
            .node
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();
        if let Some(child) = child {
            segments.push(child.to_string());
        }
        if let Some(last) = segments.last_mut() {
            last.push_str(".json");
        }
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| FetchError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(&segments);
        if let Some(token) = &self.auth_token {
            url.query_pairs_mut().append_pair("auth", token);
        }
        Ok(url)
    }

    /// Download the whole node, untagged and unvalidated.
    pub(crate) async fn fetch_full(&self) -> Result<Dataset, FetchError> {
        let url = self.endpoint(None)?;
        let value = self.get_json(url).await?;
        if value.is_null() {
            return Err(FetchError::Missing(format!("remote node `{}`", self.node)));
        }
        Ok(serde_json::from_value(value)?)
    }

    async fn remote_stamp(&self) -> Result<Option<String>, FetchError> {
        let url = self.endpoint(Some(LAST_UPDATED_CHILD))?;
        Ok(match self.get_json(url).await? {
            Value::Null => None,
            Value::String(stamp) => Some(stamp),
            other => Some(other.to_string()),
        })
    }

    async fn get_json(&self, url: Url) -> Result<Value, FetchError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: redacted(&url),
                status: status.as_u16(),
            });
        }
        Ok(response.json::<Value>().await?)
    }

    /// The cached copy, if the server reports the same stamp we stored with it.
    fn cached_copy_for(&self, remote_stamp: &str) -> Option<Dataset> {
        let local_stamp = match self.cache.last_updated_stamp() {
            Ok(stamp) => stamp?,
            Err(err) => {
                warn!(error = %err, "could not read cached stamp");
                return None;
            }
        };
        if local_stamp != remote_stamp {
            debug!(local = %local_stamp, remote = %remote_stamp, "remote data changed");
            return None;
        }
        match self.cache.live_entry() {
            Ok(Some(entry)) if validate::validate(&entry.dataset) => Some(entry.dataset),
            Ok(_) => None,
            Err(err) => {
                warn!(error = %err, "could not read live cache entry");
                None
            }
        }
    }

    async fn fetch_unbounded(&self, ctx: &FetchContext) -> Result<Dataset, FetchError> {
        match self.remote_stamp().await {
            Ok(Some(stamp)) => {
                if let Some(cached) = self.cached_copy_for(&stamp) {
                    info!(stamp = %stamp, records = cached.len(), "remote unchanged, using cached copy");
                    return Ok(cached.tagged(SourceTag::RemoteDb));
                }
            }
            Ok(None) => debug!("remote node has no last_updated stamp"),
            // Metadata is an optimisation; go straight to the full read.
            Err(err) => warn!(error = %err, "remote metadata read failed"),
        }

        let dataset = self.fetch_full().await?.tagged(SourceTag::RemoteDb);
        validate::check(&dataset)?;
        if let Err(err) = self.cache.write_live(&dataset, ctx.now.with_timezone(&Utc)) {
            warn!(error = %err, "failed to cache remote dataset");
        }
        info!(records = dataset.len(), "fetched remote dataset");
        Ok(dataset)
    }
}

#[async_trait]
impl SourceAdapter for RemoteDatabaseAdapter {
    fn source(&self) -> SourceTag {
        SourceTag::RemoteDb
    }

    async fn fetch(&self, ctx: &FetchContext) -> Result<Dataset, FetchError> {
        // The request is abandoned, not cancelled upstream; we only stop waiting.
        match tokio::time::timeout(self.watchdog, self.fetch_unbounded(ctx)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(watchdog_ms = self.watchdog.as_millis() as u64, "remote database watchdog fired");
                Err(FetchError::TimedOut(self.watchdog))
            }
        }
    }
}

/// URL without its query string, which may carry an auth token.
pub(crate) fn redacted(url: &Url) -> String {
    let mut clean = url.clone();
    clean.set_query(None);
    clean.to_string()
}
