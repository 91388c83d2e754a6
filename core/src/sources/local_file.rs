use crate::dataset::Dataset;
use crate::dataset::SourceTag;
use crate::sources::FetchContext;
use crate::sources::FetchError;
use crate::sources::SourceAdapter;
use crate::validate;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CACHE_CONTROL;
use reqwest::header::EXPIRES;
use reqwest::header::PRAGMA;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::debug;
use tracing::info;
use url::Url;

pub const DEFAULT_FILE_NAME: &str = "dashboard_data.json";

/// Current dir, parent dir, explicit current dir, root; tried in this order.
pub fn default_candidates(file_name: &str) -> Vec<String> {
    vec![
        file_name.to_string(),
        format!("../{file_name}"),
        format!("./{file_name}"),
        format!("/{file_name}"),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalFileOrigin {
    /// Candidates are joined onto this URL; keep a trailing `/` on directories.
    Http(Url),
    Directory(PathBuf),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocalFileConfig {
    /// An `http(s)://` URL or a directory path. Defaults to the working directory.
    pub base: Option<String>,
    pub file_name: String,
}

impl Default for LocalFileConfig {
    fn default() -> Self {
        Self {
            base: None,
            file_name: DEFAULT_FILE_NAME.to_string(),
        }
    }
}

impl LocalFileConfig {
    pub fn origin(&self) -> LocalFileOrigin {
        match self.base.as_deref() {
            Some(base) => match Url::parse(base) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => LocalFileOrigin::Http(url),
                _ => LocalFileOrigin::Directory(PathBuf::from(base)),
            },
            None => LocalFileOrigin::Directory(PathBuf::from(".")),
        }
    }
}

/// Looks for the collector's JSON export next to the dashboard.
pub struct LocalFileAdapter {
    client: Client,
    origin: LocalFileOrigin,
    candidates: Vec<String>,
}

impl LocalFileAdapter {
    pub fn new(client: Client, origin: LocalFileOrigin) -> Self {
        Self {
            client,
            origin,
            candidates: default_candidates(DEFAULT_FILE_NAME),
        }
    }

    pub fn from_config(config: &LocalFileConfig, client: Client) -> Self {
        Self::new(client, config.origin()).with_candidates(default_candidates(&config.file_name))
    }

    pub fn with_candidates(mut self, candidates: Vec<String>) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    async fn load_candidate(&self, candidate: &str, ctx: &FetchContext) -> Result<Dataset, FetchError> {
        match &self.origin {
            LocalFileOrigin::Http(base) => {
                let mut url = base
                    .join(candidate)
                    .map_err(|err| FetchError::InvalidUrl(format!("{candidate}: {err}")))?;
                url.query_pairs_mut()
                    .append_pair("_", &ctx.now.timestamp_millis().to_string());
                let response = self
                    .client
                    .get(url.clone())
                    .header(CACHE_CONTROL, "no-cache, no-store, must-revalidate")
                    .header(PRAGMA, "no-cache")
                    .header(EXPIRES, "0")
                    .send()
                    .await?;
                let status = response.status();
                if !status.is_success() {
                    url.set_query(None);
                    return Err(FetchError::Status {
                        url: url.to_string(),
                        status: status.as_u16(),
                    });
                }
                Ok(response.json::<Dataset>().await?)
            }
            LocalFileOrigin::Directory(dir) => {
                let bytes = tokio::fs::read(dir.join(candidate)).await?;
                Ok(serde_json::from_slice(&bytes)?)
            }
        }
    }
}

#[async_trait]
impl SourceAdapter for LocalFileAdapter {
    fn source(&self) -> SourceTag {
        SourceTag::LocalFile
    }

    async fn fetch(&self, ctx: &FetchContext) -> Result<Dataset, FetchError> {
        for candidate in &self.candidates {
            let dataset = match self.load_candidate(candidate, ctx).await {
                Ok(dataset) => dataset.tagged(SourceTag::LocalFile),
                Err(err) => {
                    debug!(candidate = %candidate, error = %err, "local candidate unavailable");
                    continue;
                }
            };
            match validate::check(&dataset) {
                Ok(()) => {
                    info!(candidate = %candidate, records = dataset.len(), "loaded local dataset");
                    return Ok(dataset);
                }
                Err(err) => debug!(candidate = %candidate, error = %err, "local candidate invalid"),
            }
        }
        Err(FetchError::CandidatesExhausted {
            tried: self.candidates.len(),
        })
    }
}
