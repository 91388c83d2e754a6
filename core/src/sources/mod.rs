pub mod backup;
pub mod global;
pub mod local_file;
pub mod remote;
pub mod sample;
pub mod subscription;

pub use backup::BackupSnapshotAdapter;
pub use global::GlobalSlot;
pub use global::GlobalVariableAdapter;
pub use local_file::LocalFileAdapter;
pub use local_file::LocalFileConfig;
pub use local_file::LocalFileOrigin;
pub use remote::RemoteConfig;
pub use remote::RemoteDatabaseAdapter;
pub use sample::SampleDataAdapter;
pub use subscription::RemoteSubscription;

use crate::cache::StoreError;
use crate::dataset::Dataset;
use crate::dataset::SourceTag;
use crate::validate;
use crate::validate::ValidationError;
use async_trait::async_trait;
use chrono::DateTime;
use chrono::FixedOffset;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Per-resolution inputs handed to every source.
#[derive(Debug, Clone)]
pub struct FetchContext {
    pub resolution_id: Uuid,
    pub now: DateTime<FixedOffset>,
    pub force_refresh: bool,
}

impl FetchContext {
    pub fn new(now: DateTime<FixedOffset>, force_refresh: bool) -> Self {
        Self {
            resolution_id: Uuid::new_v4(),
            now,
            force_refresh,
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("http status {status} from {url}")]
    Status { url: String, status: u16 },
    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("nothing stored at {0}")]
    Missing(String),
    #[error("invalid dataset: {0}")]
    Invalid(#[from] ValidationError),
    #[error("no answer within {0:?}")]
    TimedOut(Duration),
    #[error("none of {tried} candidates produced a valid dataset")]
    CandidatesExhausted { tried: usize },
    #[error("event stream error: {0}")]
    Stream(String),
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl FetchError {
    /// Well-formed data that failed the dataset predicate.
    pub fn is_validation(&self) -> bool {
        matches!(self, FetchError::Invalid(_))
    }
}

/// One place a dataset can come from.
///
/// Implementations never panic on bad input; every failure is a
/// [`FetchError`] and moves the orchestrator on to the next source.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> SourceTag;

    async fn fetch(&self, ctx: &FetchContext) -> Result<Dataset, FetchError>;

    fn validate(&self, dataset: &Dataset) -> Result<(), ValidationError> {
        validate::check(dataset)
    }
}
