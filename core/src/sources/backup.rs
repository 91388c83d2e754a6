use crate::cache::CacheStore;
use crate::dataset::Dataset;
use crate::dataset::SourceTag;
use crate::sources::FetchContext;
use crate::sources::FetchError;
use crate::sources::SourceAdapter;
use crate::validate;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Serves the snapshot written after the last remote resolution.
pub struct BackupSnapshotAdapter {
    cache: Arc<CacheStore>,
}

impl BackupSnapshotAdapter {
    pub fn new(cache: Arc<CacheStore>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl SourceAdapter for BackupSnapshotAdapter {
    fn source(&self) -> SourceTag {
        SourceTag::Backup
    }

    async fn fetch(&self, _ctx: &FetchContext) -> Result<Dataset, FetchError> {
        let entry = self
            .cache
            .backup_entry()?
            .ok_or_else(|| FetchError::Missing("backup snapshot".to_string()))?;
        debug!(saved_at = %entry.saved_at, records = entry.dataset.len(), "read backup snapshot");
        let dataset = entry.dataset.tagged(SourceTag::Backup);
        validate::check(&dataset)?;
        Ok(dataset)
    }
}
