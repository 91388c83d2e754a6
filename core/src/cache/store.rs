use crate::cache::backend::KeyValueStore;
use crate::cache::backend::MemoryStore;
use crate::cache::backend::StoreError;
use crate::clock::format_date;
use crate::dataset::Dataset;
use crate::metrics::CacheStats;
use chrono::DateTime;
use chrono::FixedOffset;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use tracing::debug;
use tracing::warn;

pub const LIVE_KEY: &str = "auction_data";
pub const LAST_UPDATED_KEY: &str = "auction_data_last_updated";
pub const BACKUP_KEY: &str = "auction_data_backup";
pub const BACKUP_DATE_KEY: &str = "auction_data_backup_date";

/// Last dataset fetched in full from the remote database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub dataset: Dataset,
    pub saved_at: DateTime<Utc>,
}

/// Copy of the last remote resolution, kept for offline fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupEntry {
    pub dataset: Dataset,
    pub saved_at: DateTime<Utc>,
}

/// Typed view over the key layout shared by the live cache and the backup.
pub struct CacheStore {
    backend: Arc<dyn KeyValueStore>,
    hit_counter: AtomicU64,
    miss_counter: AtomicU64,
}

impl CacheStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            hit_counter: AtomicU64::new(0),
            miss_counter: AtomicU64::new(0),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn live_entry(&self) -> Result<Option<CacheEntry>, StoreError> {
        self.read_json(LIVE_KEY)
    }

    /// Store `dataset` as the live entry together with its remote stamp.
    pub fn write_live(&self, dataset: &Dataset, saved_at: DateTime<Utc>) -> Result<(), StoreError> {
        let entry = CacheEntry {
            dataset: dataset.clone(),
            saved_at,
        };
        let stamp = dataset
            .last_updated
            .clone()
            .or_else(|| dataset.loaded_at.map(|at| at.to_rfc3339()))
            .unwrap_or_else(|| saved_at.to_rfc3339());
        self.backend.set(LIVE_KEY, &serde_json::to_string(&entry)?)?;
        self.backend.set(LAST_UPDATED_KEY, &stamp)?;
        debug!(records = dataset.len(), stamp = %stamp, "live cache entry written");
        Ok(())
    }

    pub fn clear_live(&self) -> Result<(), StoreError> {
        self.backend.remove(LIVE_KEY)?;
        self.backend.remove(LAST_UPDATED_KEY)?;
        Ok(())
    }

    pub fn last_updated_stamp(&self) -> Result<Option<String>, StoreError> {
        self.backend.get(LAST_UPDATED_KEY)
    }

    pub fn backup_entry(&self) -> Result<Option<BackupEntry>, StoreError> {
        self.read_json(BACKUP_KEY)
    }

    /// Persist the backup snapshot and its local calendar date.
    pub fn write_backup(
        &self,
        dataset: &Dataset,
        now: DateTime<FixedOffset>,
    ) -> Result<(), StoreError> {
        let entry = BackupEntry {
            dataset: dataset.clone(),
            saved_at: now.with_timezone(&Utc),
        };
        self.backend.set(BACKUP_KEY, &serde_json::to_string(&entry)?)?;
        self.backend.set(BACKUP_DATE_KEY, &format_date(now))?;
        Ok(())
    }

    pub fn backup_date(&self) -> Result<Option<String>, StoreError> {
        self.backend.get(BACKUP_DATE_KEY)
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        for key in [LIVE_KEY, LAST_UPDATED_KEY, BACKUP_KEY, BACKUP_DATE_KEY] {
            self.backend.remove(key)?;
        }
        self.hit_counter.store(0, Ordering::Relaxed);
        self.miss_counter.store(0, Ordering::Relaxed);
        Ok(())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hit_counter.load(Ordering::Relaxed),
            misses: self.miss_counter.load(Ordering::Relaxed),
        }
    }

    // A corrupt entry reads as absent so callers fall through to the next source.
    fn read_json<T>(&self, key: &str) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned,
    {
        let Some(raw) = self.backend.get(key)? else {
            self.miss_counter.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => {
                self.hit_counter.fetch_add(1, Ordering::Relaxed);
                Ok(Some(value))
            }
            Err(err) => {
                warn!(key, error = %err, "discarding unreadable cache entry");
                self.miss_counter.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }
}
