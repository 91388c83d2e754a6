use crate::dataset::SourceTag;
use serde::Serialize;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

#[derive(Debug, Clone, Copy, Serialize, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f32 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 1.0;
        }
        self.hits as f32 / total as f32
    }
}

#[derive(Debug, Clone, Copy, Serialize, Default, PartialEq, Eq)]
pub struct PipelineSnapshot {
    pub cache_hits: u64,
    pub resolutions: u64,
    pub fallbacks: u64,
    pub exhaustions: u64,
    pub pushes: u64,
    /// Wins per pull source, indexed by [`SourceTag::priority`].
    pub wins: [u64; 5],
}

impl PipelineSnapshot {
    pub fn wins_for(&self, source: SourceTag) -> u64 {
        self.wins[source.priority()]
    }
}

#[derive(Debug, Default)]
pub struct PipelineStats {
    cache_hits: AtomicU64,
    resolutions: AtomicU64,
    fallbacks: AtomicU64,
    exhaustions: AtomicU64,
    pushes: AtomicU64,
    wins: [AtomicU64; 5],
}

impl PipelineStats {
    pub(crate) fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_win(&self, source: SourceTag) {
        self.resolutions.fetch_add(1, Ordering::Relaxed);
        self.wins[source.priority()].fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fallback(&self) {
        self.fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_exhaustion(&self) {
        self.exhaustions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_push(&self) {
        self.pushes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            resolutions: self.resolutions.load(Ordering::Relaxed),
            fallbacks: self.fallbacks.load(Ordering::Relaxed),
            exhaustions: self.exhaustions.load(Ordering::Relaxed),
            pushes: self.pushes.load(Ordering::Relaxed),
            wins: std::array::from_fn(|idx| self.wins[idx].load(Ordering::Relaxed)),
        }
    }
}
