//! Ordered fallback over the configured sources.
//!
//! One resolution walks the sources in fixed priority order and stops at the
//! first dataset that validates. Before touching any source it checks whether
//! a dataset loaded earlier the same calendar day can be reused.

mod events;

pub use events::DatasetSubscriber;
pub use events::ResolutionEvent;

use crate::cache::CacheStore;
use crate::clock::Clock;
use crate::clock::SystemClock;
use crate::clock::format_stamp;
use crate::clock::is_same_calendar_day;
use crate::dataset::Dataset;
use crate::dataset::Provenance;
use crate::dataset::SourceTag;
use crate::error::ResolveError;
use crate::error::SourceFailure;
use crate::metrics::PipelineSnapshot;
use crate::metrics::PipelineStats;
use crate::sources::FetchContext;
use crate::sources::FetchError;
use crate::sources::SampleDataAdapter;
use crate::sources::SourceAdapter;
use crate::validate;
use chrono::DateTime;
use chrono::FixedOffset;
use chrono::Utc;
use events::Broadcaster;
use serde::Serialize;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;
use tokio::sync::Mutex;
use tracing::debug;
use tracing::info;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "phase", content = "index")]
pub enum Phase {
    Idle,
    CheckingCache,
    CacheHit,
    /// Index into [`Orchestrator::sources`].
    TryingSource(usize),
    Resolved,
    Exhausted,
}

#[derive(Debug)]
struct OrchestratorState {
    current: Option<Arc<Dataset>>,
    phase: Phase,
}

pub struct Orchestrator {
    sources: Vec<Arc<dyn SourceAdapter>>,
    cache: Arc<CacheStore>,
    clock: Arc<dyn Clock>,
    state: RwLock<OrchestratorState>,
    gate: Mutex<()>,
    broadcaster: Broadcaster,
    stats: PipelineStats,
}

impl Orchestrator {
    pub fn builder(cache: Arc<CacheStore>) -> OrchestratorBuilder {
        OrchestratorBuilder::new(cache)
    }

    /// Produce the dataset, reusing today's copy unless `force_refresh`.
    ///
    /// Calls are serialised; a caller that queued behind an in-flight
    /// resolution sees that resolution's result through the cache check.
    pub async fn resolve(&self, force_refresh: bool) -> Result<Arc<Dataset>, ResolveError> {
        let _gate = self.gate.lock().await;
        let now = self.clock.now();

        if !force_refresh {
            self.set_phase(Phase::CheckingCache);
            if let Some(hit) = self.reusable_dataset(now) {
                self.set_phase(Phase::CacheHit);
                self.stats.record_cache_hit();
                info!(
                    source = %hit.provenance(),
                    records = hit.len(),
                    "reusing dataset loaded today"
                );
                self.broadcaster
                    .publish(ResolutionEvent::Resolved(Arc::clone(&hit)));
                self.set_phase(Phase::Resolved);
                return Ok(hit);
            }
        }

        match self.cache.backup_date() {
            Ok(Some(date)) => debug!(backup_date = %date, "backup snapshot available"),
            Ok(None) => debug!("no backup snapshot"),
            Err(err) => warn!(error = %err, "could not read backup date"),
        }

        let ctx = FetchContext::new(now, force_refresh);
        let mut failures = Vec::new();
        for (index, source) in self.sources.iter().enumerate() {
            self.set_phase(Phase::TryingSource(index));
            let tag = source.source();
            match attempt(source.as_ref(), &ctx).await {
                Ok(dataset) => {
                    if !failures.is_empty() {
                        self.stats.record_fallback();
                    }
                    let resolved = self.settle(dataset, now, tag);
                    info!(
                        resolution = %ctx.resolution_id,
                        source = %tag,
                        records = resolved.len(),
                        skipped = failures.len(),
                        "dataset resolved"
                    );
                    return Ok(resolved);
                }
                Err(reason) => {
                    warn!(resolution = %ctx.resolution_id, source = %tag, error = %reason, "source failed");
                    failures.push(SourceFailure {
                        source: tag,
                        reason,
                    });
                }
            }
        }

        self.set_phase(Phase::Exhausted);
        self.stats.record_exhaustion();
        Err(ResolveError::Exhausted { failures })
    }

    /// User-initiated refresh: drop the live cache entry, then resolve from scratch.
    pub async fn refresh(&self) -> Result<Arc<Dataset>, ResolveError> {
        self.invalidate();
        self.resolve(true).await
    }

    /// Remove the persisted live entry so the next remote read downloads in full.
    pub fn invalidate(&self) {
        if let Err(err) = self.cache.clear_live() {
            warn!(error = %err, "failed to clear live cache entry");
        }
    }

    /// Accept a dataset pushed by the remote subscription.
    pub async fn apply_push(&self, dataset: Dataset) -> Result<Arc<Dataset>, FetchError> {
        let _gate = self.gate.lock().await;
        let dataset = dataset.tagged(SourceTag::RemoteDbSubscription);
        validate::check(&dataset)?;

        let now = self.clock.now();
        if let Err(err) = self.cache.write_live(&dataset, now.with_timezone(&Utc)) {
            warn!(error = %err, "failed to cache pushed dataset");
        }
        self.stats.record_push();
        let resolved = self.settle(dataset, now, SourceTag::RemoteDbSubscription);
        info!(records = resolved.len(), "applied pushed dataset");
        Ok(resolved)
    }

    pub fn subscribe(&self) -> DatasetSubscriber {
        self.broadcaster.subscribe()
    }

    pub fn current(&self) -> Option<Arc<Dataset>> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .current
            .clone()
    }

    pub fn phase(&self) -> Phase {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .phase
    }

    pub fn provenance(&self) -> Option<Provenance> {
        self.current().map(|dataset| dataset.provenance())
    }

    pub fn stats(&self) -> PipelineSnapshot {
        self.stats.snapshot()
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    /// Registered sources, in the order they are tried.
    pub fn sources(&self) -> Vec<SourceTag> {
        self.sources.iter().map(|source| source.source()).collect()
    }

    pub(crate) fn notify_failure(&self, message: String, attempts: u32) {
        self.broadcaster
            .publish(ResolutionEvent::Failed { message, attempts });
    }

    fn reusable_dataset(&self, now: DateTime<FixedOffset>) -> Option<Arc<Dataset>> {
        if let Some(current) = self.current() {
            let fresh = current
                .loaded_at
                .is_some_and(|loaded_at| is_same_calendar_day(loaded_at, now));
            return (fresh && validate::validate(&current)).then_some(current);
        }

        let entry = match self.cache.live_entry() {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(err) => {
                warn!(error = %err, "could not read live cache entry");
                return None;
            }
        };
        let mut dataset = entry.dataset;
        let loaded_at = *dataset.loaded_at.get_or_insert(entry.saved_at);
        if !is_same_calendar_day(loaded_at, now) {
            debug!(loaded_at = %loaded_at, "persisted dataset is from another day");
            return None;
        }
        if !validate::validate(&dataset) {
            debug!("persisted dataset failed validation");
            return None;
        }
        let dataset = Arc::new(dataset);
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .current = Some(Arc::clone(&dataset));
        Some(dataset)
    }

    /// Stamp provenance, persist the backup for remote wins, publish.
    fn settle(&self, mut dataset: Dataset, now: DateTime<FixedOffset>, winner: SourceTag) -> Arc<Dataset> {
        dataset.loaded_at = Some(now.with_timezone(&Utc));
        if dataset.last_updated.is_none() {
            dataset.last_updated = Some(format_stamp(now));
        }
        if winner.is_remote() {
            if let Err(err) = self.cache.write_backup(&dataset, now) {
                warn!(source = %winner, error = %err, "failed to write backup snapshot");
            }
        }
        self.stats.record_win(winner);

        let dataset = Arc::new(dataset);
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state.current = Some(Arc::clone(&dataset));
            state.phase = Phase::Resolved;
        }
        self.broadcaster
            .publish(ResolutionEvent::Resolved(Arc::clone(&dataset)));
        dataset
    }

    fn set_phase(&self, phase: Phase) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .phase = phase;
    }
}

async fn attempt(source: &dyn SourceAdapter, ctx: &FetchContext) -> Result<Dataset, FetchError> {
    let dataset = source.fetch(ctx).await?;
    source.validate(&dataset)?;
    Ok(dataset)
}

pub struct OrchestratorBuilder {
    cache: Arc<CacheStore>,
    clock: Arc<dyn Clock>,
    sources: Vec<Arc<dyn SourceAdapter>>,
    include_sample: bool,
}

impl OrchestratorBuilder {
    pub fn new(cache: Arc<CacheStore>) -> Self {
        Self {
            cache,
            clock: Arc::new(SystemClock),
            sources: Vec::new(),
            include_sample: true,
        }
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Register a source; registration order does not matter.
    pub fn source(mut self, source: Arc<dyn SourceAdapter>) -> Self {
        self.sources.push(source);
        self
    }

    /// Leave out the built-in sample so resolution can fail outright.
    pub fn without_sample(mut self) -> Self {
        self.include_sample = false;
        self
    }

    pub fn build(self) -> Orchestrator {
        let mut sources = self.sources;
        if !self.include_sample {
            sources.retain(|source| source.source() != SourceTag::SampleData);
        } else if !sources
            .iter()
            .any(|source| source.source() == SourceTag::SampleData)
        {
            sources.push(Arc::new(SampleDataAdapter));
        }
        sources.sort_by_key(|source| source.source().priority());

        Orchestrator {
            sources,
            cache: self.cache,
            clock: self.clock,
            state: RwLock::new(OrchestratorState {
                current: None,
                phase: Phase::Idle,
            }),
            gate: Mutex::new(()),
            broadcaster: Broadcaster::default(),
            stats: PipelineStats::default(),
        }
    }
}
