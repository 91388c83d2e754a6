//! Auction listing acquisition pipeline.
//!
//! Resolves the dashboard dataset from an ordered chain of sources (remote
//! realtime database, local JSON files, backup snapshot, in-memory slot,
//! built-in sample), caches the result and fans it out to consumers.

pub mod bootstrap;
pub mod cache;
pub mod clock;
pub mod config;
pub mod dataset;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod retry;
pub mod sources;
pub mod validate;

pub use bootstrap::Pipeline;
pub use bootstrap::PipelineError;
pub use cache::CacheStore;
pub use clock::Clock;
pub use clock::SystemClock;
pub use config::Config;
pub use config::ConfigOverrides;
pub use dataset::Dataset;
pub use dataset::Provenance;
pub use dataset::Record;
pub use dataset::SourceTag;
pub use error::ResolveError;
pub use error::RetryError;
pub use orchestrator::DatasetSubscriber;
pub use orchestrator::Orchestrator;
pub use orchestrator::OrchestratorBuilder;
pub use orchestrator::Phase;
pub use orchestrator::ResolutionEvent;
pub use retry::RetryController;
pub use retry::RetryPolicy;
pub use sources::FetchContext;
pub use sources::FetchError;
pub use sources::SourceAdapter;
