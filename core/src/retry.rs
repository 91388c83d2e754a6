use crate::dataset::Dataset;
use crate::error::RetryError;
use crate::orchestrator::Orchestrator;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;
use tracing::info;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Linear backoff: the wait after failed attempt `n` is `n * base_delay`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    fn ceiling(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// `[retry]` section of the config file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: policy.base_delay.as_millis() as u64,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }
}

/// Re-runs whole resolutions when every source failed.
pub struct RetryController {
    orchestrator: Arc<Orchestrator>,
    policy: RetryPolicy,
}

impl RetryController {
    pub fn new(orchestrator: Arc<Orchestrator>, policy: RetryPolicy) -> Self {
        Self {
            orchestrator,
            policy,
        }
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Each call starts counting from the first attempt.
    pub async fn run(&self, force_refresh: bool) -> Result<Arc<Dataset>, RetryError> {
        let ceiling = self.policy.ceiling();
        let mut attempt = 1;
        loop {
            match self.orchestrator.resolve(force_refresh).await {
                Ok(dataset) => {
                    if attempt > 1 {
                        info!(attempt, "resolution succeeded after retry");
                    }
                    return Ok(dataset);
                }
                Err(err) if attempt < ceiling => {
                    let delay = self.policy.delay_after(attempt);
                    warn!(
                        attempt,
                        max_attempts = ceiling,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "resolution failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    error!(attempt, error = %err, "resolution failed, giving up");
                    self.orchestrator
                        .notify_failure(err.to_string(), attempt);
                    return Err(RetryError::Terminal {
                        attempts: attempt,
                        last: err,
                    });
                }
            }
        }
    }

    /// Force refresh with retries; drops the live cache entry first.
    pub async fn refresh(&self) -> Result<Arc<Dataset>, RetryError> {
        self.orchestrator.invalidate();
        self.run(true).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStore;
    use crate::dataset::Record;
    use crate::dataset::SourceTag;
    use crate::orchestrator::ResolutionEvent;
    use crate::sources::FetchContext;
    use crate::sources::FetchError;
    use crate::sources::SourceAdapter;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicU32;
    use std::sync::atomic::Ordering;
    use tokio::time::Instant;

    /// Fails until `succeed_on` calls have been made.
    struct Flaky {
        calls: AtomicU32,
        succeed_on: Option<u32>,
    }

    #[async_trait]
    impl SourceAdapter for Flaky {
        fn source(&self) -> SourceTag {
            SourceTag::LocalFile
        }

        async fn fetch(&self, _ctx: &FetchContext) -> Result<Dataset, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            match self.succeed_on {
                Some(n) if call >= n => Ok(Dataset {
                    records: vec![Record {
                        id: "1".to_string(),
                        address: Some("서울".to_string()),
                        property_type: Some("아파트".to_string()),
                        ..Record::default()
                    }],
                    ..Dataset::default()
                }
                .tagged(SourceTag::LocalFile)),
                _ => Err(FetchError::Missing("flaky".to_string())),
            }
        }
    }

    fn controller(succeed_on: Option<u32>) -> (RetryController, Arc<Flaky>) {
        let flaky = Arc::new(Flaky {
            calls: AtomicU32::new(0),
            succeed_on,
        });
        let orchestrator = Orchestrator::builder(Arc::new(CacheStore::in_memory()))
            .source(flaky.clone())
            .without_sample()
            .build();
        (
            RetryController::new(Arc::new(orchestrator), RetryPolicy::default()),
            flaky,
        )
    }

    #[test]
    fn delay_grows_linearly() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        let config = RetryConfig {
            max_attempts: 5,
            base_delay_ms: 250,
        };
        assert_eq!(
            RetryPolicy::from(&config).delay_after(3),
            Duration::from_millis(750)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_on_third_attempt() {
        let (controller, flaky) = controller(Some(3));
        let started = Instant::now();

        let dataset = controller.run(false).await.expect("third attempt");
        assert_eq!(dataset.source, Some(SourceTag::LocalFile));
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_ceiling_and_notifies() {
        let (controller, flaky) = controller(None);
        let events = controller.orchestrator().subscribe();
        let started = Instant::now();

        let err = controller.run(false).await.expect_err("never succeeds");
        assert_matches!(err, RetryError::Terminal { attempts: 3, .. });
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(3));
        assert_matches!(
            events.try_next(),
            Some(ResolutionEvent::Failed { attempts: 3, .. })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn every_run_starts_from_the_first_attempt() {
        let (controller, flaky) = controller(None);
        let _ = controller.run(false).await;
        let _ = controller.run(false).await;
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempts_still_tries_once() {
        let (controller, flaky) = controller(None);
        let controller = RetryController::new(
            Arc::clone(controller.orchestrator()),
            RetryPolicy {
                max_attempts: 0,
                base_delay: Duration::from_secs(1),
            },
        );
        assert_matches!(
            controller.run(false).await,
            Err(RetryError::Terminal { attempts: 1, .. })
        );
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 1);
    }
}
