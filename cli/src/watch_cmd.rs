use crate::SourceArgs;
use crate::summary_line;
use anyhow::Result;
use auctiondash_core::Config;
use auctiondash_core::Pipeline;
use auctiondash_core::ResolutionEvent;
use auctiondash_core::sources::RemoteSubscription;
use clap::Args;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::info;
use tracing::warn;

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Refresh period when push updates are unavailable.
    #[arg(long = "interval-secs", default_value_t = 300)]
    pub interval_secs: u64,
    #[command(flatten)]
    pub sources: SourceArgs,
}

pub async fn run(config: &Config, args: &WatchArgs) -> Result<()> {
    let pipeline = Pipeline::from_config(config)?;
    let events = pipeline.orchestrator.subscribe();

    match pipeline.resolve(false).await {
        Ok(dataset) => info!(source = %dataset.provenance(), "initial dataset ready"),
        Err(err) => warn!(error = %err, "initial resolution failed"),
    }

    let mut subscription = if pipeline.subscribe_enabled() {
        pipeline.start_subscription()
    } else {
        info!(
            interval_secs = args.interval_secs,
            "push updates disabled, refreshing periodically"
        );
        None
    };
    let mut ticker = tokio::time::interval(Duration::from_secs(args.interval_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            event = events.next() => match event {
                Some(ResolutionEvent::Resolved(dataset)) => println!("{}", summary_line(&dataset)),
                Some(ResolutionEvent::Failed { message, attempts }) => {
                    println!("failed after {attempts} attempts: {message}");
                }
                None => break,
            },
            () = ended(subscription.as_mut()), if subscription.is_some() => {
                warn!(
                    interval_secs = args.interval_secs,
                    "push subscription ended, refreshing periodically"
                );
                subscription = None;
                ticker.reset();
            }
            _ = ticker.tick(), if subscription.is_none() => {
                if let Err(err) = pipeline.resolve(true).await {
                    warn!(error = %err, "periodic refresh failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }
    drop(subscription);

    let stats = pipeline.orchestrator.stats();
    let cache = pipeline.cache.stats();
    info!(
        resolutions = stats.resolutions,
        cache_hits = stats.cache_hits,
        fallbacks = stats.fallbacks,
        pushes = stats.pushes,
        cache_hit_ratio = cache.hit_ratio(),
        "watch stopped"
    );
    Ok(())
}

async fn ended(subscription: Option<&mut RemoteSubscription>) {
    match subscription {
        Some(subscription) => subscription.ended().await,
        None => std::future::pending().await,
    }
}
