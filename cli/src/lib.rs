pub mod cache_cmd;
pub mod resolve_cmd;
pub mod watch_cmd;

use anyhow::Result;
use auctiondash_core::Config;
use auctiondash_core::ConfigOverrides;
use auctiondash_core::Dataset;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use std::path::PathBuf;
use url::Url;

/// Resolve and inspect the auction dashboard dataset.
#[derive(Debug, Parser)]
#[command(name = "auctiondash", version)]
pub struct Cli {
    /// Config file to read instead of `<home>/config.toml`.
    #[arg(long = "config", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,
    /// Data home (defaults to $AUCTIONDASH_HOME or ~/.auctiondash).
    #[arg(long = "home", value_name = "DIR", global = true)]
    pub home: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve the dataset through the source chain and print it.
    Resolve(resolve_cmd::ResolveArgs),
    /// Show what the cache currently holds without fetching anything.
    Status(cache_cmd::StatusArgs),
    /// Remove the live cache entry and the backup snapshot.
    ClearCache,
    /// Resolve, then print a line for every pushed update until interrupted.
    Watch(watch_cmd::WatchArgs),
}

/// Source selection shared by `resolve` and `watch`.
#[derive(Debug, Clone, Default, Args)]
pub struct SourceArgs {
    /// Skip the remote database entirely.
    #[arg(long = "no-remote")]
    pub no_remote: bool,
    /// Remote database root, overriding `[remote] database_url`.
    #[arg(long = "database-url", value_name = "URL", conflicts_with = "no_remote")]
    pub database_url: Option<Url>,
    /// Directory or http(s) URL searched for the local export.
    #[arg(long = "local-base", value_name = "PATH_OR_URL")]
    pub local_base: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl Cli {
    pub fn load_config(&self, sources: Option<&SourceArgs>) -> Result<Config> {
        let sources = sources.cloned().unwrap_or_default();
        let config = Config::load(ConfigOverrides {
            home: self.home.clone(),
            config_path: self.config.clone(),
            database_url: sources.database_url,
            local_base: sources.local_base,
            disable_remote: sources.no_remote,
        })?;
        Ok(config)
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Command::Resolve(args) => {
            let config = cli.load_config(Some(&args.sources))?;
            resolve_cmd::run(&config, args).await
        }
        Command::Status(args) => {
            let config = cli.load_config(None)?;
            cache_cmd::run_status(&config, args)
        }
        Command::ClearCache => {
            let config = cli.load_config(None)?;
            cache_cmd::run_clear(&config)
        }
        Command::Watch(args) => {
            let config = cli.load_config(Some(&args.sources))?;
            watch_cmd::run(&config, args).await
        }
    }
}

pub(crate) fn summary_line(dataset: &Dataset) -> String {
    format!(
        "{} records={} last_updated={}",
        dataset.provenance(),
        dataset.len(),
        dataset.last_updated.as_deref().unwrap_or("-")
    )
}

pub(crate) fn print_json(value: &serde_json::Value) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
