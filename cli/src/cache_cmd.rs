use crate::OutputFormat;
use crate::print_json;
use crate::summary_line;
use anyhow::Result;
use auctiondash_core::Config;
use auctiondash_core::bootstrap::open_cache;
use clap::Args;
use serde_json::json;

#[derive(Debug, Args)]
pub struct StatusArgs {
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

pub fn run_status(config: &Config, args: &StatusArgs) -> Result<()> {
    let cache = open_cache(config)?;
    let live = cache.live_entry()?;
    let stamp = cache.last_updated_stamp()?;
    let backup = cache.backup_entry()?;
    let backup_date = cache.backup_date()?;

    match args.format {
        OutputFormat::Json => print_json(&json!({
            "cache_path": config.cache_path(),
            "live": live.as_ref().map(|entry| json!({
                "provenance": entry.dataset.provenance(),
                "records": entry.dataset.len(),
                "saved_at": entry.saved_at,
                "last_updated": stamp,
            })),
            "backup": backup.as_ref().map(|entry| json!({
                "provenance": entry.dataset.provenance(),
                "records": entry.dataset.len(),
                "saved_at": entry.saved_at,
                "date": backup_date,
            })),
        })),
        OutputFormat::Text => {
            println!("cache: {}", config.cache_path().display());
            match live {
                Some(entry) => println!(
                    "live: {} saved_at={}",
                    summary_line(&entry.dataset),
                    entry.saved_at.to_rfc3339()
                ),
                None => println!("live: none"),
            }
            match backup {
                Some(entry) => println!(
                    "backup: {} date={}",
                    summary_line(&entry.dataset),
                    backup_date.as_deref().unwrap_or("-")
                ),
                None => println!("backup: none"),
            }
            Ok(())
        }
    }
}

pub fn run_clear(config: &Config) -> Result<()> {
    let cache = open_cache(config)?;
    cache.clear()?;
    println!("cleared cache at {}", config.cache_path().display());
    Ok(())
}
