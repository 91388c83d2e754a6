use crate::OutputFormat;
use crate::SourceArgs;
use crate::print_json;
use anyhow::Result;
use auctiondash_core::Config;
use auctiondash_core::Dataset;
use auctiondash_core::Pipeline;
use auctiondash_core::SourceTag;
use clap::Args;

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Ignore today's cached dataset and walk the sources again.
    #[arg(long = "force-refresh")]
    pub force_refresh: bool,
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    #[command(flatten)]
    pub sources: SourceArgs,
}

pub async fn run(config: &Config, args: &ResolveArgs) -> Result<()> {
    let pipeline = Pipeline::from_config(config)?;
    let dataset = pipeline.resolve(args.force_refresh).await?;
    match args.format {
        OutputFormat::Text => print_text(&dataset),
        OutputFormat::Json => print_json(&serde_json::to_value(&*dataset)?)?,
    }
    Ok(())
}

fn print_text(dataset: &Dataset) {
    let provenance = dataset.provenance();
    println!(
        "source: {}",
        provenance.source.map_or("unknown", SourceTag::as_str)
    );
    if let Some(loaded_at) = provenance.loaded_at {
        println!("loaded_at: {}", loaded_at.to_rfc3339());
    }
    if let Some(last_updated) = dataset.last_updated.as_deref() {
        println!("last_updated: {last_updated}");
    }
    println!("records: {}", dataset.len());
    if provenance.is_sample {
        println!("note: showing built-in sample data; no real source was reachable");
    }
}
