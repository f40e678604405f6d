//! CLI argument parsing and run dispatch.

pub mod args;

use anyhow::{Context, Result};
use args::Cli;
use clap::Parser;
use tracing::info;
use zonestats::Emission;

use crate::{config, logging};

/// Run the CLI application.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    // Files first, then flags and environment
    let raw = config::load(cli.conf.as_deref())?.merge(cli.to_raw());
    let config = raw.validate().context("invalid configuration")?;
    info!(
        zone = %config.zone,
        source = %config.source,
        resolvers = config.resolvers.len(),
        dry_run = config.dry_run,
        "starting run"
    );

    let outcome = zonestats::run(config).await?;
    info!(
        records = outcome.summary.records,
        deliveries = outcome.summary.deliveries,
        bytes = outcome.metrics.len(),
        "run complete"
    );

    if let Emission::DryRun(request) = &outcome.emission {
        print!("{request}");
    }
    Ok(())
}
