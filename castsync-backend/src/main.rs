#![deny(unused_results)]
#![deny(unreachable_pub)]
#![deny(missing_debug_implementations)]
#![deny(rust_2018_idioms)]
#![deny(bad_style)]
#![deny(unused)]
#![deny(clippy::pedantic)]

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::prelude::*;

mod client;
mod config;
mod cover;
mod error;
mod sync;
mod tagger;

/// Download new podcast episodes from a feed and tag them for a music library.
#[derive(Debug, Parser)]
#[command(name = "castsync", version, about)]
struct Cli {
    /// Configuration file holding the `[feed]` table
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Report what would be downloaded without writing anything
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Echo URLs, resolved extensions and file names as they are computed
    #[arg(short, long)]
    verbose: bool,
}

/// Our own crates log at INFO, or DEBUG when verbose. Dependencies only get
/// to speak up with warnings.
fn log_filter(verbose: bool) -> Targets {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    Targets::new()
        .with_target("castsync", level)
        .with_target("castsync_data", level)
        .with_default(LevelFilter::WARN)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), error::Error> {
    let cli = Cli::parse();
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(log_filter(cli.verbose))
        .init();

    let config = config::Config::load(&cli.config)?;
    let client = client::FeedClient::new()?;
    let report = sync::Syncer::new(&config, &client, cli.dry_run).run().await?;

    if cli.dry_run {
        tracing::info!(
            "{} new entries, {} enclosures to download, {} already present",
            report.pending,
            report.would_download,
            report.already_present
        );
    } else {
        tracing::info!(
            "{} new entries, {} downloaded, {} already present, {} failed; watermark {}",
            report.pending,
            report.downloaded,
            report.already_present,
            report.failed,
            report.watermark
        );
    }
    Ok(())
}
