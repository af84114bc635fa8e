//! Magpie main entry point
//!
//! This is the command-line interface for the Magpie top-post crawler.

use anyhow::Context;
use clap::Parser;
use magpie::config::{load_config, validate, Config};
use magpie::crawler::run_crawler;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Magpie: a top-post hoarder for news aggregators
///
/// Magpie polls a news aggregation site, discovers its current top posts,
/// and archives each new post's linked article plus every URL mentioned in
/// its comment thread into a per-post directory. Posts captured by an
/// earlier run are skipped.
#[derive(Parser, Debug)]
#[command(name = "magpie")]
#[command(version)]
#[command(about = "A top-post hoarder for news aggregators", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Poll period in seconds (overrides the config file)
    #[arg(long, value_name = "SECONDS")]
    period: Option<u64>,

    /// Download root directory (overrides the config file)
    #[arg(long, value_name = "DIR")]
    directory: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("failed to load config {}", path.display()))?
        }
        None => {
            tracing::info!("No config file given, using built-in defaults");
            Config::default()
        }
    };

    // CLI overrides, re-validated since they bypass the file loader
    if let Some(period) = cli.period {
        config.crawler.poll_period_secs = period;
    }
    if let Some(directory) = cli.directory {
        config.output.download_dir = directory;
    }
    validate(&config).context("invalid configuration")?;

    tracing::info!(
        "Target: {} ({} posts per cycle, {} concurrent fetches, downloads in {})",
        config.target.base_url,
        config.crawler.posts_per_cycle,
        config.crawler.max_concurrent_fetches,
        config.output.download_dir.display()
    );

    match run_crawler(config).await {
        Ok(()) => {
            tracing::info!("Crawler shut down cleanly");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawler failed: {}", e);
            Err(e.into())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("magpie=info,warn"),
            1 => EnvFilter::new("magpie=debug,info"),
            2 => EnvFilter::new("magpie=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
