//! Crawler module for post discovery, expansion, and download
//!
//! This module contains the core crawling logic, including:
//! - The shared crawl session (connection pool, fetch budget, cancellation)
//! - Bounded, cancellable HTTP fetching
//! - HTML/JSON extraction of post ids and download targets
//! - Per-post processing with directory-based deduplication
//! - The periodic scheduling loop and graceful shutdown

mod discovery;
mod downloader;
mod fetcher;
mod parser;
mod processor;
mod scheduler;
mod session;

pub use discovery::discover_posts;
pub use downloader::download_resource;
pub use fetcher::{build_http_client, fetch_bytes, FetchError};
pub use parser::{extract_post_ids, extract_targets, parse_index_ids};
pub use processor::{process_post, PostOutcome};
pub use scheduler::{run_cycle, Scheduler, SchedulerState};
pub use session::CrawlSession;

use crate::config::Config;
use crate::MagpieError;
use std::fmt;
use std::sync::Arc;

/// Opaque identifier of one aggregator post
///
/// Doubles as the dedup key and the name of the post's download directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PostId(String);

impl PostId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for PostId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// Runs the crawler until an interrupt signal arrives
///
/// This is the main entry point for the binary. It will:
/// 1. Create the download root directory (fatal on failure)
/// 2. Build the crawl session (HTTP pool + fetch budget + cancel token)
/// 3. Wire Ctrl-C to the session's cancellation token
/// 4. Drive the scheduler until it drains to `Stopped`
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(())` - Shut down cleanly after a stop signal
/// * `Err(MagpieError)` - Startup failed (e.g. download root not writable)
pub async fn run_crawler(config: Config) -> crate::Result<()> {
    tokio::fs::create_dir_all(&config.output.download_dir)
        .await
        .map_err(|source| MagpieError::DownloadRoot {
            path: config.output.download_dir.clone(),
            source,
        })?;

    let session = Arc::new(CrawlSession::new(config.crawler.max_concurrent_fetches)?);

    let cancel = session.cancel_token();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Received interrupt signal, shutting down");
                cancel.cancel();
            }
            Err(e) => tracing::error!("Unable to listen for shutdown signal: {}", e),
        }
    });

    let mut scheduler = Scheduler::new(Arc::new(config), session);
    scheduler.run().await
}
