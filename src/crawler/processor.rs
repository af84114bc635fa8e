//! Per-post processing
//!
//! Expands one discovered post into its download set and fans out the
//! downloader over every target. The post's directory is created only after
//! its detail page has been fetched and parsed successfully — creating it is
//! the dedup commit point, so a post whose detail fetch fails stays eligible
//! for the next cycle instead of being skipped forever.

use crate::config::Config;
use crate::crawler::downloader::download_resource;
use crate::crawler::fetcher::{fetch_bytes, FetchError};
use crate::crawler::parser;
use crate::crawler::session::CrawlSession;
use crate::crawler::PostId;
use futures::future::join_all;
use std::io::ErrorKind;

/// How one post fared in a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostOutcome {
    /// Directory created and all targets attempted
    Processed { targets: usize, saved: usize },

    /// Already captured, or claimed by an overlapping cycle
    Skipped,

    /// Detail fetch/extraction/directory creation failed; will be retried
    /// in a later cycle
    Failed,
}

/// Processes a single post
///
/// # Arguments
///
/// * `session` - The shared crawl session
/// * `config` - The crawler configuration
/// * `id` - The post to process
///
/// # Returns
///
/// * `Ok(PostOutcome)` - The post was handled; failures were local
/// * `Err(FetchError::Cancelled)` - Shutdown in progress
pub async fn process_post(
    session: &CrawlSession,
    config: &Config,
    id: &PostId,
) -> Result<PostOutcome, FetchError> {
    let directory = config.output.download_dir.join(id.as_str());

    if tokio::fs::try_exists(&directory).await.unwrap_or(false) {
        tracing::info!("Post {} already captured, skipping", id);
        return Ok(PostOutcome::Skipped);
    }

    // Overlapping cycles race on the existence check above; the claim set
    // serializes them within this process.
    let Some(_claim) = session.claim_post(id) else {
        tracing::debug!("Post {} is being processed by another cycle, skipping", id);
        return Ok(PostOutcome::Skipped);
    };

    tracing::info!("Processing post {}", id);

    let detail_url = config.target.detail_url(id);
    let body = match fetch_bytes(session, &detail_url).await {
        Ok(body) => body,
        Err(FetchError::Cancelled) => return Err(FetchError::Cancelled),
        Err(e) => {
            tracing::warn!("Failed to fetch detail page for post {}: {}", id, e);
            return Ok(PostOutcome::Failed);
        }
    };

    if body.is_empty() {
        tracing::warn!("Empty detail page for post {}", id);
        return Ok(PostOutcome::Failed);
    }

    let html = String::from_utf8_lossy(&body);
    let targets = parser::extract_targets(&html, &config.target.base_url);
    if targets.is_empty() {
        tracing::warn!("No download targets extracted for post {}", id);
        return Ok(PostOutcome::Failed);
    }

    // Commit point: from here on the post counts as captured.
    match tokio::fs::create_dir(&directory).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            tracing::info!("Post {} captured by a concurrent run, skipping", id);
            return Ok(PostOutcome::Skipped);
        }
        Err(e) => {
            tracing::warn!(
                "Failed to create directory {} for post {}: {}",
                directory.display(),
                id,
                e
            );
            return Ok(PostOutcome::Failed);
        }
    }

    let results = join_all(
        targets
            .iter()
            .map(|target| download_resource(session, target, &directory)),
    )
    .await;

    let mut saved = 0;
    let mut cancelled = false;
    for result in results {
        match result {
            Ok(true) => saved += 1,
            Ok(false) => {}
            Err(FetchError::Cancelled) => cancelled = true,
            Err(e) => tracing::warn!("Unexpected download error for post {}: {}", id, e),
        }
    }

    if cancelled {
        return Err(FetchError::Cancelled);
    }

    tracing::info!(
        "Post {} captured: {} of {} targets saved",
        id,
        saved,
        targets.len()
    );

    Ok(PostOutcome::Processed {
        targets: targets.len(),
        saved,
    })
}

// End-to-end behavior (skip-on-existing-directory, no-directory-on-failed-
// detail-fetch, duplicate-target collapse) is exercised with wiremock and
// tempfile in tests/crawl_tests.rs.
