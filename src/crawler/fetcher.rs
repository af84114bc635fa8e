//! HTTP fetcher implementation
//!
//! This module handles all outbound HTTP requests for the crawler:
//! - Building the HTTP client with timeouts and compression
//! - Single-attempt fetches under the session's global fetch budget
//! - Failure classification (timeout vs. transport vs. cancelled)
//!
//! There is no retry here. A failed fetch is terminal for that one call;
//! whether to try again is the caller's policy (the crawler relies on the
//! next poll cycle instead of retrying).

use crate::crawler::session::CrawlSession;
use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single fetch attempt
///
/// `Cancelled` is special: it must always propagate to the caller so that
/// shutdown unwinds promptly, and it is only suppressed at the scheduler's
/// drain boundary. The other kinds are terminal for one fetch only.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Fetch cancelled by shutdown")]
    Cancelled,
}

impl FetchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

/// Builds the HTTP client shared by every fetch in a crawl run
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(concat!("magpie/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL once, under the session's fetch budget
///
/// Acquires one budget slot for the whole duration of the request (this is
/// the only place the budget is touched), races every await against the
/// session's cancellation token, and classifies failures.
///
/// # Arguments
///
/// * `session` - The shared crawl session
/// * `url` - The URL to fetch
///
/// # Returns
///
/// * `Ok(Bytes)` - The full response body
/// * `Err(FetchError)` - Timeout, transport failure, or cancellation
pub async fn fetch_bytes(session: &CrawlSession, url: &str) -> Result<Bytes, FetchError> {
    let _permit = session.acquire_fetch_slot().await?;

    let response = tokio::select! {
        _ = session.cancelled() => return Err(FetchError::Cancelled),
        result = session.client().get(url).send() => {
            result.map_err(|e| classify_error(url, e))?
        }
    };

    let response = response.error_for_status().map_err(|e| FetchError::Transport {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    let body = tokio::select! {
        _ = session.cancelled() => return Err(FetchError::Cancelled),
        result = response.bytes() => {
            result.map_err(|e| classify_error(url, e))?
        }
    };

    Ok(body)
}

fn classify_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
