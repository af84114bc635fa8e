//! Single-resource downloader
//!
//! Fetches one URL and persists the payload into a post's directory under a
//! collision-resistant random filename. Failures here are local: a download
//! that times out, errors, or cannot be written is logged and swallowed so
//! that sibling downloads in the same fan-out keep going. Cancellation is
//! the one exception and always propagates.

use crate::crawler::fetcher::{fetch_bytes, FetchError};
use crate::crawler::session::CrawlSession;
use rand::Rng;
use std::path::Path;
use tokio::io::AsyncWriteExt;

const FILENAME_LEN: usize = 10;
const FILENAME_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Generates a random lowercase-alphanumeric filename
pub fn random_filename() -> String {
    let mut rng = rand::rng();
    (0..FILENAME_LEN)
        .map(|_| FILENAME_CHARSET[rng.random_range(0..FILENAME_CHARSET.len())] as char)
        .collect()
}

/// Downloads one URL into `directory`
///
/// # Returns
///
/// * `Ok(true)` - A file was written
/// * `Ok(false)` - The download failed or was empty; logged, not an error
/// * `Err(FetchError::Cancelled)` - Shutdown in progress
pub async fn download_resource(
    session: &CrawlSession,
    url: &str,
    directory: &Path,
) -> Result<bool, FetchError> {
    let body = match fetch_bytes(session, url).await {
        Ok(body) => body,
        Err(FetchError::Cancelled) => return Err(FetchError::Cancelled),
        Err(e) => {
            tracing::warn!("Download of {} failed: {}", url, e);
            return Ok(false);
        }
    };

    if body.is_empty() {
        tracing::debug!("Empty response body for {}, nothing to save", url);
        return Ok(false);
    }

    let path = directory.join(random_filename());
    tracing::info!("Saving {} to {}", url, path.display());

    match write_payload(&path, &body).await {
        Ok(()) => Ok(true),
        Err(e) => {
            tracing::warn!("Failed to write {}: {}", path.display(), e);
            Ok(false)
        }
    }
}

/// Writes the payload with the file handle scoped to this function
///
/// The handle is flushed on success and closed on every path; a partial
/// file after a failed write is acceptable and never aborts the process.
async fn write_payload(path: &Path, body: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(body).await?;
    file.flush().await?;
    Ok(())
}
