//! Shared per-run crawl session
//!
//! A [`CrawlSession`] owns everything a crawl run shares across tasks:
//! - the HTTP connection pool
//! - the global fetch budget (a counting semaphore)
//! - the cancellation token observed by every in-flight fetch
//! - the in-progress claim set that keeps overlapping cycles from
//!   double-processing a post before its directory marker exists
//!
//! The session is created once at startup, passed around behind an `Arc`,
//! and torn down (closing the pool) when the scheduler stops.

use crate::crawler::fetcher::{build_http_client, FetchError};
use crate::crawler::PostId;
use reqwest::Client;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

pub struct CrawlSession {
    client: Client,
    budget: Arc<Semaphore>,
    cancel: CancellationToken,
    in_progress: Mutex<HashSet<PostId>>,
}

impl CrawlSession {
    /// Creates a new session with a fetch budget of `max_concurrent_fetches`
    pub fn new(max_concurrent_fetches: usize) -> Result<Self, crate::MagpieError> {
        let client = build_http_client()?;

        Ok(Self {
            client,
            budget: Arc::new(Semaphore::new(max_concurrent_fetches)),
            cancel: CancellationToken::new(),
            in_progress: Mutex::new(HashSet::new()),
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// A clone of the session's cancellation token
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Resolves once the session has been cancelled
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Number of currently unused fetch slots
    pub fn available_fetch_slots(&self) -> usize {
        self.budget.available_permits()
    }

    /// Acquires one slot of the fetch budget, waiting if all are in use
    ///
    /// Returns [`FetchError::Cancelled`] if the session is cancelled before
    /// a slot frees up. The returned permit releases its slot on drop, on
    /// every exit path.
    pub async fn acquire_fetch_slot(&self) -> Result<OwnedSemaphorePermit, FetchError> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(FetchError::Cancelled),
            permit = self.budget.clone().acquire_owned() => {
                permit.map_err(|_| FetchError::Cancelled)
            }
        }
    }

    /// Claims a post for processing by the current cycle
    ///
    /// Returns `None` if another cycle currently holds the claim. The claim
    /// is released when the returned guard drops.
    pub fn claim_post(&self, id: &PostId) -> Option<PostClaim<'_>> {
        let mut in_progress = self.in_progress.lock().unwrap();
        if in_progress.insert(id.clone()) {
            Some(PostClaim {
                session: self,
                id: id.clone(),
            })
        } else {
            None
        }
    }
}

/// RAII guard for an in-progress post claim
pub struct PostClaim<'a> {
    session: &'a CrawlSession,
    id: PostId,
}

impl Drop for PostClaim<'_> {
    fn drop(&mut self) {
        if let Ok(mut in_progress) = self.session.in_progress.lock() {
            in_progress.remove(&self.id);
        }
    }
}
