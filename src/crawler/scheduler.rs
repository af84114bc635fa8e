//! Periodic crawl scheduling and graceful shutdown
//!
//! The scheduler drives the top-level loop: every `poll-period-secs` it
//! starts one crawl cycle (discovery followed by a concurrent fan-out over
//! the discovered posts) without waiting for the previous cycle's downloads
//! to finish. The period is measured from the start of a cycle, so a slow
//! cycle may overlap the next one; directory-existence dedup plus the
//! session's claim set keep overlapping cycles from duplicating work.
//!
//! On cancellation the scheduler stops ticking, joins every outstanding
//! cycle (each unwinds quickly once `Cancelled` propagates through its
//! fetches), and only then lets the session drop, closing the connection
//! pool.

use crate::config::Config;
use crate::crawler::discovery::discover_posts;
use crate::crawler::fetcher::FetchError;
use crate::crawler::processor::{process_post, PostOutcome};
use crate::crawler::session::CrawlSession;
use futures::future::join_all;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

/// Lifecycle of the scheduling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Draining,
    Stopped,
}

/// Top-level periodic scheduler
///
/// Owns the set of outstanding cycle tasks so that shutdown knows exactly
/// what is still in flight; cancellation scope is the session's token and
/// nothing else.
pub struct Scheduler {
    config: Arc<Config>,
    session: Arc<CrawlSession>,
    cycles: JoinSet<()>,
    state: SchedulerState,
    next_cycle: u64,
}

impl Scheduler {
    pub fn new(config: Arc<Config>, session: Arc<CrawlSession>) -> Self {
        Self {
            config,
            session,
            cycles: JoinSet::new(),
            state: SchedulerState::Idle,
            next_cycle: 0,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Runs the scheduling loop until the session is cancelled, then drains
    ///
    /// The first cycle starts immediately; subsequent cycles start on period
    /// boundaries regardless of whether earlier cycles have finished.
    pub async fn run(&mut self) -> crate::Result<()> {
        self.state = SchedulerState::Running;
        tracing::info!(
            "Scheduler running: polling every {}s, up to {} posts per cycle",
            self.config.crawler.poll_period_secs,
            self.config.crawler.posts_per_cycle
        );

        let mut ticker = tokio::time::interval(self.config.crawler.poll_period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let cancel = self.session.cancel_token();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.reap_finished_cycles();
                    self.spawn_cycle();
                }
            }
        }

        self.drain().await;
        Ok(())
    }

    fn spawn_cycle(&mut self) {
        let cycle = self.next_cycle;
        self.next_cycle += 1;

        let session = Arc::clone(&self.session);
        let config = Arc::clone(&self.config);
        self.cycles.spawn(async move {
            run_cycle(&session, &config, cycle).await;
        });
    }

    /// Discards handles of cycles that already completed
    fn reap_finished_cycles(&mut self) {
        while let Some(result) = self.cycles.try_join_next() {
            if let Err(e) = result {
                tracing::error!("Crawl cycle task failed: {}", e);
            }
        }
    }

    /// Joins every outstanding cycle, then stops
    ///
    /// Expected cancellation fallout was already suppressed inside the
    /// cycles themselves; only panics surface here.
    async fn drain(&mut self) {
        self.state = SchedulerState::Draining;
        tracing::info!(
            "Draining {} outstanding crawl cycle(s)",
            self.cycles.len()
        );

        while let Some(result) = self.cycles.join_next().await {
            if let Err(e) = result {
                if !e.is_cancelled() {
                    tracing::error!("Crawl cycle task failed during drain: {}", e);
                }
            }
        }

        self.state = SchedulerState::Stopped;
        tracing::info!("Scheduler stopped");
    }
}

/// Runs one complete crawl cycle: discovery plus the post fan-out
///
/// All discovered posts are processed concurrently, bounded only by the
/// session's shared fetch budget. The call returns once every post in the
/// cycle has been handled. Cancellation is expected here and logged
/// quietly, never as an error.
pub async fn run_cycle(session: &CrawlSession, config: &Config, cycle: u64) {
    tracing::info!("Starting crawl cycle {}", cycle);

    let ids = match discover_posts(session, config).await {
        Ok(ids) => ids,
        Err(FetchError::Cancelled) => {
            tracing::debug!("Cycle {} cancelled during discovery", cycle);
            return;
        }
        Err(e) => {
            tracing::error!("Cycle {} discovery failed: {}", cycle, e);
            return;
        }
    };

    if ids.is_empty() {
        tracing::info!("Cycle {} discovered no posts", cycle);
        return;
    }

    let outcomes = join_all(ids.iter().map(|id| process_post(session, config, id))).await;

    let mut processed = 0;
    let mut skipped = 0;
    let mut failed = 0;
    let mut cancelled = false;

    for outcome in outcomes {
        match outcome {
            Ok(PostOutcome::Processed { .. }) => processed += 1,
            Ok(PostOutcome::Skipped) => skipped += 1,
            Ok(PostOutcome::Failed) => failed += 1,
            Err(FetchError::Cancelled) => cancelled = true,
            Err(e) => {
                tracing::warn!("Unexpected post failure in cycle {}: {}", cycle, e);
                failed += 1;
            }
        }
    }

    if cancelled {
        tracing::debug!("Cycle {} interrupted by shutdown", cycle);
        return;
    }

    tracing::info!(
        "Cycle {} complete: {} discovered, {} processed, {} skipped, {} failed",
        cycle,
        ids.len(),
        processed,
        skipped,
        failed
    );
}
