//! Throttled search fan-out with a hard fan-in deadline.
//!
//! One task is spawned per query. Launches are staggered by the throttle
//! delay so the upstream service never sees a burst, and each task carries
//! its own retry budget. The fan-in loop collects results until every task
//! has reported or the round deadline fires, whichever comes first. A fresh
//! channel is created per round and its receiver is dropped at the deadline,
//! so late responses have nowhere to land and cannot leak into a later round.

mod dedup;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use leadscout_agents::ProfileSearch;
use leadscout_shared::{CandidateProfile, PipelineConfig};

pub use dedup::dedup;

/// Outcome of one search round.
#[derive(Debug, Default)]
pub struct SearchOutcome {
    /// Raw results in arrival order, duplicates included.
    pub candidates: Vec<CandidateProfile>,
    /// Queries that reported before the deadline, including failed ones.
    pub completed: usize,
    /// True when the deadline fired with queries still outstanding.
    pub timed_out: bool,
}

/// Drives the fan-out for one round of queries.
pub struct SearchCoordinator {
    search: Arc<dyn ProfileSearch>,
    throttle_delay: Duration,
    retries: u32,
    backoff: Duration,
    timeout: Duration,
    limit: u32,
}

impl SearchCoordinator {
    pub fn new(search: Arc<dyn ProfileSearch>, config: &PipelineConfig) -> Self {
        Self {
            search,
            throttle_delay: config.throttle_delay,
            retries: config.search_retries.max(1),
            backoff: config.search_backoff,
            timeout: config.search_timeout,
            limit: config.search_limit,
        }
    }

    /// Run every query concurrently and collect whatever arrives in time.
    #[instrument(skip_all, fields(queries = queries.len()))]
    pub async fn run(&self, queries: &[String]) -> SearchOutcome {
        if queries.is_empty() {
            return SearchOutcome::default();
        }

        let (tx, mut rx) = mpsc::channel::<Vec<CandidateProfile>>(queries.len());
        for (index, query) in queries.iter().enumerate() {
            let tx = tx.clone();
            let search = Arc::clone(&self.search);
            let query = query.clone();
            let launch_delay = self.throttle_delay * index as u32;
            let retries = self.retries;
            let backoff = self.backoff;
            let limit = self.limit;

            tokio::spawn(async move {
                tokio::time::sleep(launch_delay).await;
                let profiles = search_with_retries(&*search, &query, limit, retries, backoff).await;
                // Send fails once the round has closed; the result is stale
                // at that point and gets dropped.
                let _ = tx.send(profiles).await;
            });
        }
        drop(tx);

        let deadline = Instant::now() + self.timeout;
        let mut outcome = SearchOutcome::default();
        loop {
            tokio::select! {
                received = rx.recv() => match received {
                    Some(profiles) => {
                        outcome.completed += 1;
                        outcome.candidates.extend(profiles);
                        if outcome.completed == queries.len() {
                            break;
                        }
                    }
                    None => break,
                },
                _ = tokio::time::sleep_until(deadline) => {
                    outcome.timed_out = true;
                    warn!(
                        completed = outcome.completed,
                        total = queries.len(),
                        "search deadline reached with queries outstanding"
                    );
                    break;
                }
            }
        }

        debug!(
            completed = outcome.completed,
            candidates = outcome.candidates.len(),
            timed_out = outcome.timed_out,
            "search round finished"
        );
        outcome
    }
}

/// One query's retry loop. Exhausted budgets collapse to an empty result so
/// a flaky query degrades the round instead of failing it.
async fn search_with_retries(
    search: &dyn ProfileSearch,
    query: &str,
    limit: u32,
    retries: u32,
    backoff: Duration,
) -> Vec<CandidateProfile> {
    for attempt in 1..=retries {
        match search.search(query, limit).await {
            Ok(profiles) => return profiles,
            Err(error) => {
                warn!(%query, attempt, retries, %error, "search attempt failed");
                if attempt < retries {
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
    Vec::new()
}
