//! End-to-end discovery pipeline: event → keywords → queries → search →
//! rank → assess, with a bounded refine-and-retry loop.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument, warn};

use leadscout_agents::Collaborators;
use leadscout_ranking::RankingCoordinator;
use leadscout_search::{SearchCoordinator, dedup};
use leadscout_shared::{
    CandidateProfile, EventDescription, KeywordSet, LeadscoutError, PipelineConfig,
    QualityVerdict, Result, RunId, ScoredCandidate,
};

/// Result of one pipeline run.
#[derive(Debug)]
pub struct RunOutcome {
    /// Run identifier.
    pub run_id: RunId,
    /// Wall-clock time the run started.
    pub started_at: chrono::DateTime<chrono::Utc>,
    /// Final leads, best first, at most `top_n`.
    pub leads: Vec<ScoredCandidate>,
    /// Rounds actually executed (1..=max_rounds).
    pub rounds: u32,
    /// Queries in effect during the final round.
    pub queries: Vec<String>,
    /// Unique candidates in the final round's pool.
    pub candidates_seen: usize,
    /// Total elapsed time.
    pub elapsed: std::time::Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when a search round closes.
    fn round_finished(&self, round: u32, candidates: usize);
    /// Called when the pipeline completes.
    fn done(&self, outcome: &RunOutcome);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn round_finished(&self, _round: u32, _candidates: usize) {}
    fn done(&self, _outcome: &RunOutcome) {}
}

/// Mutable state of a run in flight. Owning it here (rather than anything
/// process-global) keeps concurrent runs fully independent. The candidate
/// pool and ranked list are round-scoped: each round starts them fresh,
/// while the query list and round counter carry forward.
struct PipelineRun {
    round: u32,
    queries: Vec<String>,
    pool: Vec<CandidateProfile>,
    ranked: Vec<ScoredCandidate>,
}

/// Run the full discovery pipeline.
///
/// 1. Extract keywords from the event
/// 2. Generate search queries
/// 3. Fan out searches, dedup the pool
/// 4. Score in batches, rank
/// 5. Assess quality; refine queries and repeat up to `max_rounds`
#[instrument(skip_all, fields(run_id = tracing::field::Empty, event = %event.name))]
pub async fn run(
    config: &PipelineConfig,
    collaborators: &Collaborators,
    event: &EventDescription,
    progress: &dyn ProgressReporter,
) -> Result<RunOutcome> {
    let start = Instant::now();
    let started_at = chrono::Utc::now();
    let run_id = RunId::new();
    tracing::Span::current().record("run_id", tracing::field::display(&run_id));

    info!(%run_id, "starting discovery pipeline");

    // --- Phase 1: Keywords ---
    progress.phase("Extracting keywords");
    let keywords = collaborators.keywords.extract_keywords(event).await?;
    info!(
        organizations = keywords.organizations.len(),
        institutions = keywords.institutions.len(),
        roles = keywords.roles.len(),
        "keywords extracted"
    );

    // --- Phase 2: Queries ---
    progress.phase("Generating search queries");
    let queries = collaborators
        .queries
        .generate_queries(event, &keywords)
        .await?;
    if queries.is_empty() {
        return Err(LeadscoutError::validation(
            "query generation produced no queries",
        ));
    }
    info!(queries = queries.len(), "initial queries generated");

    let searcher = SearchCoordinator::new(Arc::clone(&collaborators.search), config);
    let ranker = RankingCoordinator::new(Arc::clone(&collaborators.scorer), config);

    let mut run = PipelineRun {
        round: 1,
        queries,
        pool: Vec::new(),
        ranked: Vec::new(),
    };

    // --- Phase 3: Search / rank / assess rounds ---
    loop {
        progress.phase("Searching");
        let outcome = searcher.run(&run.queries).await;
        run.pool = dedup(outcome.candidates);
        progress.round_finished(run.round, run.pool.len());
        info!(
            round = run.round,
            completed = outcome.completed,
            timed_out = outcome.timed_out,
            pool = run.pool.len(),
            "search round finished"
        );

        progress.phase("Ranking candidates");
        run.ranked = ranker.rank(event, &run.pool).await;

        progress.phase("Assessing quality");
        let verdict = assess_round(config, collaborators, event, &run).await;

        if verdict.is_high_quality {
            info!(round = run.round, "quality gate passed");
            break;
        }
        if run.round >= config.max_rounds {
            info!(
                round = run.round,
                "round budget exhausted, returning best effort"
            );
            break;
        }

        progress.phase("Refining queries");
        run.queries = refine_queries(collaborators, event, &keywords, &run, &verdict.issues).await;
        run.round += 1;
    }

    let mut leads = run.ranked;
    leads.truncate(config.top_n);

    let outcome = RunOutcome {
        run_id,
        started_at,
        leads,
        rounds: run.round,
        queries: run.queries,
        candidates_seen: run.pool.len(),
        elapsed: start.elapsed(),
    };

    info!(
        leads = outcome.leads.len(),
        rounds = outcome.rounds,
        candidates_seen = outcome.candidates_seen,
        elapsed_ms = outcome.elapsed.as_millis() as u64,
        "pipeline complete"
    );
    progress.done(&outcome);
    Ok(outcome)
}

/// Quality-check the round's pool. An empty pool fails without spending an
/// LLM call; an assessor failure passes the gate so a broken judge cannot
/// burn the remaining round budget.
async fn assess_round(
    config: &PipelineConfig,
    collaborators: &Collaborators,
    event: &EventDescription,
    run: &PipelineRun,
) -> QualityVerdict {
    if run.pool.is_empty() {
        return QualityVerdict {
            is_high_quality: false,
            issues: "the searches returned no candidates".into(),
        };
    }

    let sample = &run.pool[..run.pool.len().min(config.sample_size)];
    let call = collaborators.assessor.assess(event, &run.queries, sample);
    let verdict = match config.stage_timeout {
        Some(limit) => match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(LeadscoutError::Collaborator(
                "quality assessment timed out".into(),
            )),
        },
        None => call.await,
    };

    match verdict {
        Ok(verdict) => verdict,
        Err(error) => {
            warn!(round = run.round, %error, "quality assessment failed, accepting round");
            QualityVerdict {
                is_high_quality: true,
                issues: String::new(),
            }
        }
    }
}

/// Ask for improved queries. A failed or empty refinement keeps the prior
/// queries so the next round still runs.
async fn refine_queries(
    collaborators: &Collaborators,
    event: &EventDescription,
    keywords: &KeywordSet,
    run: &PipelineRun,
    issues: &str,
) -> Vec<String> {
    match collaborators
        .refiner
        .refine_queries(event, keywords, &run.queries, &run.pool, issues)
        .await
    {
        Ok(refined) if !refined.is_empty() => {
            info!(round = run.round, queries = refined.len(), "queries refined");
            refined
        }
        Ok(_) => {
            warn!(round = run.round, "refinement returned no queries, reusing prior set");
            run.queries.clone()
        }
        Err(error) => {
            warn!(round = run.round, %error, "refinement failed, reusing prior set");
            run.queries.clone()
        }
    }
}
