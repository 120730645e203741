//! Batched candidate scoring and final ordering.
//!
//! Candidates are split into fixed-size batches so no single scoring call
//! carries the whole pool. Batches are scored concurrently; a batch that
//! fails or exceeds the stage timeout is skipped rather than sinking the
//! round. Surviving scores are merged in batch order and stably sorted by
//! descending score, so equal-scored candidates keep their arrival order.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};

use leadscout_agents::BatchScorer;
use leadscout_shared::{CandidateProfile, EventDescription, PipelineConfig, ScoredCandidate};

/// Split candidates into scoring batches of at most `batch_size`.
pub fn partition_batches(
    candidates: &[CandidateProfile],
    batch_size: usize,
) -> Vec<Vec<CandidateProfile>> {
    candidates
        .chunks(batch_size.max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}

/// Drives concurrent batch scoring for one round.
pub struct RankingCoordinator {
    scorer: Arc<dyn BatchScorer>,
    batch_size: usize,
    stage_timeout: Option<std::time::Duration>,
}

impl RankingCoordinator {
    pub fn new(scorer: Arc<dyn BatchScorer>, config: &PipelineConfig) -> Self {
        Self {
            scorer,
            batch_size: config.batch_size,
            stage_timeout: config.stage_timeout,
        }
    }

    /// Score every candidate and return them ordered best-first.
    #[instrument(skip_all, fields(candidates = candidates.len()))]
    pub async fn rank(
        &self,
        event: &EventDescription,
        candidates: &[CandidateProfile],
    ) -> Vec<ScoredCandidate> {
        let batches = partition_batches(candidates, self.batch_size);
        if batches.is_empty() {
            return Vec::new();
        }

        let total = batches.len();
        let mut tasks = JoinSet::new();
        for (index, batch) in batches.into_iter().enumerate() {
            let scorer = Arc::clone(&self.scorer);
            let event = event.clone();
            let stage_timeout = self.stage_timeout;
            tasks.spawn(async move {
                let outcome = match stage_timeout {
                    Some(limit) => {
                        match tokio::time::timeout(limit, scorer.score_batch(&event, &batch)).await
                        {
                            Ok(result) => result,
                            Err(_) => Err(leadscout_shared::LeadscoutError::Collaborator(
                                "scoring call timed out".into(),
                            )),
                        }
                    }
                    None => scorer.score_batch(&event, &batch).await,
                };
                (index, outcome)
            });
        }

        // Slots keep batch order stable regardless of completion order.
        let mut slots: Vec<Vec<ScoredCandidate>> = vec![Vec::new(); total];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(scored))) => slots[index] = scored,
                Ok((index, Err(error))) => {
                    warn!(batch = index, %error, "skipping failed scoring batch");
                }
                Err(error) => {
                    warn!(%error, "scoring task panicked");
                }
            }
        }

        let mut ranked: Vec<ScoredCandidate> = slots.into_iter().flatten().collect();
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        debug!(ranked = ranked.len(), batches = total, "ranking finished");
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use leadscout_shared::{LeadscoutError, Result};

    fn profile(name: &str) -> CandidateProfile {
        CandidateProfile {
            name: Some(name.to_string()),
            ..CandidateProfile::default()
        }
    }

    fn config_with_batch(batch_size: usize) -> PipelineConfig {
        PipelineConfig {
            batch_size,
            ..PipelineConfig::default()
        }
    }

    /// Scores each profile by a number embedded in its name ("Ada:7" -> 7).
    struct NameScorer;

    #[async_trait]
    impl BatchScorer for NameScorer {
        async fn score_batch(
            &self,
            _event: &EventDescription,
            batch: &[CandidateProfile],
        ) -> Result<Vec<ScoredCandidate>> {
            Ok(batch
                .iter()
                .map(|p| {
                    let score = p
                        .name
                        .as_deref()
                        .and_then(|n| n.rsplit(':').next())
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(0);
                    ScoredCandidate {
                        profile: p.clone(),
                        score,
                        explanation: String::new(),
                    }
                })
                .collect())
        }
    }

    /// Fails whenever the batch contains a profile named "poison".
    struct PoisonScorer;

    #[async_trait]
    impl BatchScorer for PoisonScorer {
        async fn score_batch(
            &self,
            _event: &EventDescription,
            batch: &[CandidateProfile],
        ) -> Result<Vec<ScoredCandidate>> {
            if batch.iter().any(|p| p.name.as_deref() == Some("poison")) {
                return Err(LeadscoutError::Collaborator("model refused".into()));
            }
            Ok(batch
                .iter()
                .map(|p| ScoredCandidate {
                    profile: p.clone(),
                    score: 5,
                    explanation: String::new(),
                })
                .collect())
        }
    }

    /// Never returns for the batch containing "slow".
    struct StallingScorer;

    #[async_trait]
    impl BatchScorer for StallingScorer {
        async fn score_batch(
            &self,
            _event: &EventDescription,
            batch: &[CandidateProfile],
        ) -> Result<Vec<ScoredCandidate>> {
            if batch.iter().any(|p| p.name.as_deref() == Some("slow")) {
                tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
            }
            Ok(batch
                .iter()
                .map(|p| ScoredCandidate {
                    profile: p.clone(),
                    score: 1,
                    explanation: String::new(),
                })
                .collect())
        }
    }

    #[test]
    fn partition_sizes_are_ceil_of_division() {
        let candidates: Vec<_> = (0..45).map(|i| profile(&format!("p{i}"))).collect();
        let batches = partition_batches(&candidates, 20);
        let sizes: Vec<_> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![20, 20, 5]);

        let rejoined: Vec<_> = batches.into_iter().flatten().collect();
        assert_eq!(rejoined, candidates);
    }

    #[test]
    fn partition_of_nothing_is_no_batches() {
        assert!(partition_batches(&[], 20).is_empty());
    }

    #[tokio::test]
    async fn equal_scores_keep_arrival_order() {
        let coordinator = RankingCoordinator::new(Arc::new(NameScorer), &config_with_batch(10));
        let candidates = vec![
            profile("first:7"),
            profile("best:9"),
            profile("second:7"),
            profile("last:3"),
        ];

        let ranked = coordinator.rank(&EventDescription::default(), &candidates).await;

        let names: Vec<_> = ranked
            .iter()
            .map(|s| s.profile.name.as_deref().unwrap_or(""))
            .collect();
        assert_eq!(names, vec!["best:9", "first:7", "second:7", "last:3"]);
    }

    #[tokio::test]
    async fn no_candidates_means_no_scoring_calls() {
        let coordinator = RankingCoordinator::new(Arc::new(PoisonScorer), &config_with_batch(20));
        let ranked = coordinator.rank(&EventDescription::default(), &[]).await;
        assert!(ranked.is_empty());
    }

    #[tokio::test]
    async fn failed_batch_is_skipped_not_fatal() {
        let coordinator = RankingCoordinator::new(Arc::new(PoisonScorer), &config_with_batch(2));
        let candidates = vec![
            profile("good a"),
            profile("good b"),
            profile("poison"),
            profile("good c"),
        ];

        let ranked = coordinator.rank(&EventDescription::default(), &candidates).await;

        assert_eq!(ranked.len(), 2);
        assert!(ranked
            .iter()
            .all(|s| s.profile.name.as_deref() != Some("poison")));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_batch_is_cut_off_by_stage_timeout() {
        let config = PipelineConfig {
            batch_size: 2,
            stage_timeout: Some(std::time::Duration::from_secs(120)),
            ..PipelineConfig::default()
        };
        let coordinator = RankingCoordinator::new(Arc::new(StallingScorer), &config);
        let candidates = vec![profile("ok a"), profile("ok b"), profile("slow")];

        let ranked = coordinator.rank(&EventDescription::default(), &candidates).await;

        assert_eq!(ranked.len(), 2);
    }
}
