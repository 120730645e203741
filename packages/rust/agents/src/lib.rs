//! Collaborator interfaces and HTTP clients for Leadscout.
//!
//! The pipeline core never talks HTTP directly: every external stage
//! (keyword extraction, query generation, profile search, batch scoring,
//! quality assessment, query refinement) sits behind a trait defined here,
//! so the orchestration layer can be exercised with in-process mocks.
//!
//! Production impls: [`GeminiClient`] for the LLM stages and [`LinkdClient`]
//! for profile search.

mod gemini;
mod json;
mod linkd;

use std::sync::Arc;

use async_trait::async_trait;

use leadscout_shared::{
    CandidateProfile, EventDescription, KeywordSet, QualityVerdict, Result, ScoredCandidate,
};

pub use gemini::GeminiClient;
pub use json::{decode_payload, strip_fences};
pub use linkd::LinkdClient;

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

/// Derives related organizations, institutions, and roles from an event.
#[async_trait]
pub trait KeywordExtractor: Send + Sync {
    async fn extract_keywords(&self, event: &EventDescription) -> Result<KeywordSet>;
}

/// Turns an event and keyword set into natural-language search queries.
#[async_trait]
pub trait QueryGenerator: Send + Sync {
    async fn generate_queries(
        &self,
        event: &EventDescription,
        keywords: &KeywordSet,
    ) -> Result<Vec<String>>;
}

/// Executes one people-search query against the external search service.
#[async_trait]
pub trait ProfileSearch: Send + Sync {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<CandidateProfile>>;
}

/// Scores one batch of candidates for relevance to the event.
#[async_trait]
pub trait BatchScorer: Send + Sync {
    async fn score_batch(
        &self,
        event: &EventDescription,
        batch: &[CandidateProfile],
    ) -> Result<Vec<ScoredCandidate>>;
}

/// Judges whether a round's candidates are good enough to stop refining.
#[async_trait]
pub trait QualityAssessor: Send + Sync {
    async fn assess(
        &self,
        event: &EventDescription,
        queries: &[String],
        sample: &[CandidateProfile],
    ) -> Result<QualityVerdict>;
}

/// Produces an improved query list for the next round.
#[async_trait]
pub trait QueryRefiner: Send + Sync {
    async fn refine_queries(
        &self,
        event: &EventDescription,
        keywords: &KeywordSet,
        prior_queries: &[String],
        candidates: &[CandidateProfile],
        issues: &str,
    ) -> Result<Vec<String>>;
}

/// Writes a personalized outreach message for one scored lead.
/// Invoked downstream of the pipeline, never inside it.
#[async_trait]
pub trait OutreachComposer: Send + Sync {
    async fn compose(
        &self,
        profile: &CandidateProfile,
        event: &EventDescription,
        explanation: &str,
    ) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Collaborator bundle
// ---------------------------------------------------------------------------

/// Everything the pipeline core needs for one run, bundled so the driver
/// takes a single argument. Clients are stateless and shared freely across
/// the concurrent requests within a stage.
#[derive(Clone)]
pub struct Collaborators {
    pub keywords: Arc<dyn KeywordExtractor>,
    pub queries: Arc<dyn QueryGenerator>,
    pub search: Arc<dyn ProfileSearch>,
    pub scorer: Arc<dyn BatchScorer>,
    pub assessor: Arc<dyn QualityAssessor>,
    pub refiner: Arc<dyn QueryRefiner>,
}

impl Collaborators {
    /// Wire up the production clients: Gemini for every LLM stage, Linkd
    /// for profile search.
    pub fn production(gemini: GeminiClient, linkd: LinkdClient) -> Self {
        let gemini = Arc::new(gemini);
        Self {
            keywords: gemini.clone(),
            queries: gemini.clone(),
            search: Arc::new(linkd),
            scorer: gemini.clone(),
            assessor: gemini.clone(),
            refiner: gemini,
        }
    }
}
