//! Gemini-backed LLM collaborator client.
//!
//! One stateless client implements every LLM stage: keyword extraction,
//! query generation, batch scoring, quality assessment, query refinement,
//! and outreach composition. Each stage is a single `generateContent` call
//! whose text part is fence-stripped and strictly decoded.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use leadscout_shared::{
    CandidateProfile, EventDescription, GeminiConfig, KeywordSet, LeadscoutError, QualityVerdict,
    Result, ScoredCandidate,
};

use crate::json::decode_payload;
use crate::{
    BatchScorer, KeywordExtractor, OutreachComposer, QualityAssessor, QueryGenerator, QueryRefiner,
};

/// Public Gemini API origin.
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// User-Agent string for collaborator requests.
const USER_AGENT: &str = concat!("Leadscout/", env!("CARGO_PKG_VERSION"));

/// Wall-clock cap for a single generateContent call.
const REQUEST_TIMEOUT_SECS: u64 = 120;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

/// Keyword payload as the model returns it.
#[derive(Debug, Deserialize)]
struct RawKeywords {
    #[serde(default)]
    companies: Vec<String>,
    #[serde(default)]
    universities: Vec<String>,
    #[serde(default)]
    roles: Vec<String>,
}

/// Refinement payload: the model explains its strategy alongside the queries.
#[derive(Debug, Deserialize)]
struct RefinementPlan {
    #[serde(default)]
    explanation: String,
    #[serde(default)]
    queries: Vec<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Stateless Gemini client, safe to share across concurrent stage requests.
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
    /// Model for the lightweight stages (keywords, queries, outreach).
    model: String,
    /// Model for the large scoring / assessment / refinement payloads.
    scoring_model: String,
}

impl GeminiClient {
    /// Create a client from the `[gemini]` config section and a resolved key.
    pub fn new(config: &GeminiConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| LeadscoutError::Network(format!("failed to build HTTP client: {e}")))?;

        let base_url = Url::parse(DEFAULT_BASE_URL)
            .map_err(|e| LeadscoutError::config(format!("bad Gemini base URL: {e}")))?;

        Ok(Self {
            client,
            base_url,
            api_key,
            model: config.model.clone(),
            scoring_model: config.scoring_model.clone(),
        })
    }

    /// Point the client at a different origin (mock server in tests).
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Issue one generateContent call and return the raw text part.
    #[instrument(skip_all, fields(model = %model))]
    async fn generate(&self, model: &str, prompt: &str) -> Result<String> {
        let url = self
            .base_url
            .join(&format!("/v1beta/models/{model}:generateContent"))
            .map_err(|e| LeadscoutError::config(format!("bad Gemini URL: {e}")))?;

        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LeadscoutError::Network(format!("gemini: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LeadscoutError::Collaborator(format!(
                "gemini returned HTTP {status}"
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LeadscoutError::parse(format!("gemini response: {e}")))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| LeadscoutError::parse("gemini response had no candidates"))?;

        debug!(chars = text.len(), "gemini response received");
        Ok(text)
    }
}

/// Render the event as pretty JSON for prompt interpolation.
fn event_json(event: &EventDescription) -> String {
    serde_json::to_string_pretty(event).unwrap_or_default()
}

fn list_json<T: serde::Serialize>(items: &[T]) -> String {
    serde_json::to_string_pretty(items).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Stage impls
// ---------------------------------------------------------------------------

#[async_trait]
impl KeywordExtractor for GeminiClient {
    async fn extract_keywords(&self, event: &EventDescription) -> Result<KeywordSet> {
        let prompt = format!(
            "You are an expert at extracting related companies, universities, and \
             professional roles from event descriptions.\n\
             Given the following event details:\n\n{}\n\n\
             List:\n- 5 companies (comma separated)\n- 5 universities (comma separated)\n\
             - 5 professional roles (comma separated)\n\
             Return as a JSON object with keys: companies, universities, roles. \
             Do not include markdown or code fences.",
            event_json(event)
        );

        let raw = self.generate(&self.model, &prompt).await?;
        let keywords: RawKeywords = decode_payload(&raw)?;
        Ok(KeywordSet {
            organizations: keywords.companies,
            institutions: keywords.universities,
            roles: keywords.roles,
        })
    }
}

#[async_trait]
impl QueryGenerator for GeminiClient {
    async fn generate_queries(
        &self,
        event: &EventDescription,
        keywords: &KeywordSet,
    ) -> Result<Vec<String>> {
        let prompt = format!(
            "You are an expert in creating diverse natural language search queries for \
             people discovery on search engines and LinkedIn. Given the following event \
             details and related keywords:\n\n\
             Event details:\n{}\n\nKeywords:\n{}\n\n\
             Create 6-8 diverse, creative, and realistic search queries (as a JSON array \
             of strings) that someone would type into a search engine or LinkedIn to find \
             people. Use the keywords as a guide but think about what sort of people would \
             be best for this sort of event. Do NOT use SQL or boolean logic like AND/OR. \
             Make the queries sound like what a real person would search for, e.g.:\n\
             - People working on AI at FAANG\n\
             - PhDs now working at FAANG companies\n\
             - CS graduates working on autonomous vehicles\n\
             Do not include markdown or code fences.",
            event_json(event),
            serde_json::to_string_pretty(keywords).unwrap_or_default()
        );

        let raw = self.generate(&self.model, &prompt).await?;
        decode_payload(&raw)
    }
}

#[async_trait]
impl BatchScorer for GeminiClient {
    async fn score_batch(
        &self,
        event: &EventDescription,
        batch: &[CandidateProfile],
    ) -> Result<Vec<ScoredCandidate>> {
        let prompt = format!(
            "You are an expert at ranking professionals for event outreach. Given the \
             event details and a list of LinkedIn profiles, score each profile from 1-10 \
             for relevancy and provide a detailed explanation for each score. Consider \
             location, experience, and likelihood to respond or be interested.\n\n\
             Event details:\n{}\n\nProfiles:\n{}\n\n\
             Return a JSON array of objects with keys: profile, score, explanation. \
             Echo each profile back unchanged. Do not include markdown or code fences.",
            event_json(event),
            list_json(batch)
        );

        let raw = self.generate(&self.scoring_model, &prompt).await?;
        decode_payload(&raw)
    }
}

#[async_trait]
impl QualityAssessor for GeminiClient {
    async fn assess(
        &self,
        event: &EventDescription,
        queries: &[String],
        sample: &[CandidateProfile],
    ) -> Result<QualityVerdict> {
        let prompt = format!(
            "You are an expert in evaluating the quality of professional leads for \
             high-profile event outreach. Given the following event details, search \
             queries, and the resulting profiles, analyze if these profiles are \
             high-caliber, relevant, and diverse enough for the event. If not, explain \
             the main issues (e.g., too junior, not relevant, not diverse, etc.).\n\n\
             Event details:\n{}\n\nSearch queries used:\n{}\n\n\
             Profiles returned (sample):\n{}\n\n\
             Return a JSON object with keys:\n\
             - is_high_quality (true/false)\n\
             - issues (string): if not high quality, the main issues.\n\
             Do not include markdown or code fences.",
            event_json(event),
            list_json(queries),
            list_json(sample)
        );

        let raw = self.generate(&self.scoring_model, &prompt).await?;
        decode_payload(&raw)
    }
}

#[async_trait]
impl QueryRefiner for GeminiClient {
    async fn refine_queries(
        &self,
        event: &EventDescription,
        keywords: &KeywordSet,
        prior_queries: &[String],
        candidates: &[CandidateProfile],
        issues: &str,
    ) -> Result<Vec<String>> {
        // Refinement sees only a bounded candidate sample; the full set can
        // blow past the context window.
        let sample = &candidates[..candidates.len().min(20)];
        let prompt = format!(
            "You are an expert in deep research and people discovery for high-profile \
             events. The previous search queries did not yield enough high-quality leads. \
             Here are the event details, keywords, previous queries, and the issues with \
             the profiles:\n\n\
             Event details:\n{}\n\nKeywords:\n{}\n\nPrevious queries:\n{}\n\n\
             Profiles returned (sample):\n{}\n\nIssues with profiles:\n{issues}\n\n\
             Generate 6-8 improved, creative, and realistic search queries focusing on \
             the type of person (e.g. \"AI ethics professor Stanford keynote speaker\"). \
             Do NOT use SQL or boolean logic like AND/OR.\n\
             Return a JSON object with two keys:\n\
             - \"explanation\": a step-by-step explanation of how you improved the queries\n\
             - \"queries\": the improved queries as a JSON array of strings.\n\
             Do not include markdown or code fences.",
            event_json(event),
            serde_json::to_string_pretty(keywords).unwrap_or_default(),
            list_json(prior_queries),
            list_json(sample)
        );

        let raw = self.generate(&self.scoring_model, &prompt).await?;
        let plan: RefinementPlan = decode_payload(&raw)?;
        if !plan.explanation.is_empty() {
            debug!(explanation = %plan.explanation, "query refinement rationale");
        }
        Ok(plan.queries)
    }
}

#[async_trait]
impl OutreachComposer for GeminiClient {
    async fn compose(
        &self,
        profile: &CandidateProfile,
        event: &EventDescription,
        explanation: &str,
    ) -> Result<String> {
        let prompt = format!(
            "You are an expert at writing short, warm, professional outreach messages. \
             Write a LinkedIn message inviting this person to participate in the event \
             below. Mention why they specifically are a fit. Keep it under 120 words and \
             return plain text only.\n\n\
             Profile:\n{}\n\nEvent details:\n{}\n\nWhy they are relevant:\n{explanation}",
            serde_json::to_string_pretty(profile).unwrap_or_default(),
            event_json(event)
        );

        self.generate(&self.model, &prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GeminiClient {
        let config = GeminiConfig::default();
        GeminiClient::new(&config, "test-key".into())
            .expect("build client")
            .with_base_url(Url::parse(&server.uri()).expect("mock uri"))
    }

    fn text_response(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": text }] } }]
        }))
    }

    #[tokio::test]
    async fn extract_keywords_maps_wire_names() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
            .respond_with(text_response(
                r#"{"companies": ["OpenAI"], "universities": ["UCLA"], "roles": ["Professor"]}"#,
            ))
            .mount(&server)
            .await;

        let keywords = client_for(&server)
            .extract_keywords(&EventDescription::default())
            .await
            .expect("keywords");

        assert_eq!(keywords.organizations, vec!["OpenAI"]);
        assert_eq!(keywords.institutions, vec!["UCLA"]);
        assert_eq!(keywords.roles, vec!["Professor"]);
    }

    #[tokio::test]
    async fn generate_queries_strips_fences() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(text_response(
                "```json\n[\"AI ethics researchers in California\"]\n```",
            ))
            .mount(&server)
            .await;

        let queries = client_for(&server)
            .generate_queries(&EventDescription::default(), &KeywordSet::default())
            .await
            .expect("queries");

        assert_eq!(queries, vec!["AI ethics researchers in California"]);
    }

    #[tokio::test]
    async fn score_batch_rejects_malformed_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(text_response("[{\"profile\": {\"name\": \"Ada\"}, \"score\":"))
            .mount(&server)
            .await;

        let result = client_for(&server)
            .score_batch(&EventDescription::default(), &[])
            .await;

        assert!(matches!(result, Err(LeadscoutError::Parse { .. })));
    }

    #[tokio::test]
    async fn http_error_is_collaborator_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let result = client_for(&server)
            .extract_keywords(&EventDescription::default())
            .await;

        assert!(matches!(result, Err(LeadscoutError::Collaborator(_))));
    }

    #[tokio::test]
    async fn refine_queries_unwraps_plan() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(text_response(
                r#"{"explanation": "focus on seniority", "queries": ["CTO climate tech panelist"]}"#,
            ))
            .mount(&server)
            .await;

        let queries = client_for(&server)
            .refine_queries(
                &EventDescription::default(),
                &KeywordSet::default(),
                &["old query".into()],
                &[],
                "too junior",
            )
            .await
            .expect("refined queries");

        assert_eq!(queries, vec!["CTO climate tech panelist"]);
    }
}
