//! Linkd people-search client.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use leadscout_shared::{CandidateProfile, LeadscoutError, LinkdConfig, Result};

use crate::ProfileSearch;

const USER_AGENT: &str = concat!("Leadscout/", env!("CARGO_PKG_VERSION"));

/// Per-request cap; the coordinator enforces its own fan-out deadline.
const REQUEST_TIMEOUT_SECS: u64 = 90;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<CandidateProfile>,
}

/// HTTP client for the Linkd `/api/search/users` endpoint.
pub struct LinkdClient {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl LinkdClient {
    /// Create a client from the `[linkd]` config section and a resolved key.
    pub fn new(config: &LinkdConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| LeadscoutError::Network(format!("failed to build HTTP client: {e}")))?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| LeadscoutError::config(format!("bad Linkd base URL: {e}")))?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Point the client at a different origin (mock server in tests).
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl ProfileSearch for LinkdClient {
    #[instrument(skip_all, fields(query = %query, limit))]
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<CandidateProfile>> {
        let url = self
            .base_url
            .join("/api/search/users")
            .map_err(|e| LeadscoutError::config(format!("bad Linkd URL: {e}")))?;

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .query(&[("query", query), ("limit", &limit.to_string())])
            .send()
            .await
            .map_err(|e| LeadscoutError::Network(format!("linkd: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LeadscoutError::Collaborator(format!(
                "linkd returned HTTP {status}"
            )));
        }

        // Non-JSON bodies surface as errors so the caller's retry budget
        // applies to them too.
        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| LeadscoutError::parse(format!("linkd response: {e}")))?;

        debug!(count = parsed.results.len(), "search results received");
        Ok(parsed.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> LinkdClient {
        let config = LinkdConfig::default();
        LinkdClient::new(&config, "linkd-key".into())
            .expect("build client")
            .with_base_url(Url::parse(&server.uri()).expect("mock uri"))
    }

    #[tokio::test]
    async fn search_decodes_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/search/users"))
            .and(query_param("query", "AI ethics professor"))
            .and(query_param("limit", "10"))
            .and(header("authorization", "Bearer linkd-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{
                    "id": 42,
                    "name": "Ada Lovelace",
                    "headline": "Professor of Computing",
                    "linkedin_url": "https://linkedin.com/in/ada"
                }]
            })))
            .mount(&server)
            .await;

        let profiles = client_for(&server)
            .search("AI ethics professor", 10)
            .await
            .expect("search results");

        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].id, Some(42));
        assert_eq!(profiles[0].name.as_deref(), Some("Ada Lovelace"));
    }

    #[tokio::test]
    async fn missing_results_key_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let profiles = client_for(&server).search("anything", 5).await.expect("ok");
        assert!(profiles.is_empty());
    }

    #[tokio::test]
    async fn non_json_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>rate limited</html>"))
            .mount(&server)
            .await;

        let result = client_for(&server).search("anything", 5).await;
        assert!(matches!(result, Err(LeadscoutError::Parse { .. })));
    }

    #[tokio::test]
    async fn server_error_is_collaborator_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = client_for(&server).search("anything", 5).await;
        assert!(matches!(result, Err(LeadscoutError::Collaborator(_))));
    }
}
