//! Search provider trait and the Serper implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use leadscout_shared::{LeadScoutError, Result, SearchHit};

/// User-Agent string for search requests.
const USER_AGENT: &str = concat!("LeadScout/", env!("CARGO_PKG_VERSION"));

/// A web search backend.
///
/// Implementations should fail soft where they can; the search layer
/// catches any error they do return and moves on to the next query.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run `query`, returning at most `limit` organic results.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>>;
}

// ---------------------------------------------------------------------------
// Serper
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct SerperRequest<'a> {
    q: &'a str,
    num: usize,
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SerperOrganic>,
}

#[derive(Debug, Deserialize)]
struct SerperOrganic {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

/// Google search via the Serper API.
pub struct SerperClient {
    api_key: String,
    endpoint: String,
    client: Client,
}

impl SerperClient {
    /// Create a client posting to `endpoint` with a per-request timeout.
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| LeadScoutError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            client,
        })
    }
}

#[async_trait]
impl SearchProvider for SerperClient {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        debug!(query, limit, "serper search");

        let response = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", &self.api_key)
            .json(&SerperRequest { q: query, num: limit })
            .send()
            .await
            .map_err(|e| LeadScoutError::Network(format!("serper: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LeadScoutError::Network(format!(
                "serper: HTTP {status}: {body}"
            )));
        }

        let parsed: SerperResponse = response
            .json()
            .await
            .map_err(|e| LeadScoutError::parse(format!("serper response: {e}")))?;

        Ok(parsed
            .organic
            .into_iter()
            .take(limit)
            .map(|o| SearchHit {
                title: o.title,
                url: o.link,
                snippet: o.snippet,
            })
            .collect())
    }
}

/// Search provider used when no API key is configured.
pub struct NoopSearchProvider;

#[async_trait]
impl SearchProvider for NoopSearchProvider {
    async fn search(&self, query: &str, _limit: usize) -> Result<Vec<SearchHit>> {
        warn!(query, "search called but no search API key is configured");
        Ok(vec![])
    }
}
