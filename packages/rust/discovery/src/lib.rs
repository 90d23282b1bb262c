//! Search query layer and organization domain discovery.
//!
//! Before any crawling happens, LeadScout sweeps a search provider with
//! several rounds of templated queries. Every hit becomes a raw content
//! unit for extraction, and one targeted lookup decides which domain the
//! crawler should visit.

pub mod domain;
pub mod provider;
pub mod queries;

use std::sync::Arc;
use std::time::Duration;

use leadscout_shared::{RawContentUnit, SearchHit};
use tracing::{debug, warn};

pub use domain::{bare_domain, discover_domain, looks_like_org_domain};
pub use provider::{NoopSearchProvider, SearchProvider, SerperClient};
pub use queries::QueryRound;

// ---------------------------------------------------------------------------
// SearchLayer
// ---------------------------------------------------------------------------

/// Issues query rounds against a [`SearchProvider`] with a politeness delay.
///
/// Every query is independent: a failing query is logged and contributes
/// nothing. There are no retries.
pub struct SearchLayer {
    provider: Arc<dyn SearchProvider>,
    results_per_query: usize,
    delay: Duration,
}

impl SearchLayer {
    pub fn new(provider: Arc<dyn SearchProvider>, results_per_query: usize, delay: Duration) -> Self {
        Self {
            provider,
            results_per_query,
            delay,
        }
    }

    /// Run each query in order, returning the hits of every query that succeeded.
    pub async fn run_queries(&self, queries: &[String]) -> Vec<SearchHit> {
        let mut hits = Vec::new();

        for (i, query) in queries.iter().enumerate() {
            if i > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            match self.provider.search(query, self.results_per_query).await {
                Ok(found) => {
                    debug!(query = %query, hits = found.len(), "query complete");
                    hits.extend(found);
                }
                Err(e) => {
                    warn!(query = %query, error = %e, "search query failed, skipping");
                }
            }
        }

        hits
    }

    /// Run a round and convert its hits into content units.
    pub async fn run_round(&self, round: &QueryRound) -> Vec<RawContentUnit> {
        let hits = self.run_queries(&round.queries).await;
        hits_to_units(&hits)
    }
}

/// Convert hits with a url and snippet into content units.
pub fn hits_to_units(hits: &[SearchHit]) -> Vec<RawContentUnit> {
    hits.iter()
        .filter(|h| !h.url.is_empty() && !h.snippet.is_empty())
        .map(|h| {
            RawContentUnit::new(
                h.url.clone(),
                format!("Title: {}\nURL: {}\n{}", h.title, h.url, h.snippet),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use leadscout_shared::{LeadScoutError, Result};
    use std::sync::Mutex;

    /// Fails every query containing "boom", records the rest.
    struct FlakyProvider {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SearchProvider for FlakyProvider {
        async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
            self.seen.lock().unwrap().push(query.to_string());
            if query.contains("boom") {
                return Err(LeadScoutError::Network("timeout".into()));
            }
            Ok((0..limit)
                .map(|i| SearchHit {
                    title: format!("{query} #{i}"),
                    url: format!("https://example.org/{i}"),
                    snippet: if i == 0 { String::new() } else { "snippet".into() },
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn failing_query_is_skipped_not_fatal() {
        let provider = Arc::new(FlakyProvider {
            seen: Mutex::new(Vec::new()),
        });
        let layer = SearchLayer::new(provider.clone(), 3, Duration::ZERO);

        let queries = vec!["first".to_string(), "boom".to_string(), "third".to_string()];
        let hits = layer.run_queries(&queries).await;

        assert_eq!(hits.len(), 6);
        assert_eq!(provider.seen.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn round_drops_hits_without_snippet() {
        let provider = Arc::new(FlakyProvider {
            seen: Mutex::new(Vec::new()),
        });
        let layer = SearchLayer::new(provider, 3, Duration::ZERO);
        let round = QueryRound {
            queries: vec!["only".into()],
        };

        let units = layer.run_round(&round).await;
        assert_eq!(units.len(), 2);
        assert!(units[0].text.starts_with("Title: only #1\nURL: https://example.org/1\n"));
    }
}
