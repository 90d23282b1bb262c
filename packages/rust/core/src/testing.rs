//! In-memory collaborators for job and queue tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Notify, watch};
use url::Url;

use leadscout_crawler::PageFetcher;
use leadscout_discovery::SearchProvider;
use leadscout_shared::{
    EmailConfidence, RawContentUnit, ResearchConfig, ResearchSummary, Result, SearchHit,
};

use crate::extraction::{ContactCandidate, ContactExtractor};
use crate::job::{ResearchReporter, ResearchServices};
use crate::patterns::FirstMatchDetector;

/// Default config with every delay removed.
pub(crate) fn test_config() -> ResearchConfig {
    let mut config = ResearchConfig::default();
    config.query_delay = Duration::ZERO;
    config.crawl.delay_ms = 0;
    config
}

pub(crate) fn quiet_services() -> ResearchServices {
    services_with_search(Arc::new(FakeSearch::default()))
}

pub(crate) fn services_with_search(search: Arc<dyn SearchProvider>) -> ResearchServices {
    services(search, Arc::new(FakeFetcher::default()))
}

pub(crate) fn services(
    search: Arc<dyn SearchProvider>,
    fetcher: Arc<dyn PageFetcher>,
) -> ResearchServices {
    ResearchServices {
        search,
        fetcher,
        extractor: Arc::new(LineExtractor),
        detector: Arc::new(FirstMatchDetector),
    }
}

pub(crate) fn hit(title: &str, url: &str, snippet: &str) -> SearchHit {
    SearchHit {
        title: title.into(),
        url: url.into(),
        snippet: snippet.into(),
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// Returns the hits of every rule whose needle occurs in the query.
#[derive(Default)]
pub(crate) struct FakeSearch {
    rules: Vec<(String, Vec<SearchHit>)>,
    queries: Mutex<Vec<String>>,
}

impl FakeSearch {
    pub(crate) fn on(mut self, needle: &str, hits: Vec<SearchHit>) -> Self {
        self.rules.push((needle.to_string(), hits));
        self
    }

    pub(crate) fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for FakeSearch {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(self
            .rules
            .iter()
            .filter(|(needle, _)| query.contains(needle.as_str()))
            .flat_map(|(_, hits)| hits.iter().cloned())
            .take(limit)
            .collect())
    }
}

/// Blocks every search until [`GatedSearch::open`] is called.
pub(crate) struct GatedSearch {
    entered: Notify,
    gate: watch::Sender<bool>,
}

impl GatedSearch {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            entered: Notify::new(),
            gate: watch::Sender::new(false),
        })
    }

    /// Resolves once a search has started waiting at the gate.
    pub(crate) async fn entered(&self) {
        self.entered.notified().await;
    }

    pub(crate) fn open(&self) {
        self.gate.send_replace(true);
    }
}

#[async_trait]
impl SearchProvider for GatedSearch {
    async fn search(&self, _query: &str, _limit: usize) -> Result<Vec<SearchHit>> {
        self.entered.notify_one();
        let mut rx = self.gate.subscribe();
        loop {
            let open = *rx.borrow_and_update();
            if open || rx.changed().await.is_err() {
                break;
            }
        }
        Ok(Vec::new())
    }
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// Serves canned HTML by exact URL.
#[derive(Default)]
pub(crate) struct FakeFetcher {
    pages: HashMap<String, String>,
    fetched: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub(crate) fn page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub(crate) fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch(&self, url: &Url) -> Option<String> {
        self.fetched.lock().unwrap().push(url.to_string());
        self.pages.get(url.as_str()).cloned()
    }
}

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

/// Reads `CONTACT:first|last|title|email` lines out of the batch text.
pub(crate) struct LineExtractor;

#[async_trait]
impl ContactExtractor for LineExtractor {
    async fn extract(
        &self,
        batch: &[RawContentUnit],
        _org_name: &str,
    ) -> Result<Vec<ContactCandidate>> {
        let mut out = Vec::new();
        for unit in batch {
            for line in unit.text.lines() {
                let Some(rest) = line.trim().strip_prefix("CONTACT:") else {
                    continue;
                };
                let fields: Vec<&str> = rest.split('|').map(str::trim).collect();
                let [first, last, title, email] = fields[..] else {
                    continue;
                };

                let mut candidate = ContactCandidate::named(first, last);
                candidate.title = title.to_string();
                candidate.source_url = unit.source_url.clone();
                if !email.is_empty() {
                    candidate.email = email.to_lowercase();
                    candidate.email_confidence = EmailConfidence::Likely;
                }
                out.push(candidate);
            }
        }
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Reporters
// ---------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct RecordingReporter {
    progress: Mutex<Vec<String>>,
    completed: Mutex<Vec<ResearchSummary>>,
    progressed: Notify,
}

impl RecordingReporter {
    pub(crate) fn progress(&self) -> Vec<String> {
        self.progress.lock().unwrap().clone()
    }

    pub(crate) fn completed(&self) -> Vec<ResearchSummary> {
        self.completed.lock().unwrap().clone()
    }

    pub(crate) fn completed_orgs(&self) -> Vec<String> {
        self.completed()
            .into_iter()
            .map(|s| s.org_name)
            .collect()
    }

    pub(crate) async fn wait_for_progress(&self, count: usize) {
        loop {
            if self.progress.lock().unwrap().len() >= count {
                return;
            }
            self.progressed.notified().await;
        }
    }
}

#[async_trait]
impl ResearchReporter for RecordingReporter {
    fn on_progress(&self, message: &str) {
        self.progress.lock().unwrap().push(message.to_string());
        self.progressed.notify_one();
    }

    async fn on_complete(&self, summary: ResearchSummary) -> Result<()> {
        self.completed.lock().unwrap().push(summary);
        Ok(())
    }
}

pub(crate) enum PanickingReporter {
    OnProgress,
    OnComplete,
}

#[async_trait]
impl ResearchReporter for PanickingReporter {
    fn on_progress(&self, _message: &str) {
        if matches!(self, Self::OnProgress) {
            panic!("progress reporter exploded");
        }
    }

    async fn on_complete(&self, _summary: ResearchSummary) -> Result<()> {
        if matches!(self, Self::OnComplete) {
            panic!("completion reporter exploded");
        }
        Ok(())
    }
}

/// Panics on the "Starting research" notice, records everything else.
#[derive(Default)]
pub(crate) struct StartPanicReporter {
    pub(crate) inner: RecordingReporter,
}

#[async_trait]
impl ResearchReporter for StartPanicReporter {
    fn on_progress(&self, message: &str) {
        if message.starts_with("Starting research") {
            panic!("status line rejected");
        }
        self.inner.on_progress(message);
    }

    async fn on_complete(&self, summary: ResearchSummary) -> Result<()> {
        self.inner.on_complete(summary).await
    }
}
