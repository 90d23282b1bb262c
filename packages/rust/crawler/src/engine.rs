//! Bounded, single-site crawler.
//!
//! A crawl has two phases that the research job tags separately: a fixed set
//! of seed paths, then one flat expansion over same-site links found on any
//! page that mentions a target department. Both phases share one budget of
//! fetch attempts, so the total request count never exceeds `max_pages`.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use leadscout_shared::CrawlConfig;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};
use url::Url;

use crate::fetcher::PageFetcher;
use crate::text::parse_page;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// A fetched page reduced to visible text plus the links it carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawledPage {
    pub url: String,
    pub text: String,
    pub links: Vec<String>,
}

/// In-progress crawl of one site.
#[derive(Debug)]
pub struct CrawlSession {
    base: Url,
    visited: HashSet<String>,
    content_hashes: HashSet<String>,
    attempts: usize,
    duplicates_skipped: usize,
    pages: Vec<CrawledPage>,
}

impl CrawlSession {
    fn new(base: Url) -> Self {
        Self {
            base,
            visited: HashSet::new(),
            content_hashes: HashSet::new(),
            attempts: 0,
            duplicates_skipped: 0,
            pages: Vec::new(),
        }
    }

    /// Pages kept so far, in fetch order.
    pub fn pages(&self) -> &[CrawledPage] {
        &self.pages
    }

    /// Fetch attempts made, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Pages dropped because their text matched an earlier page.
    pub fn duplicates_skipped(&self) -> usize {
        self.duplicates_skipped
    }

    pub fn into_pages(self) -> Vec<CrawledPage> {
        self.pages
    }
}

// ---------------------------------------------------------------------------
// SiteCrawler
// ---------------------------------------------------------------------------

/// Crawls one organization site under a fixed attempt budget.
pub struct SiteCrawler {
    config: CrawlConfig,
    fetcher: Arc<dyn PageFetcher>,
}

impl SiteCrawler {
    pub fn new(config: CrawlConfig, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { config, fetcher }
    }

    /// Begin a crawl rooted at `base`.
    pub fn start(&self, base: Url) -> CrawlSession {
        CrawlSession::new(base)
    }

    /// Fetch the configured seed paths. Returns how many pages were kept.
    #[instrument(skip_all, fields(base = %session.base))]
    pub async fn scrape_seeds(&self, session: &mut CrawlSession) -> usize {
        let before = session.pages.len();

        for seed in &self.config.seed_paths {
            let Ok(url) = session.base.join(seed) else {
                debug!(seed = %seed, "unjoinable seed path, skipping");
                continue;
            };
            if !self.fetch_into(session, url).await {
                break;
            }
        }

        let kept = session.pages.len() - before;
        info!(kept, attempts = session.attempts, "seed scrape complete");
        kept
    }

    /// Follow same-site links from pages that mention a target department.
    ///
    /// Expansion is flat: pages fetched here are not mined for further links.
    #[instrument(skip_all, fields(base = %session.base))]
    pub async fn expand_frontier(&self, session: &mut CrawlSession) -> usize {
        let before = session.pages.len();
        let frontier = self.frontier(session);
        debug!(candidates = frontier.len(), "frontier built");

        for url in frontier {
            if !self.fetch_into(session, url).await {
                break;
            }
        }

        let kept = session.pages.len() - before;
        info!(kept, attempts = session.attempts, "frontier expansion complete");
        kept
    }

    fn frontier(&self, session: &CrawlSession) -> Vec<Url> {
        let keywords: Vec<String> = self
            .config
            .department_keywords
            .iter()
            .map(|k| k.to_lowercase())
            .collect();

        let mut seen = HashSet::new();
        let mut frontier = Vec::new();

        for page in &session.pages {
            let text = page.text.to_lowercase();
            if !keywords.iter().any(|k| text.contains(k.as_str())) {
                continue;
            }

            for link in &page.links {
                let Ok(url) = Url::parse(link) else {
                    continue;
                };
                if !same_site(&session.base, &url) {
                    continue;
                }
                let key = normalize_url(&url);
                if session.visited.contains(&key) || !seen.insert(key) {
                    continue;
                }
                frontier.push(url);
            }
        }

        frontier
    }

    /// Attempt one fetch. Returns `false` once the budget is spent.
    async fn fetch_into(&self, session: &mut CrawlSession, url: Url) -> bool {
        if session.attempts >= self.config.max_pages {
            debug!(max_pages = self.config.max_pages, "crawl budget exhausted");
            return false;
        }

        let key = normalize_url(&url);
        if !session.visited.insert(key) {
            return true;
        }

        if session.attempts > 0 && self.config.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.delay_ms)).await;
        }
        session.attempts += 1;

        debug!(%url, attempt = session.attempts, "fetching page");
        let Some(html) = self.fetcher.fetch(&url).await else {
            return true;
        };

        let content = parse_page(&html, &url, self.config.page_text_cap);
        if !session.content_hashes.insert(compute_hash(&content.text)) {
            debug!(%url, "duplicate content, skipping");
            session.duplicates_skipped += 1;
            return true;
        }

        session.pages.push(CrawledPage {
            url: url.to_string(),
            text: content.text,
            links: content.links,
        });
        true
    }
}

// ---------------------------------------------------------------------------
// URL helpers
// ---------------------------------------------------------------------------

/// Same scheme family and host, ignoring a leading `www.`.
fn same_site(base: &Url, candidate: &Url) -> bool {
    if !matches!(candidate.scheme(), "http" | "https") {
        return false;
    }
    let host = |u: &Url| {
        u.host_str()
            .map(|h| h.trim_start_matches("www.").to_lowercase())
    };
    host(base).is_some() && host(base) == host(candidate)
}

/// Normalize a URL for deduplication (strip fragment and trailing slash).
fn normalize_url(url: &Url) -> String {
    let mut normalized = url.clone();
    normalized.set_fragment(None);
    let mut s = normalized.to_string();
    // Remove trailing slash for consistency (except root path)
    if s.ends_with('/') && s.matches('/').count() > 3 {
        s.pop();
    }
    s
}

/// Compute SHA-256 hash of content.
fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::HttpFetcher;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(max_pages: usize) -> CrawlConfig {
        CrawlConfig {
            max_pages,
            delay_ms: 0,
            ..CrawlConfig::default()
        }
    }

    async fn mount(server: &MockServer, route: &str, body: String) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    async fn crawl(crawler: &SiteCrawler, base: &str) -> CrawlSession {
        let mut session = crawler.start(Url::parse(base).unwrap());
        crawler.scrape_seeds(&mut session).await;
        crawler.expand_frontier(&mut session).await;
        session
    }

    fn http_fetcher() -> Arc<dyn PageFetcher> {
        Arc::new(
            HttpFetcher::new(Duration::from_secs(5))
                .unwrap()
                .allow_localhost(),
        )
    }

    #[test]
    fn normalize_strips_fragment_and_trailing_slash() {
        let url = Url::parse("https://isd.example.org/staff/#team").unwrap();
        assert_eq!(normalize_url(&url), "https://isd.example.org/staff");

        let root = Url::parse("https://isd.example.org/").unwrap();
        assert_eq!(normalize_url(&root), "https://isd.example.org/");
    }

    #[test]
    fn same_site_ignores_www() {
        let base = Url::parse("https://www.austinisd.org/").unwrap();
        let same = Url::parse("http://austinisd.org/staff").unwrap();
        let other = Url::parse("https://news.example.com/austinisd").unwrap();
        let mail = Url::parse("mailto:someone@austinisd.org").unwrap();

        assert!(same_site(&base, &same));
        assert!(!same_site(&base, &other));
        assert!(!same_site(&base, &mail));
    }

    #[test]
    fn test_compute_hash() {
        let hash = compute_hash("hello world");
        assert_eq!(
            hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[tokio::test]
    async fn crawl_never_exceeds_attempt_budget() {
        let server = MockServer::start().await;

        let links: String = (0..40)
            .map(|i| format!(r#"<a href="/dept/{i}">Dept {i}</a>"#))
            .collect();
        mount(
            &server,
            "/",
            format!("<html><body><h1>Computer Science Programs</h1>{links}</body></html>"),
        )
        .await;
        for i in 0..40 {
            mount(
                &server,
                &format!("/dept/{i}"),
                format!("<html><body><p>Department page {i}</p></body></html>"),
            )
            .await;
        }

        let crawler = SiteCrawler::new(config(30), http_fetcher());
        let session = crawl(&crawler, &server.uri()).await;

        assert_eq!(session.attempts(), 30);
        // root + 25 department pages; the other 4 seeds 404
        assert_eq!(session.pages().len(), 26);

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 30);
    }

    #[tokio::test]
    async fn only_keyword_pages_are_mined() {
        let server = MockServer::start().await;

        mount(
            &server,
            "/",
            r#"<html><body><p>Welcome</p><a href="/hidden">Hidden</a></body></html>"#.into(),
        )
        .await;
        mount(
            &server,
            "/staff",
            r#"<html><body><p>Our STEM team</p><a href="/stem-team">Team</a>
               <a href="https://elsewhere.example.com/x">Offsite</a></body></html>"#
                .into(),
        )
        .await;
        mount(
            &server,
            "/stem-team",
            "<html><body><p>Jane Doe, STEM Director</p></body></html>".into(),
        )
        .await;
        mount(
            &server,
            "/hidden",
            "<html><body><p>Should not be fetched</p></body></html>".into(),
        )
        .await;

        let crawler = SiteCrawler::new(config(30), http_fetcher());
        let mut session = crawler.start(Url::parse(&server.uri()).unwrap());

        assert_eq!(crawler.scrape_seeds(&mut session).await, 2);
        assert_eq!(crawler.expand_frontier(&mut session).await, 1);

        let urls: Vec<&str> = session.pages().iter().map(|p| p.url.as_str()).collect();
        assert!(urls.iter().any(|u| u.ends_with("/stem-team")));
        assert!(!urls.iter().any(|u| u.ends_with("/hidden")));
        // 5 seeds + 1 frontier page
        assert_eq!(session.attempts(), 6);
    }

    #[tokio::test]
    async fn duplicate_content_is_dropped() {
        let server = MockServer::start().await;
        let body = "<html><body><p>Same directory page</p></body></html>".to_string();
        mount(&server, "/", body.clone()).await;
        mount(&server, "/staff", body).await;

        let crawler = SiteCrawler::new(config(30), http_fetcher());
        let session = crawl(&crawler, &server.uri()).await;

        assert_eq!(session.pages().len(), 1);
        assert_eq!(session.duplicates_skipped(), 1);
    }

    #[tokio::test]
    async fn frontier_skips_already_fetched_urls() {
        let server = MockServer::start().await;
        mount(
            &server,
            "/",
            "<html><body><p>Welcome</p></body></html>".into(),
        )
        .await;
        mount(
            &server,
            "/staff",
            r##"<html><body><p>Computer Science staff</p>
               <a href="/staff">Staff</a>
               <a href="/">Home</a>
               <a href="/staff/">Staff again</a>
               <a href="/#top">Top</a>
               <a href="/cs-team">CS team</a></body></html>"##
                .into(),
        )
        .await;
        mount(
            &server,
            "/cs-team",
            "<html><body><p>Jane Doe, CS Coordinator</p></body></html>".into(),
        )
        .await;

        let crawler = SiteCrawler::new(config(30), http_fetcher());
        let session = crawl(&crawler, &server.uri()).await;

        // 5 seeds + /cs-team; links back to fetched pages are not retried
        assert_eq!(session.attempts(), 6);
        assert_eq!(session.pages().len(), 3);

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 6);
        for route in ["/", "/staff", "/cs-team"] {
            let hits = requests.iter().filter(|r| r.url.path() == route).count();
            assert_eq!(hits, 1, "{route} requested {hits} times");
        }
        assert!(!requests.iter().any(|r| r.url.path() == "/staff/"));
    }
}
