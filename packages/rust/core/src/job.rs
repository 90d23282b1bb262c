//! The research job: one organization, start to finish.
//!
//! Stages run strictly in order. Each stage that runs appends its tag to the
//! summary's audit trail. Stages that need the organization's domain are
//! skipped when none was found. A failing search, fetch or extraction call
//! only thins out that stage's output; the job itself still completes.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, Local};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use leadscout_crawler::{PageFetcher, SiteCrawler};
use leadscout_discovery::{
    SearchLayer, SearchProvider, bare_domain, discover_domain, hits_to_units, queries,
};
use leadscout_shared::{
    ContactRecord, EmailConfidence, LeadScoutError, RawContentUnit, ResearchConfig,
    ResearchSummary, Result,
};

use crate::extraction::{ContactExtractor, extract_all};
use crate::patterns::{EmailPatternDetector, EmailTemplate, collect_known_emails};
use crate::scoring::{dedup_and_score, merge_contacts};

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// External services a job depends on.
#[derive(Clone)]
pub struct ResearchServices {
    pub search: Arc<dyn SearchProvider>,
    pub fetcher: Arc<dyn PageFetcher>,
    pub extractor: Arc<dyn ContactExtractor>,
    pub detector: Arc<dyn EmailPatternDetector>,
}

/// Receives a job's progress and its final summary.
#[async_trait]
pub trait ResearchReporter: Send + Sync {
    /// Human-readable status line.
    fn on_progress(&self, message: &str);

    /// Called once with the finished summary.
    async fn on_complete(&self, summary: ResearchSummary) -> Result<()>;
}

/// Send a progress line, logging instead of unwinding if the reporter panics.
pub(crate) fn notify(reporter: &dyn ResearchReporter, message: &str) {
    if catch_unwind(AssertUnwindSafe(|| reporter.on_progress(message))).is_err() {
        error!(message, "progress callback panicked");
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    DirectTitle,
    TitleVariations,
    ProfessionalNetwork,
    DomainDiscovery,
    NewsGrants,
    SiteScrape,
    DeepCrawl,
    EmailInference,
    Extraction,
    DedupScore,
}

impl Stage {
    pub fn tag(self) -> &'static str {
        match self {
            Self::DirectTitle => "direct-title",
            Self::TitleVariations => "title-variations",
            Self::ProfessionalNetwork => "professional-network",
            Self::DomainDiscovery => "domain-discovery",
            Self::NewsGrants => "news-grants",
            Self::SiteScrape => "site-scrape",
            Self::DeepCrawl => "deep-crawl",
            Self::EmailInference => "email-inference",
            Self::Extraction => "extraction",
            Self::DedupScore => "dedup-score",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// ---------------------------------------------------------------------------
// ResearchJob
// ---------------------------------------------------------------------------

/// Mutable state owned by a single run.
#[derive(Default)]
struct JobState {
    units: Vec<RawContentUnit>,
    contacts: Vec<ContactRecord>,
    stages: Vec<Stage>,
    domain: Option<String>,
    known_emails: Vec<String>,
    template: Option<EmailTemplate>,
    pages_crawled: usize,
}

impl JobState {
    fn record(&mut self, stage: Stage) {
        self.stages.push(stage);
    }
}

/// Researches one organization.
pub struct ResearchJob {
    org_name: String,
    region: String,
    services: ResearchServices,
    config: ResearchConfig,
}

impl ResearchJob {
    /// Fails with a validation error when `org_name` is blank.
    pub fn new(
        org_name: impl Into<String>,
        region: impl Into<String>,
        services: ResearchServices,
        config: ResearchConfig,
    ) -> Result<Self> {
        let org_name = org_name.into().trim().to_string();
        if org_name.is_empty() {
            return Err(LeadScoutError::validation("organization name must not be blank"));
        }
        Ok(Self {
            org_name,
            region: region.into().trim().to_string(),
            services,
            config,
        })
    }

    /// Run every stage and return the summary.
    #[instrument(skip_all, fields(org = %self.org_name, region = %self.region))]
    pub async fn run(self, reporter: &dyn ResearchReporter) -> ResearchSummary {
        let org = self.org_name.as_str();
        let search = SearchLayer::new(
            self.services.search.clone(),
            self.config.results_per_query,
            self.config.query_delay,
        );
        let mut state = JobState::default();

        notify(reporter, &format!("Starting research: {org}"));
        info!("research job started");

        for (stage, round) in [
            (Stage::DirectTitle, queries::direct_title(org)),
            (Stage::TitleVariations, queries::title_variations(org)),
            (Stage::ProfessionalNetwork, queries::professional_network(org)),
        ] {
            state.units.extend(search.run_round(&round).await);
            state.record(stage);
        }

        self.find_domain(&search, &mut state).await;

        let news = queries::news_grants(org, Local::now().year());
        state.units.extend(search.run_round(&news).await);
        state.record(Stage::NewsGrants);

        if let Some(domain) = state.domain.clone() {
            notify(reporter, &format!("Crawling {domain}"));
            self.crawl_site(&domain, &mut state).await;
            self.infer_email_pattern(&domain, &mut state);
        }

        notify(
            reporter,
            &format!("Extracting contacts from {} content units", state.units.len()),
        );
        self.extract_contacts(&mut state).await;

        let contacts = dedup_and_score(std::mem::take(&mut state.contacts), &state.known_emails);
        state.record(Stage::DedupScore);

        let stages = state.stages.iter().map(|s| s.tag().to_string()).collect();
        let mut summary = ResearchSummary::new(org, &self.region, contacts, stages);
        summary.discovered_domain = state.domain;
        summary.email_pattern = state.template.map(|t| t.as_str().to_string());
        summary.pages_crawled = state.pages_crawled;

        info!(
            total = summary.total,
            with_email = summary.with_email_count,
            pages_crawled = summary.pages_crawled,
            "research job complete"
        );
        summary
    }

    async fn find_domain(&self, search: &SearchLayer, state: &mut JobState) {
        let lookup = queries::domain_lookup(&self.org_name, &self.region);
        let hits = search.run_queries(&[lookup]).await;
        state.units.extend(hits_to_units(&hits));

        state.domain = discover_domain(&hits, &self.org_name);
        match &state.domain {
            Some(domain) => {
                info!(%domain, "organization domain discovered");
                let scoped = queries::domain_scoped(bare_domain(domain));
                state.units.extend(search.run_round(&scoped).await);
            }
            None => info!("no organization domain found, site stages will be skipped"),
        }
        state.record(Stage::DomainDiscovery);
    }

    async fn crawl_site(&self, domain: &str, state: &mut JobState) {
        let base = match Url::parse(&format!("https://{domain}")) {
            Ok(base) => base,
            Err(e) => {
                warn!(%domain, error = %e, "discovered domain is not a valid host");
                return;
            }
        };

        let crawler = SiteCrawler::new(self.config.crawl.clone(), self.services.fetcher.clone());
        let mut session = crawler.start(base);

        crawler.scrape_seeds(&mut session).await;
        state.record(Stage::SiteScrape);

        crawler.expand_frontier(&mut session).await;
        state.record(Stage::DeepCrawl);

        debug!(
            attempts = session.attempts(),
            duplicates = session.duplicates_skipped(),
            "site crawl finished"
        );
        let pages = session.into_pages();
        state.pages_crawled = pages.len();
        state.units.extend(
            pages
                .into_iter()
                .map(|page| RawContentUnit::new(page.url, page.text)),
        );
    }

    fn infer_email_pattern(&self, domain: &str, state: &mut JobState) {
        let domain = bare_domain(domain);
        state.known_emails = collect_known_emails(state.units.iter().map(|u| u.text.as_str()), domain);

        if !state.known_emails.is_empty() {
            let template = self
                .services
                .detector
                .detect(&state.known_emails, domain)
                .unwrap_or(EmailTemplate::FirstDotLast);
            info!(
                known = state.known_emails.len(),
                pattern = %template,
                "email pattern detected"
            );
            state.template = Some(template);
        }
        state.record(Stage::EmailInference);
    }

    async fn extract_contacts(&self, state: &mut JobState) {
        let today = Local::now().date_naive();
        let email_domain = state.domain.as_deref().map(bare_domain);

        let candidates = extract_all(
            self.services.extractor.as_ref(),
            &state.units,
            &self.org_name,
            self.config.batch_chars,
            self.config.min_unit_chars,
        )
        .await;

        let records = candidates
            .into_iter()
            .map(|(candidate, fallback)| {
                let mut record = candidate.into_record(&self.org_name, &self.region, &fallback, today);
                if !record.has_email() {
                    let inferred = state
                        .template
                        .zip(email_domain)
                        .and_then(|(t, d)| t.apply(&record.first_name, &record.last_name, d));
                    if let Some(email) = inferred {
                        record.email = email;
                        record.email_confidence = EmailConfidence::Inferred;
                    }
                }
                record
            })
            .collect();

        merge_contacts(&mut state.contacts, records);
        state.record(Stage::Extraction);
    }
}
