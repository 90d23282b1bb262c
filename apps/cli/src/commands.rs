//! CLI command definitions, routing, and tracing setup.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use leadscout_core::{
    ContactExtractor, FirstMatchDetector, NoopExtractor, OpenRouterExtractor, ResearchQueue,
    ResearchReporter, ResearchServices,
};
use leadscout_crawler::HttpFetcher;
use leadscout_discovery::{NoopSearchProvider, SearchProvider, SerperClient};
use leadscout_shared::{
    AppConfig, ResearchConfig, ResearchSummary, init_config, load_config, read_api_key,
};
use leadscout_storage::LeadStore;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// LeadScout: find decision-makers at target organizations.
#[derive(Parser)]
#[command(
    name = "leadscout",
    version,
    about = "Research organizations and collect decision-maker contacts.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Research one or more organizations, one job at a time.
    Research {
        /// Organization names, e.g. "Austin ISD".
        #[arg(required = true)]
        orgs: Vec<String>,

        /// Region hint added to search queries (defaults to config).
        #[arg(short, long)]
        region: Option<String>,
    },

    /// Show stored lead counts.
    Leads,

    /// Show recent research runs.
    Log {
        /// Number of runs to show.
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "leadscout=info",
        1 => "leadscout=debug",
        _ => "leadscout=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Research { orgs, region } => cmd_research(&orgs, region).await,
        Command::Leads => cmd_leads().await,
        Command::Log { limit } => cmd_log(limit).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

async fn open_store(config: &AppConfig) -> Result<LeadStore> {
    let path = config.storage.resolved_db_path()?;
    Ok(LeadStore::open(&path).await?)
}

// ---------------------------------------------------------------------------
// research
// ---------------------------------------------------------------------------

async fn cmd_research(orgs: &[String], region: Option<String>) -> Result<()> {
    let config = load_config()?;
    let region = region.unwrap_or_else(|| config.defaults.region.clone());

    let orgs: Vec<&str> = orgs
        .iter()
        .map(|o| o.trim())
        .filter(|o| !o.is_empty())
        .collect();
    if orgs.is_empty() {
        return Err(eyre!("no organization names given"));
    }

    let store = Arc::new(open_store(&config).await?);
    let services = build_services(&config)?;
    let queue = ResearchQueue::start(services, ResearchConfig::from(&config));
    let reporter = Arc::new(CliReporter::new(store));

    for org in &orgs {
        queue.enqueue(*org, region.clone(), reporter.clone())?;
    }
    info!(jobs = orgs.len(), region = %region, "research started");

    queue.shutdown().await;
    reporter.finish();

    Ok(())
}

/// Wire the live search, fetch, and extraction services. A missing API key
/// degrades that service to a no-op instead of aborting the run.
fn build_services(config: &AppConfig) -> Result<ResearchServices> {
    let search: Arc<dyn SearchProvider> =
        match read_api_key(&config.search.api_key_env, "Serper") {
            Ok(key) => Arc::new(SerperClient::new(
                key,
                config.search.endpoint.clone(),
                Duration::from_secs(config.search.timeout_secs),
            )?),
            Err(e) => {
                warn!(error = %e, "search disabled");
                Arc::new(NoopSearchProvider)
            }
        };

    let extractor: Arc<dyn ContactExtractor> =
        match read_api_key(&config.extraction.api_key_env, "OpenRouter") {
            Ok(key) => Arc::new(OpenRouterExtractor::new(
                key,
                config.extraction.endpoint.clone(),
                config.extraction.model.clone(),
                Duration::from_secs(config.extraction.timeout_secs),
            )?),
            Err(e) => {
                warn!(error = %e, "contact extraction disabled");
                Arc::new(NoopExtractor)
            }
        };

    let fetcher = HttpFetcher::new(Duration::from_secs(config.crawl.timeout_secs))?;

    Ok(ResearchServices {
        search,
        fetcher: Arc::new(fetcher),
        extractor,
        detector: Arc::new(FirstMatchDetector),
    })
}

/// Queue notices for jobs that errored or panicked. These stay on screen
/// instead of being overwritten by the next job's status.
fn is_failure_notice(message: &str) -> bool {
    message.starts_with("Research failed for ") || message.starts_with("Research crashed for ")
}

/// Shows job progress on a spinner and stores each finished summary.
struct CliReporter {
    spinner: ProgressBar,
    store: Arc<LeadStore>,
}

impl CliReporter {
    fn new(store: Arc<LeadStore>) -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner, store }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }

    fn print_summary(&self, summary: &ResearchSummary, written: &str) {
        let lines = [
            String::new(),
            format!("  {}", summary.org_name),
            format!(
                "  Domain:    {}",
                summary.discovered_domain.as_deref().unwrap_or("-")
            ),
            format!(
                "  Pattern:   {}",
                summary.email_pattern.as_deref().unwrap_or("-")
            ),
            format!("  Pages:     {}", summary.pages_crawled),
            format!(
                "  Contacts:  {} ({} with email, {} without)",
                summary.total, summary.with_email_count, summary.no_email_count
            ),
            format!("  Stored:    {written}"),
            format!("  Stages:    {}", summary.stages_executed.join(" > ")),
        ];
        for line in lines {
            self.spinner.println(line);
        }
    }
}

#[async_trait]
impl ResearchReporter for CliReporter {
    fn on_progress(&self, message: &str) {
        if is_failure_notice(message) {
            self.spinner.println(format!("  {message}"));
        } else {
            self.spinner.set_message(message.to_string());
        }
    }

    async fn on_complete(&self, summary: ResearchSummary) -> leadscout_shared::Result<()> {
        let stats = self.store.write_contacts(&summary.contacts).await?;

        let mut notes = Vec::new();
        if let Some(domain) = &summary.discovered_domain {
            notes.push(format!("domain: {domain}"));
        }
        if let Some(pattern) = &summary.email_pattern {
            notes.push(format!("pattern: {pattern}"));
        }
        self.store.log_research(&summary, &notes.join("; ")).await?;

        let written = format!(
            "{} new with email, {} new without, {} already known",
            stats.written_with_email, stats.written_no_email, stats.skipped_existing
        );
        self.print_summary(&summary, &written);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// leads / log
// ---------------------------------------------------------------------------

async fn cmd_leads() -> Result<()> {
    let config = load_config()?;
    let store = open_store(&config).await?;
    let counts = store.count_leads().await?;

    println!();
    println!("  Leads:       {}", counts.total);
    println!("  With email:  {}", counts.with_email);
    println!("  No email:    {}", counts.no_email);
    println!();
    Ok(())
}

async fn cmd_log(limit: usize) -> Result<()> {
    let config = load_config()?;
    let store = open_store(&config).await?;
    let entries = store.recent_research(limit).await?;

    if entries.is_empty() {
        println!("No research runs recorded yet.");
        return Ok(());
    }

    for entry in entries {
        let region = if entry.region.is_empty() {
            String::new()
        } else {
            format!(" ({})", entry.region)
        };
        println!(
            "{}  {}{}  {} contacts, {} with email",
            entry.logged_at.format("%Y-%m-%d %H:%M"),
            entry.org_name,
            region,
            entry.total,
            entry.with_email,
        );
        if !entry.notes.is_empty() {
            println!("    {}", entry.notes);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
