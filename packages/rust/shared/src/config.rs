//! Application configuration for LeadScout.
//!
//! User config lives at `~/.leadscout/leadscout.toml`.
//! CLI flags override config file values, which override defaults.
//! Secrets are never stored in the file, only the names of the env vars
//! that hold them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LeadScoutError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "leadscout.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".leadscout";

/// Seed paths fetched on every discovered domain.
pub const DEFAULT_SEED_PATHS: &[&str] = &["/", "/departments", "/staff", "/contact", "/about"];

/// Department names that make a crawled page worth mining for links.
pub const TARGET_DEPARTMENTS: &[&str] = &[
    "computer science",
    "CS department",
    "STEM",
    "STEAM",
    "CTE",
    "career and technical education",
    "curriculum and instruction",
    "educational technology",
    "instructional technology",
    "digital learning",
    "college and career readiness",
    "advanced academics",
    "educational services",
    "instructional services",
    "curriculum",
    "academic programs",
    "innovation",
    "technology",
];

/// How many of [`TARGET_DEPARTMENTS`] trigger frontier expansion.
const FRONTIER_KEYWORD_COUNT: usize = 10;

// ---------------------------------------------------------------------------
// Config structs (matching leadscout.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Search provider settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Site crawl settings.
    #[serde(default)]
    pub crawl: CrawlSettings,

    /// Contact extraction service settings.
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Lead store settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Region used when `--region` is not given (e.g. a US state).
    #[serde(default)]
    pub region: String,
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search API endpoint.
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    /// Name of the env var holding the search API key.
    #[serde(default = "default_search_key_env")]
    pub api_key_env: String,

    /// Result limit per query.
    #[serde(default = "default_results_per_query")]
    pub results_per_query: usize,

    /// Delay in ms between consecutive queries.
    #[serde(default = "default_search_delay")]
    pub delay_ms: u64,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            api_key_env: default_search_key_env(),
            results_per_query: default_results_per_query(),
            delay_ms: default_search_delay(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_search_endpoint() -> String {
    "https://google.serper.dev/search".into()
}
fn default_search_key_env() -> String {
    "SERPER_API_KEY".into()
}
fn default_results_per_query() -> usize {
    10
}
fn default_search_delay() -> u64 {
    300
}
fn default_timeout_secs() -> u64 {
    10
}

/// `[crawl]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSettings {
    /// Maximum fetch attempts per job, seeds included.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Delay in ms between page fetches.
    #[serde(default = "default_crawl_delay")]
    pub delay_ms: u64,

    /// Per-page fetch timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum characters of visible text kept per page.
    #[serde(default = "default_page_text_cap")]
    pub page_text_cap: usize,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            delay_ms: default_crawl_delay(),
            timeout_secs: default_timeout_secs(),
            page_text_cap: default_page_text_cap(),
        }
    }
}

fn default_max_pages() -> usize {
    30
}
fn default_crawl_delay() -> u64 {
    500
}
fn default_page_text_cap() -> usize {
    15_000
}

/// `[extraction]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// OpenAI-compatible API base URL.
    #[serde(default = "default_extraction_endpoint")]
    pub endpoint: String,

    /// Name of the env var holding the extraction API key.
    #[serde(default = "default_extraction_key_env")]
    pub api_key_env: String,

    /// Model used for extraction.
    #[serde(default = "default_model")]
    pub model: String,

    /// Character budget per extraction batch.
    #[serde(default = "default_batch_chars")]
    pub batch_chars: usize,

    /// Content units shorter than this are not sent for extraction.
    #[serde(default = "default_min_unit_chars")]
    pub min_unit_chars: usize,

    /// Per-request timeout.
    #[serde(default = "default_extraction_timeout")]
    pub timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_extraction_endpoint(),
            api_key_env: default_extraction_key_env(),
            model: default_model(),
            batch_chars: default_batch_chars(),
            min_unit_chars: default_min_unit_chars(),
            timeout_secs: default_extraction_timeout(),
        }
    }
}

fn default_extraction_endpoint() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_extraction_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_model() -> String {
    "anthropic/claude-sonnet-4".into()
}
fn default_batch_chars() -> usize {
    12_000
}
fn default_min_unit_chars() -> usize {
    50
}
fn default_extraction_timeout() -> u64 {
    60
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Lead database path. A leading `~/` expands to the home directory.
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "~/.leadscout/leads.db".into()
}

impl StorageConfig {
    /// Resolve `db_path`, expanding a leading `~/`.
    pub fn resolved_db_path(&self) -> Result<PathBuf> {
        match self.db_path.strip_prefix("~/") {
            Some(rest) => {
                let home = dirs::home_dir()
                    .ok_or_else(|| LeadScoutError::config("could not determine home directory"))?;
                Ok(home.join(rest))
            }
            None => Ok(PathBuf::from(&self.db_path)),
        }
    }
}

// ---------------------------------------------------------------------------
// Runtime config (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime crawl configuration.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Maximum fetch attempts per crawl, seeds included.
    pub max_pages: usize,
    /// Delay in ms between fetches.
    pub delay_ms: u64,
    /// Maximum characters of visible text kept per page.
    pub page_text_cap: usize,
    /// Paths fetched before frontier expansion.
    pub seed_paths: Vec<String>,
    /// Keywords that make a page eligible for link mining.
    pub department_keywords: Vec<String>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self::from(&CrawlSettings::default())
    }
}

impl From<&CrawlSettings> for CrawlConfig {
    fn from(settings: &CrawlSettings) -> Self {
        Self {
            max_pages: settings.max_pages,
            delay_ms: settings.delay_ms,
            page_text_cap: settings.page_text_cap,
            seed_paths: DEFAULT_SEED_PATHS.iter().map(|p| p.to_string()).collect(),
            department_keywords: TARGET_DEPARTMENTS
                .iter()
                .take(FRONTIER_KEYWORD_COUNT)
                .map(|k| k.to_string())
                .collect(),
        }
    }
}

/// Runtime configuration for one research job.
#[derive(Debug, Clone)]
pub struct ResearchConfig {
    /// Result limit per search query.
    pub results_per_query: usize,
    /// Delay between search queries.
    pub query_delay: Duration,
    /// Crawl settings.
    pub crawl: CrawlConfig,
    /// Character budget per extraction batch.
    pub batch_chars: usize,
    /// Content units shorter than this are skipped by extraction.
    pub min_unit_chars: usize,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ResearchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            results_per_query: config.search.results_per_query,
            query_delay: Duration::from_millis(config.search.delay_ms),
            crawl: CrawlConfig::from(&config.crawl),
            batch_chars: config.extraction.batch_chars,
            min_unit_chars: config.extraction.min_unit_chars,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.leadscout/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| LeadScoutError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.leadscout/leadscout.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| LeadScoutError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| LeadScoutError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| LeadScoutError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| LeadScoutError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| LeadScoutError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read a secret from the env var named by `var_name`.
pub fn read_api_key(var_name: &str, service: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val.trim().to_string()),
        _ => Err(LeadScoutError::config(format!(
            "{service} API key not found. Set the {var_name} environment variable."
        ))),
    }
}
