//! Shared types, error model, and configuration for LeadScout.
//!
//! This crate is the foundation depended on by all other LeadScout crates.
//! It provides:
//! - [`LeadScoutError`]: the unified error type
//! - Domain types ([`ContactRecord`], [`EmailConfidence`], [`RawContentUnit`],
//!   [`SearchHit`], [`ResearchSummary`])
//! - Configuration ([`AppConfig`], [`ResearchConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CrawlConfig, CrawlSettings, DefaultsConfig, ExtractionConfig, ResearchConfig,
    SearchConfig, StorageConfig, TARGET_DEPARTMENTS, config_dir, config_file_path, init_config,
    load_config, load_config_from, read_api_key,
};
pub use error::{LeadScoutError, Result};
pub use types::{
    ContactRecord, EmailConfidence, RawContentUnit, ResearchSummary, SearchHit, dedup_key,
};
