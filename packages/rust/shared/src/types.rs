//! Core domain types shared across the research pipeline.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// EmailConfidence
// ---------------------------------------------------------------------------

/// How certain we are that a contact's email is correct.
///
/// Variants are declared most-confident first, so the derived `Ord` sorts
/// `Verified < Likely < Inferred < Unknown`, which is the output order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmailConfidence {
    /// Email explicitly shown in a source and seen on the org's domain.
    Verified,
    /// Email pattern confirmed by the org, name matches.
    Likely,
    /// Email constructed from a detected pattern, unconfirmed.
    Inferred,
    /// No email found.
    #[default]
    Unknown,
}

impl EmailConfidence {
    /// Sort rank: lower is more confident.
    pub fn rank(self) -> u8 {
        match self {
            Self::Verified => 0,
            Self::Likely => 1,
            Self::Inferred => 2,
            Self::Unknown => 3,
        }
    }

    /// Upgrade to `other` if it is more confident. Never downgrades.
    pub fn upgrade(&mut self, other: EmailConfidence) {
        if other < *self {
            *self = other;
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Verified => "VERIFIED",
            Self::Likely => "LIKELY",
            Self::Inferred => "INFERRED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for EmailConfidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmailConfidence {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "VERIFIED" => Ok(Self::Verified),
            "LIKELY" => Ok(Self::Likely),
            "INFERRED" => Ok(Self::Inferred),
            "UNKNOWN" | "" => Ok(Self::Unknown),
            other => Err(format!("unknown email confidence '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// ContactRecord
// ---------------------------------------------------------------------------

/// A single researched contact, as handed to the completion sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub first_name: String,
    pub last_name: String,
    pub title: String,
    /// Lowercased email, empty when unknown.
    pub email: String,
    pub email_confidence: EmailConfidence,
    pub work_phone: String,
    /// School/unit name for unit-level contacts, org name otherwise.
    pub account: String,
    pub org_name: String,
    pub region: String,
    pub source_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
    pub date_found: NaiveDate,
}

impl ContactRecord {
    /// Composite dedup key: `first|last|org`, lowercased.
    pub fn dedup_key(&self) -> String {
        dedup_key(&self.first_name, &self.last_name, &self.org_name)
    }

    pub fn has_email(&self) -> bool {
        !self.email.is_empty()
    }
}

/// Build the lowercase `first|last|org` key identifying a unique contact.
pub fn dedup_key(first_name: &str, last_name: &str, org_name: &str) -> String {
    format!(
        "{}|{}|{}",
        first_name.trim().to_lowercase(),
        last_name.trim().to_lowercase(),
        org_name.trim().to_lowercase()
    )
}

// ---------------------------------------------------------------------------
// RawContentUnit / SearchHit
// ---------------------------------------------------------------------------

/// A piece of raw text gathered by a search or crawl stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawContentUnit {
    pub source_url: String,
    pub text: String,
}

impl RawContentUnit {
    pub fn new(source_url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            text: text.into(),
        }
    }
}

/// One organic result returned by a search provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

// ---------------------------------------------------------------------------
// ResearchSummary
// ---------------------------------------------------------------------------

/// Terminal output of one research job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchSummary {
    pub org_name: String,
    pub region: String,
    pub contacts: Vec<ContactRecord>,
    pub total: usize,
    pub with_email_count: usize,
    pub no_email_count: usize,
    /// Audit trail of stage tags, in execution order.
    pub stages_executed: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovered_domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_pattern: Option<String>,
    #[serde(default)]
    pub pages_crawled: usize,
}

impl ResearchSummary {
    /// Build a summary, deriving the counts from `contacts`.
    pub fn new(
        org_name: impl Into<String>,
        region: impl Into<String>,
        contacts: Vec<ContactRecord>,
        stages_executed: Vec<String>,
    ) -> Self {
        let total = contacts.len();
        let with_email_count = contacts.iter().filter(|c| c.has_email()).count();
        Self {
            org_name: org_name.into(),
            region: region.into(),
            contacts,
            total,
            with_email_count,
            no_email_count: total - with_email_count,
            stages_executed,
            discovered_domain: None,
            email_pattern: None,
            pages_crawled: 0,
        }
    }
}
