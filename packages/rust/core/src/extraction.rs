//! Contact extraction service boundary.
//!
//! Raw content is batched under a character budget and handed to a
//! [`ContactExtractor`]. Whatever the service returns is validated into
//! [`ContactCandidate`]s here, so nothing loosely typed reaches the job.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use leadscout_shared::{
    ContactRecord, EmailConfidence, LeadScoutError, RawContentUnit, Result, dedup_key,
};

/// User-Agent string for extraction requests.
const USER_AGENT: &str = concat!("LeadScout/", env!("CARGO_PKG_VERSION"));

const EXTRACTION_PROMPT: &str = r#"You extract contact records for an education sales team.

From the provided text, find people whose role relates to Computer Science, coding,
STEM/STEAM, CTE (Career & Technical Education), educational or instructional technology,
digital learning, curriculum, innovation, robotics, esports, makerspaces or AP CS, plus
superintendents and principals. Skip general administrative, HR and finance staff.

Return ONLY a JSON array, no prose. Each element has exactly these keys, using "" when unknown:
first_name, last_name, title, email, work_phone, account, org_name, source_url,
email_confidence, notes

email_confidence is one of:
- VERIFIED: the email is shown in the source
- LIKELY: the organization's pattern is confirmed and the name matches
- INFERRED: built from a pattern, unconfirmed
- UNKNOWN: no email found

account is the school or unit name for unit-level contacts, else the organization name.
If nobody qualifies, return []."#;

// ---------------------------------------------------------------------------
// ContactCandidate
// ---------------------------------------------------------------------------

/// A contact proposed by the extraction service, already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactCandidate {
    pub first_name: String,
    pub last_name: String,
    pub title: String,
    /// Lowercased, empty when unknown.
    pub email: String,
    pub email_confidence: EmailConfidence,
    pub work_phone: String,
    /// Empty means "the organization itself".
    pub account: String,
    /// Empty means "the first source of the batch".
    pub source_url: String,
    pub notes: String,
}

/// Loose shape accepted from the service before validation.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireCandidate {
    first_name: Option<String>,
    last_name: Option<String>,
    title: Option<String>,
    email: Option<String>,
    email_confidence: Option<String>,
    work_phone: Option<String>,
    account: Option<String>,
    source_url: Option<String>,
    notes: Option<String>,
}

fn clean(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

impl TryFrom<WireCandidate> for ContactCandidate {
    type Error = LeadScoutError;

    fn try_from(wire: WireCandidate) -> Result<Self> {
        let email_confidence = clean(wire.email_confidence)
            .parse::<EmailConfidence>()
            .map_err(LeadScoutError::validation)?;

        let first_name = clean(wire.first_name);
        let last_name = clean(wire.last_name);
        if first_name.is_empty() && last_name.is_empty() {
            return Err(LeadScoutError::validation("candidate has no name"));
        }

        Ok(Self {
            first_name,
            last_name,
            title: clean(wire.title),
            email: clean(wire.email).to_lowercase(),
            email_confidence,
            work_phone: clean(wire.work_phone),
            account: clean(wire.account),
            source_url: clean(wire.source_url),
            notes: clean(wire.notes),
        })
    }
}

impl ContactCandidate {
    /// Minimal candidate with just a name; remaining fields blank.
    pub fn named(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            title: String::new(),
            email: String::new(),
            email_confidence: EmailConfidence::Unknown,
            work_phone: String::new(),
            account: String::new(),
            source_url: String::new(),
            notes: String::new(),
        }
    }

    /// Stamp job context onto the candidate.
    pub fn into_record(
        self,
        org_name: &str,
        region: &str,
        fallback_source: &str,
        date_found: NaiveDate,
    ) -> ContactRecord {
        ContactRecord {
            first_name: self.first_name,
            last_name: self.last_name,
            title: self.title,
            email: self.email,
            email_confidence: self.email_confidence,
            work_phone: self.work_phone,
            account: if self.account.is_empty() {
                org_name.to_string()
            } else {
                self.account
            },
            org_name: org_name.to_string(),
            region: region.to_string(),
            source_url: if self.source_url.is_empty() {
                fallback_source.to_string()
            } else {
                self.source_url
            },
            notes: self.notes,
            date_found,
        }
    }
}

/// Parse a service reply into validated candidates.
///
/// The reply must hold a JSON array, optionally wrapped in a Markdown code
/// fence. Elements that fail validation are dropped individually.
pub fn parse_candidates(reply: &str) -> Result<Vec<ContactCandidate>> {
    let body = strip_code_fence(reply);
    let values: Vec<serde_json::Value> = serde_json::from_str(body)
        .map_err(|e| LeadScoutError::parse(format!("extraction reply is not a JSON array: {e}")))?;

    let mut candidates = Vec::with_capacity(values.len());
    for value in values {
        let wire: WireCandidate = match serde_json::from_value(value) {
            Ok(wire) => wire,
            Err(e) => {
                debug!(error = %e, "malformed candidate, skipping");
                continue;
            }
        };
        match ContactCandidate::try_from(wire) {
            Ok(candidate) => candidates.push(candidate),
            Err(e) => debug!(error = %e, "candidate rejected"),
        }
    }
    Ok(candidates)
}

fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

// ---------------------------------------------------------------------------
// ContactExtractor
// ---------------------------------------------------------------------------

/// An external service that turns raw text into contact candidates.
#[async_trait]
pub trait ContactExtractor: Send + Sync {
    async fn extract(&self, batch: &[RawContentUnit], org_name: &str)
    -> Result<Vec<ContactCandidate>>;
}

/// Extractor used when no service is configured. Finds nobody.
pub struct NoopExtractor;

#[async_trait]
impl ContactExtractor for NoopExtractor {
    async fn extract(
        &self,
        batch: &[RawContentUnit],
        _org_name: &str,
    ) -> Result<Vec<ContactCandidate>> {
        warn!(units = batch.len(), "no extraction service configured, skipping batch");
        Ok(Vec::new())
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: String,
}

/// Extraction via an OpenAI-compatible chat completion API (OpenRouter).
pub struct OpenRouterExtractor {
    api_key: String,
    base_url: String,
    model: String,
    client: Client,
}

impl OpenRouterExtractor {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| LeadScoutError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client,
        })
    }
}

#[async_trait]
impl ContactExtractor for OpenRouterExtractor {
    async fn extract(
        &self,
        batch: &[RawContentUnit],
        org_name: &str,
    ) -> Result<Vec<ContactCandidate>> {
        let prompt = batch_prompt(batch, org_name);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: EXTRACTION_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: 0.0,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| LeadScoutError::Extraction(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LeadScoutError::Extraction(format!("HTTP {status}: {body}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LeadScoutError::parse(format!("extraction response: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LeadScoutError::Extraction("empty completion".into()))?;

        parse_candidates(&content)
    }
}

fn batch_prompt(batch: &[RawContentUnit], org_name: &str) -> String {
    let mut prompt = format!("Organization: {org_name}\n\nRaw content:\n");
    for unit in batch {
        prompt.push_str(&format!("--- Source: {} ---\n{}\n\n", unit.source_url, unit.text));
    }
    prompt.push_str("Extract every matching contact. Return the JSON array only.");
    prompt
}

// ---------------------------------------------------------------------------
// Batching
// ---------------------------------------------------------------------------

/// Group units into batches whose combined text stays within `budget` chars.
///
/// Units shorter than `min_chars` are dropped. A unit larger than the whole
/// budget is truncated and sent alone.
pub fn build_batches(
    units: &[RawContentUnit],
    budget: usize,
    min_chars: usize,
) -> Vec<Vec<RawContentUnit>> {
    let mut batches = Vec::new();
    let mut current: Vec<RawContentUnit> = Vec::new();
    let mut used = 0;

    for unit in units {
        let text = unit.text.trim();
        let len = text.chars().count();
        if len < min_chars {
            continue;
        }

        let len = len.min(budget);
        let unit = RawContentUnit::new(
            unit.source_url.clone(),
            text.chars().take(len).collect::<String>(),
        );

        if !current.is_empty() && used + len > budget {
            batches.push(std::mem::take(&mut current));
            used = 0;
        }
        used += len;
        current.push(unit);
    }

    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

/// Run every batch through `extractor` and dedup the results (first wins).
///
/// A failing batch contributes nothing. Returned pairs carry the batch's
/// first source URL as the fallback for candidates that name none.
pub async fn extract_all(
    extractor: &dyn ContactExtractor,
    units: &[RawContentUnit],
    org_name: &str,
    budget: usize,
    min_chars: usize,
) -> Vec<(ContactCandidate, String)> {
    let batches = build_batches(units, budget, min_chars);
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for (i, batch) in batches.iter().enumerate() {
        let fallback = batch
            .first()
            .map(|u| u.source_url.clone())
            .unwrap_or_default();

        let candidates = match extractor.extract(batch, org_name).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(batch = i, error = %e, "extraction failed, batch yields nothing");
                continue;
            }
        };

        debug!(batch = i, candidates = candidates.len(), "batch extracted");
        for candidate in candidates {
            if seen.insert(dedup_key(&candidate.first_name, &candidate.last_name, org_name)) {
                out.push((candidate, fallback.clone()));
            }
        }
    }

    info!(batches = batches.len(), candidates = out.len(), "extraction complete");
    out
}
