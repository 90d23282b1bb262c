//! Heuristic detection of an organization's own web domain.

use leadscout_shared::SearchHit;
use url::Url;

/// Hosts that never belong to the organization itself.
const BLOCKED_DOMAINS: &[&str] = &[
    "linkedin.com",
    "twitter.com",
    "facebook.com",
    "wikipedia.org",
    "niche.com",
    "greatschools.org",
    "schooldigger.com",
    "usnews.com",
    "indeed.com",
    "glassdoor.com",
    "youtube.com",
    "instagram.com",
];

/// Host fragments typical of institutional sites.
const INSTITUTION_SIGNALS: &[&str] = &[
    ".k12.", "schools", "isd", "usd", "csd", "unified", "district", "cusd",
];

/// Org-name words too generic to identify a domain.
const GENERIC_WORDS: &[&str] = &["school", "district", "unified", "public", "city", "county"];

/// Number of significant org-name words tried against the host.
const NAME_WORDS_CHECKED: usize = 2;

/// Does `url` look like the organization's own site?
pub fn looks_like_org_domain(url: &str, org_name: &str) -> bool {
    let Some(host) = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
    else {
        return false;
    };

    if BLOCKED_DOMAINS.iter().any(|b| host.contains(b)) {
        return false;
    }

    if INSTITUTION_SIGNALS.iter().any(|s| host.contains(s)) {
        return true;
    }

    let org_lower = org_name.to_lowercase();
    org_lower
        .split_whitespace()
        .filter(|w| w.len() > 3 && !GENERIC_WORDS.contains(w))
        .take(NAME_WORDS_CHECKED)
        .any(|w| host.contains(w))
}

/// Host of the first hit that passes [`looks_like_org_domain`].
pub fn discover_domain(hits: &[SearchHit], org_name: &str) -> Option<String> {
    hits.iter()
        .filter(|hit| !hit.url.is_empty())
        .find(|hit| looks_like_org_domain(&hit.url, org_name))
        .and_then(|hit| Url::parse(&hit.url).ok())
        .and_then(|u| u.host_str().map(str::to_lowercase))
}

/// The domain with any leading `www.` removed, as used in email addresses.
pub fn bare_domain(domain: &str) -> &str {
    domain.strip_prefix("www.").unwrap_or(domain)
}
