//! Page fetching behind a trait so crawls can run against fakes.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use leadscout_shared::{LeadScoutError, Result};
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

/// User-Agent string for crawl requests.
const USER_AGENT: &str = concat!("LeadScout/", env!("CARGO_PKG_VERSION"));

/// Fetches the raw HTML of a page.
///
/// Any failure (network, non-2xx status, blocked target) yields `None`. The
/// crawler treats a missing page as a used attempt and moves on.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Option<String>;
}

// ---------------------------------------------------------------------------
// HttpFetcher
// ---------------------------------------------------------------------------

/// reqwest-backed fetcher with a per-request timeout and SSRF guard.
pub struct HttpFetcher {
    client: Client,
    /// Allow localhost/private IPs (for integration tests with mock servers).
    allow_localhost: bool,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(timeout)
            .build()
            .map_err(|e| LeadScoutError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            allow_localhost: false,
        })
    }

    /// Allow fetching localhost/private IPs (for integration tests).
    #[cfg(test)]
    pub fn allow_localhost(mut self) -> Self {
        self.allow_localhost = true;
        self
    }

    async fn get(&self, url: &Url) -> Result<String> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| LeadScoutError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LeadScoutError::Network(format!("{url}: HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| LeadScoutError::Network(format!("{url}: body read failed: {e}")))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Option<String> {
        if !self.allow_localhost && is_ssrf_target(url) {
            warn!(%url, "SSRF protection: blocked");
            return None;
        }

        match self.get(url).await {
            Ok(body) => Some(body),
            Err(e) => {
                debug!(error = %e, "fetch failed");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Check if a URL targets a potentially dangerous resource.
pub(crate) fn is_ssrf_target(url: &Url) -> bool {
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    if let Some(host) = url.host_str() {
        let bare = host.trim_start_matches('[').trim_end_matches(']');
        if let Ok(ip) = bare.parse::<IpAddr>() {
            return is_private_ip(&ip);
        }
        if host == "localhost" || host.ends_with(".local") || host.ends_with(".internal") {
            return true;
        }
    }

    false
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}
