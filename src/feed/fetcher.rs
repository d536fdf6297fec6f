//! HTTP feed source.
//!
//! Fetches RSS/Atom documents with reqwest and parses them with feed-rs.
//! URLs pointing at private or loopback hosts are refused.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use feed_rs::parser;
use reqwest::Client;
use tracing::debug;

use crate::config::ScanConfig;
use crate::error::{FeedbellError, Result};
use crate::feed::types::{FeedEntry, ParsedFeed, MAX_FEED_SIZE, UNTITLED_ENTRY, UNTITLED_FEED};
use crate::feed::FeedSource;

/// Connect timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Total timeout in seconds.
const TOTAL_TIMEOUT_SECS: u64 = 30;

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// User agent string for feed fetching.
const USER_AGENT: &str = concat!("feedbell/", env!("CARGO_PKG_VERSION"), " (RSS notifier)");

/// Feed source that reads feeds over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    client: Client,
    max_feed_size: u64,
}

impl HttpFeedSource {
    /// Create a source with default limits.
    pub fn new() -> Result<Self> {
        Self::build(
            Duration::from_secs(CONNECT_TIMEOUT_SECS),
            Duration::from_secs(TOTAL_TIMEOUT_SECS),
            MAX_REDIRECTS,
            MAX_FEED_SIZE,
        )
    }

    /// Create a source with limits taken from the scan configuration.
    pub fn from_config(config: &ScanConfig) -> Result<Self> {
        Self::build(
            Duration::from_secs(config.connect_timeout_secs),
            Duration::from_secs(config.fetch_timeout_secs),
            config.max_redirects,
            config.max_feed_size_bytes,
        )
    }

    fn build(
        connect_timeout: Duration,
        total_timeout: Duration,
        max_redirects: usize,
        max_feed_size: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(total_timeout)
            .redirect(redirect_policy(max_redirects))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FeedbellError::Fetch(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_feed_size,
        })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self, url: &str) -> Result<ParsedFeed> {
        validate_url(url)?;
        debug!("Fetching feed {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FeedbellError::Fetch(format!("failed to fetch feed: {}", e)))?;

        if !response.status().is_success() {
            return Err(FeedbellError::Fetch(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_feed_size {
                return Err(too_large(content_length, self.max_feed_size));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FeedbellError::Fetch(format!("failed to read response: {}", e)))?;

        if bytes.len() as u64 > self.max_feed_size {
            return Err(too_large(bytes.len() as u64, self.max_feed_size));
        }

        parse_feed(&bytes)
    }
}

fn too_large(size: u64, max: u64) -> FeedbellError {
    FeedbellError::Fetch(format!("feed too large: {} bytes (max {} bytes)", size, max))
}

/// Redirect policy that re-applies [`validate_url`] to every hop.
fn redirect_policy(max_redirects: usize) -> reqwest::redirect::Policy {
    reqwest::redirect::Policy::custom(move |attempt| {
        match check_redirect(attempt.url(), attempt.previous().len(), max_redirects) {
            Ok(()) => attempt.follow(),
            Err(e) => attempt.error(e),
        }
    })
}

/// Decide whether a redirect to `target` may be followed after `hops`
/// earlier requests.
fn check_redirect(target: &url::Url, hops: usize, max_redirects: usize) -> Result<()> {
    if hops > max_redirects {
        return Err(FeedbellError::Fetch(format!(
            "too many redirects (max {})",
            max_redirects
        )));
    }
    validate_url(target.as_str())
}

/// Validate a feed URL.
///
/// The URL must use http or https and must not point at a private,
/// loopback or otherwise internal host.
pub fn validate_url(url: &str) -> Result<()> {
    let parsed =
        url::Url::parse(url).map_err(|e| FeedbellError::Validation(format!("invalid URL: {}", e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(FeedbellError::Validation(format!(
                "unsupported URL scheme: {}",
                scheme
            )));
        }
    }

    let host = parsed
        .host()
        .ok_or_else(|| FeedbellError::Validation("URL has no host".to_string()))?;

    let ip = match host {
        url::Host::Domain(domain) => {
            if is_forbidden_hostname(domain) {
                return Err(FeedbellError::Validation(format!(
                    "forbidden host: {}",
                    domain
                )));
            }
            return Ok(());
        }
        url::Host::Ipv4(v4) => IpAddr::V4(v4),
        url::Host::Ipv6(v6) => IpAddr::V6(v6),
    };

    if is_private_ip(&ip) {
        return Err(FeedbellError::Validation(format!(
            "private IP address not allowed: {}",
            ip
        )));
    }

    Ok(())
}

/// Check if a hostname is forbidden.
fn is_forbidden_hostname(host: &str) -> bool {
    const FORBIDDEN_SUFFIXES: &[&str] = &[
        ".local",
        ".localhost",
        ".internal",
        ".intranet",
        ".corp",
        ".home",
        ".lan",
    ];

    let host = host.to_lowercase();
    host == "localhost" || FORBIDDEN_SUFFIXES.iter().any(|s| host.ends_with(s))
}

/// Check if an IP address is private/reserved.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let o = v4.octets();
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                || v4.is_documentation()
                // Carrier-grade NAT: 100.64.0.0/10
                || (o[0] == 100 && (64..=127).contains(&o[1]))
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                // Unique local: fc00::/7
                || (first & 0xfe00) == 0xfc00
                // Link-local: fe80::/10
                || (first & 0xffc0) == 0xfe80
                || v6.to_ipv4_mapped().is_some_and(|v4| is_private_ip(&IpAddr::V4(v4)))
        }
    }
}

/// Parse feed bytes into a ParsedFeed.
///
/// Entries keep document order. An entry without a link falls back to its
/// id when that is an absolute http(s) URL; otherwise it is dropped, since
/// there is nothing to point a notification at.
pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed> {
    let feed = parser::parse(bytes)
        .map_err(|e| FeedbellError::Fetch(format!("failed to parse feed: {}", e)))?;

    let title = feed
        .title
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED_FEED.to_string());

    let entries = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let link = entry
                .links
                .first()
                .map(|l| l.href.clone())
                .or_else(|| {
                    (entry.id.starts_with("http://") || entry.id.starts_with("https://"))
                        .then(|| entry.id.clone())
                })?;
            let title = entry
                .title
                .map(|t| t.content.trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| UNTITLED_ENTRY.to_string());

            Some(FeedEntry {
                title,
                link,
                published_at: entry.published,
                updated_at: entry.updated,
            })
        })
        .collect();

    Ok(ParsedFeed { title, entries })
}
