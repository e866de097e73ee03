//! HTTP retrieval of feed documents.
//!
//! [`FeedClient`] is the seam between the fetcher and the network; the
//! production implementation enforces URL policy, timeouts and a size cap.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::config::FetchConfig;
use crate::error::{FeedmergeError, Result};

/// Retrieves raw feed documents.
#[async_trait]
pub trait FeedClient: Send + Sync {
    /// Download the document at `url`.
    async fn get(&self, url: &str) -> Result<Vec<u8>>;
}

/// Feed client backed by reqwest.
pub struct HttpFeedClient {
    client: Client,
    max_feed_size: u64,
    block_private_hosts: bool,
}

impl HttpFeedClient {
    /// Create a client from fetch configuration.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.total_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| FeedmergeError::Fetch(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_feed_size: config.max_feed_size_bytes,
            block_private_hosts: config.block_private_hosts,
        })
    }
}

#[async_trait]
impl FeedClient for HttpFeedClient {
    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        validate_url(url, self.block_private_hosts)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FeedmergeError::Fetch(format!("failed to fetch feed: {}", e)))?;

        if !response.status().is_success() {
            return Err(FeedmergeError::Fetch(format!(
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
            .map_err(|e| FeedmergeError::Fetch(format!("failed to read response: {}", e)))?;

        if bytes.len() as u64 > self.max_feed_size {
            return Err(too_large(bytes.len() as u64, self.max_feed_size));
        }

        Ok(bytes.to_vec())
    }
}

fn too_large(size: u64, max: u64) -> FeedmergeError {
    FeedmergeError::Fetch(format!(
        "feed too large: {} bytes (max {} bytes)",
        size, max
    ))
}

/// Check that a feed URL is http(s) and, when `block_private_hosts` is set,
/// that it does not point at a loopback, private or link-local host.
pub fn validate_url(url: &str, block_private_hosts: bool) -> Result<()> {
    let parsed =
        url::Url::parse(url).map_err(|e| FeedmergeError::Fetch(format!("invalid URL: {}", e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(FeedmergeError::Fetch(format!(
                "unsupported URL scheme: {}",
                scheme
            )));
        }
    }

    let host = parsed
        .host()
        .ok_or_else(|| FeedmergeError::Fetch("URL has no host".to_string()))?;

    if !block_private_hosts {
        return Ok(());
    }

    match host {
        url::Host::Domain(domain) if is_forbidden_hostname(domain) => {
            Err(FeedmergeError::Fetch(format!("forbidden host: {}", domain)))
        }
        url::Host::Ipv4(ip) if is_private_ip(&IpAddr::V4(ip)) => Err(FeedmergeError::Fetch(
            format!("private IP address not allowed: {}", ip),
        )),
        url::Host::Ipv6(ip) if is_private_ip(&IpAddr::V6(ip)) => Err(FeedmergeError::Fetch(
            format!("private IP address not allowed: {}", ip),
        )),
        _ => Ok(()),
    }
}

fn is_forbidden_hostname(host: &str) -> bool {
    const SUFFIXES: [&str; 5] = [".local", ".localhost", ".internal", ".lan", ".home"];

    let host = host.to_lowercase();
    host == "localhost" || SUFFIXES.iter().any(|s| host.ends_with(s))
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                || v4.is_documentation()
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                // Unique local fc00::/7
                || (first & 0xfe00) == 0xfc00
                // Link-local fe80::/10
                || (first & 0xffc0) == 0xfe80
        }
    }
}
