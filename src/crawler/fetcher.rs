//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with a proper user agent string
//! - Consulting the response cache before touching the network
//! - Retry with exponential backoff for transient failures
//! - The fixed politeness delay after every network request
//! - Classifying failures into `Unreachable` and `RateLimited`

use crate::cache::{cache_key, ResponseCache};
use crate::config::{Config, UserAgentConfig};
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// Accept header sent with every request
const ACCEPT_VALUE: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,text/markdown;q=0.9,application/json;q=0.9,*/*;q=0.8";

/// Header the contents API uses to report the remaining request budget
const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";

/// Cached pseudo-header holding the URL a response was served from
const FINAL_URL_HEADER: &str = "x-final-url";

/// Why a fetch produced no content
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureKind {
    /// Network or HTTP failure after retries; affects only this page
    #[error("{url} unreachable: {reason}")]
    Unreachable {
        url: String,
        reason: String,
        status: Option<u16>,
    },

    /// The remote is throttling us
    #[error("rate limited by remote at {url} (HTTP {status})")]
    RateLimited { url: String, status: u16 },
}

impl FailureKind {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Unreachable { url, .. } | Self::RateLimited { url, .. } => url,
        }
    }
}

/// A successful fetch
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// Final URL after redirects (the requested URL for cache hits)
    pub final_url: String,
    pub content_type: String,
    pub body: String,
    /// True if the body came from the response cache
    pub from_cache: bool,
}

/// Retry, delay and cache settings for a fetcher
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Backoff before the first retry; doubles on every further retry
    pub backoff_base: Duration,
    /// Sleep after every network fetch
    pub request_delay: Duration,
    /// Cache TTL (zero disables the cache)
    pub cache_ttl: Duration,
}

impl FetchPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_retries: config.crawler.max_retries,
            backoff_base: Duration::from_millis(config.crawler.backoff_base_ms),
            request_delay: Duration::from_millis(config.crawler.request_delay_ms),
            cache_ttl: Duration::from_secs(config.output.cache_ttl),
        }
    }

    /// Backoff before retry number `attempt` (zero-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base.saturating_mul(1u32 << attempt.min(16))
    }
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use docs_harvester::config::UserAgentConfig;
/// use docs_harvester::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(&UserAgentConfig::default(), Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent_string())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Outcome of a single HTTP attempt
enum Attempt {
    Done(FetchResult),
    Retry(FailureKind),
    Fatal(FailureKind),
}

/// Cache-aware HTTP fetcher with retry and politeness delay
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | HTTP 2xx | Success, stored in cache |
/// | HTTP 403/429 with `x-ratelimit-remaining: 0` | Immediate → RateLimited |
/// | HTTP 429 | Retry with backoff; RateLimited when exhausted |
/// | HTTP 5xx | Retry with backoff; Unreachable when exhausted |
/// | Other HTTP 4xx | Immediate → Unreachable |
/// | Timeout / connection error | Retry with backoff; Unreachable when exhausted |
pub struct Fetcher {
    client: Client,
    cache: Option<Box<dyn ResponseCache>>,
    policy: FetchPolicy,
    requests_issued: u64,
}

impl Fetcher {
    /// Creates a fetcher; `cache` is ignored when the policy's TTL is zero
    pub fn new(
        client: Client,
        cache: Option<Box<dyn ResponseCache>>,
        policy: FetchPolicy,
    ) -> Self {
        let cache = if policy.cache_ttl.is_zero() {
            None
        } else {
            cache
        };
        Self {
            client,
            cache,
            policy,
            requests_issued: 0,
        }
    }

    /// Number of HTTP requests sent so far, retries included
    pub fn requests_issued(&self) -> u64 {
        self.requests_issued
    }

    /// Fetches `url`, from the cache when possible
    ///
    /// `auth_token` is sent as `Authorization: token <t>` when present.
    pub async fn fetch(
        &mut self,
        url: &str,
        auth_token: Option<&str>,
    ) -> Result<FetchResult, FailureKind> {
        let key = cache_key(url);

        if let Some(hit) = self.cache_lookup(&key, url) {
            tracing::debug!("Cache hit for {}", url);
            return Ok(hit);
        }

        let mut retries = 0;
        let result = loop {
            match self.attempt(url, auth_token).await {
                Attempt::Done(result) => break Ok(result),
                Attempt::Fatal(failure) => break Err(failure),
                Attempt::Retry(failure) => {
                    if retries >= self.policy.max_retries {
                        break Err(failure);
                    }
                    let delay = self.policy.backoff(retries);
                    retries += 1;
                    tracing::warn!(
                        "Retry {}/{} for {} in {:?}: {}",
                        retries,
                        self.policy.max_retries,
                        url,
                        delay,
                        failure
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        };

        if let Ok(fetched) = &result {
            self.cache_store(&key, fetched);
        }

        if !self.policy.request_delay.is_zero() {
            tokio::time::sleep(self.policy.request_delay).await;
        }

        result
    }

    /// Sends one GET request and classifies the response
    async fn attempt(&mut self, url: &str, auth_token: Option<&str>) -> Attempt {
        self.requests_issued += 1;

        let mut request = self.client.get(url).header(ACCEPT, ACCEPT_VALUE);
        if let Some(token) = auth_token {
            request = request.header(AUTHORIZATION, format!("token {}", token));
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                let reason = if e.is_timeout() {
                    "Request timeout".to_string()
                } else if e.is_connect() {
                    "Connection refused".to_string()
                } else {
                    e.to_string()
                };
                return Attempt::Retry(FailureKind::Unreachable {
                    url: url.to_string(),
                    reason,
                    status: None,
                });
            }
        };

        let status = response.status();

        if is_rate_limit_exhausted(status, response.headers()) {
            return Attempt::Fatal(FailureKind::RateLimited {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Attempt::Retry(FailureKind::RateLimited {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if !status.is_success() {
            let failure = FailureKind::Unreachable {
                url: url.to_string(),
                reason: format!("HTTP {}", status.as_u16()),
                status: Some(status.as_u16()),
            };
            return if status.is_server_error() {
                Attempt::Retry(failure)
            } else {
                Attempt::Fatal(failure)
            };
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        match response.text().await {
            Ok(body) => Attempt::Done(FetchResult {
                final_url,
                content_type,
                body,
                from_cache: false,
            }),
            Err(e) => Attempt::Retry(FailureKind::Unreachable {
                url: url.to_string(),
                reason: format!("Failed to read body: {}", e),
                status: Some(status.as_u16()),
            }),
        }
    }

    fn cache_lookup(&mut self, key: &str, url: &str) -> Option<FetchResult> {
        let cache = self.cache.as_mut()?;
        match cache.get(key) {
            Ok(Some(entry)) => Some(FetchResult {
                final_url: entry.header(FINAL_URL_HEADER).unwrap_or(url).to_string(),
                content_type: entry.header("content-type").unwrap_or("").to_string(),
                body: entry.body,
                from_cache: true,
            }),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Cache lookup failed for {}: {}", url, e);
                None
            }
        }
    }

    fn cache_store(&mut self, key: &str, fetched: &FetchResult) {
        let ttl = self.policy.cache_ttl;
        let Some(cache) = self.cache.as_mut() else {
            return;
        };
        let headers = vec![
            ("content-type".to_string(), fetched.content_type.clone()),
            (FINAL_URL_HEADER.to_string(), fetched.final_url.clone()),
        ];
        if let Err(e) = cache.put(key, &fetched.body, &headers, ttl) {
            tracing::warn!("Failed to cache {}: {}", fetched.final_url, e);
        }
    }
}

/// Returns true if the response reports an exhausted request budget
fn is_rate_limit_exhausted(status: StatusCode, headers: &HeaderMap) -> bool {
    if status != StatusCode::FORBIDDEN && status != StatusCode::TOO_MANY_REQUESTS {
        return false;
    }
    headers
        .get(RATE_LIMIT_REMAINING)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim() == "0")
        .unwrap_or(false)
}
