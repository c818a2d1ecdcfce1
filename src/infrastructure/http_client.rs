//! Rate-limited HTTP client for review page fetching.
//!
//! Wraps `reqwest` with the shared rate limiter, browser-like headers, a
//! rotating user-agent pool and a typed failure taxonomy so callers can tell
//! retryable conditions (HTTP 429) apart from terminal ones.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::services::PageFetcher;
use crate::infrastructure::rate_limiter::RateLimiter;

/// Fixed pool rotated across outbound requests to avoid presenting a uniform
/// client fingerprint to the target server.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:126.0) Gecko/20100101 Firefox/126.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (Version/17.4 Safari/605.1.15)",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0",
];

/// Typed fetch failures. None of these propagate out of the orchestrator's
/// per-URL boundary; they become outcome data.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("rate limited by server (HTTP 429): {url}")]
    RateLimited { url: String },

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("timeout fetching {url}")]
    Timeout { url: String },

    #[error("transport error fetching {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    /// A 429 is a temporary condition the caller may retry after the
    /// server-imposed cooldown; everything else is terminal for the attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::RateLimited { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpClientConfig {
    pub connect_timeout_secs: u64,
    pub total_timeout_secs: u64,
    /// Fixed sleep after an HTTP 429 before surfacing the retryable failure.
    /// Independent of the sliding-window limiter.
    pub rate_limit_cooldown_secs: u64,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            total_timeout_secs: 30,
            rate_limit_cooldown_secs: 60,
        }
    }
}

/// HTTP client with connection reuse, shared rate limiting and per-request
/// user-agent rotation.
pub struct HttpClient {
    client: Client,
    rate_limiter: Arc<RateLimiter>,
    cooldown: Duration,
    agent_index: AtomicUsize,
}

impl HttpClient {
    pub fn new(config: &HttpClientConfig, rate_limiter: Arc<RateLimiter>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let default_agent = USER_AGENTS[fastrand::usize(..USER_AGENTS.len())];
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(default_agent).context("invalid default user agent")?,
        );

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.total_timeout_secs))
            .default_headers(headers)
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            rate_limiter,
            cooldown: Duration::from_secs(config.rate_limit_cooldown_secs),
            agent_index: AtomicUsize::new(0),
        })
    }

    fn next_user_agent(&self) -> &'static str {
        let index = self.agent_index.fetch_add(1, Ordering::Relaxed);
        USER_AGENTS[index % USER_AGENTS.len()]
    }

    /// Rate-limited GET returning the decoded body on HTTP 200.
    pub async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        self.rate_limiter.wait_if_needed().await;

        debug!(url, "fetching page");

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, self.next_user_agent())
            .send()
            .await
            .map_err(|e| classify_transport_error(url, e))?;

        let status = response.status();
        if status.as_u16() == 429 {
            warn!(url, cooldown_secs = self.cooldown.as_secs(), "rate limited by server");
            tokio::time::sleep(self.cooldown).await;
            return Err(FetchError::RateLimited { url: url.to_string() });
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| classify_transport_error(url, e))?;

        debug!(url, bytes = body.len(), "fetched page");
        Ok(body)
    }
}

fn classify_transport_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout { url: url.to_string() }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            source: error,
        }
    }
}

#[async_trait]
impl PageFetcher for HttpClient {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.fetch_page(url).await
    }
}
