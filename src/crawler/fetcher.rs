//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the configured user agent and timeouts
//! - The randomized politeness delay before every request
//! - Retry with exponential backoff for 429, 5xx and network errors
//!
//! The fetcher holds no shared state beyond the connection pool; it is
//! passed explicitly to everything that talks to the network.

use crate::config::Config;
use rand::Rng;
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::{debug, warn};

/// Explicit fetcher settings
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Full User-Agent header value
    pub user_agent: String,

    /// Per-request timeout
    pub timeout: Duration,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Lower bound of the politeness delay
    pub min_delay: Duration,

    /// Upper bound of the politeness delay
    pub max_delay: Duration,

    /// Additional attempts after the first one
    pub max_retries: u32,

    /// Backoff base; attempt n waits `base * 2^n` plus up to `base` of jitter
    pub backoff_base: Duration,
}

impl FetcherConfig {
    /// Builds fetcher settings from the crawl configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            user_agent: config.user_agent.header_value(),
            timeout: Duration::from_secs(config.crawler.request_timeout_secs),
            connect_timeout: Duration::from_secs(10),
            min_delay: Duration::from_millis(config.crawler.min_delay_ms),
            max_delay: Duration::from_millis(config.crawler.max_delay_ms),
            max_retries: config.crawler.max_retries,
            backoff_base: Duration::from_millis(config.crawler.backoff_base_ms),
        }
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Status and body of a page fetch
///
/// A status of 0 with an empty body means no response was received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    fn unreachable() -> Self {
        Self {
            status: 0,
            body: String::new(),
        }
    }

    /// Returns true for 2xx responses
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Returns true if a status should be retried
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || status >= 500
}

/// Computes the backoff before retry `attempt` (0-based)
///
/// `base * 2^attempt` plus a uniform jitter in `[0, base)`.
pub fn backoff_delay(attempt: u32, base: Duration) -> Duration {
    let exp = base.saturating_mul(2u32.saturating_pow(attempt));
    let base_ms = base.as_millis() as u64;
    let jitter = if base_ms == 0 {
        0
    } else {
        rand::thread_rng().gen_range(0..base_ms)
    };
    exp + Duration::from_millis(jitter)
}

/// Polite HTTP fetcher
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    config: FetcherConfig,
}

impl Fetcher {
    /// Builds a fetcher and its HTTP client
    ///
    /// # Arguments
    ///
    /// * `config` - Fetcher settings
    ///
    /// # Returns
    ///
    /// * `Ok(Fetcher)` - Ready-to-use fetcher
    /// * `Err(reqwest::Error)` - Failed to build the client
    pub fn new(config: FetcherConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self { client, config })
    }

    /// The underlying client, for collaborators that build their own requests
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Sleeps for a random duration in `[min_delay, max_delay]`
    pub async fn pause(&self) {
        let delay = self.politeness_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    fn politeness_delay(&self) -> Duration {
        let min = self.config.min_delay.as_millis() as u64;
        let max = self.config.max_delay.as_millis() as u64;
        if max <= min {
            return Duration::from_millis(min);
        }
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }

    /// Fetches a page as text
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | 2xx/3xx | Returned immediately |
    /// | 4xx other than 429 | Returned immediately |
    /// | 429 / 5xx | Retried; last response returned when retries run out |
    /// | Timeout / connection error | Retried; `(0, "")` when retries run out |
    pub async fn fetch(&self, url: &str) -> FetchResponse {
        let Some(response) = self.fetch_response(url).await else {
            return FetchResponse::unreachable();
        };

        let status = response.status().as_u16();
        match response.text().await {
            Ok(body) => FetchResponse { status, body },
            Err(e) => {
                warn!("Failed to read body of {}: {}", url, e);
                FetchResponse::unreachable()
            }
        }
    }

    /// Issues a GET with the politeness delay and retry policy, returning
    /// the final response unread
    ///
    /// Returns `None` if no attempt produced a response.
    pub async fn fetch_response(&self, url: &str) -> Option<Response> {
        self.pause().await;

        let mut attempt = 0;
        loop {
            let retries_left = attempt < self.config.max_retries;

            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if !is_retryable_status(status) || !retries_left {
                        return Some(response);
                    }
                    let delay = backoff_delay(attempt, self.config.backoff_base);
                    warn!(
                        "HTTP {} from {}, retrying in {:.1}s",
                        status,
                        url,
                        delay.as_secs_f64()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    if !retries_left {
                        warn!("Giving up on {}: {}", url, e);
                        return None;
                    }
                    let delay = backoff_delay(attempt, self.config.backoff_base);
                    warn!(
                        "Request to {} failed ({}), retrying in {:.1}s",
                        url,
                        e,
                        delay.as_secs_f64()
                    );
                    tokio::time::sleep(delay).await;
                }
            }

            attempt += 1;
            debug!("Attempt {} for {}", attempt + 1, url);
        }
    }
}
