//! HTTP fetch collaborator with rate limiting and blocked-page detection.
//!
//! Provides the production [`Fetcher`] implementation: a reqwest client
//! that respects server resources through a request-rate quota, maps
//! transport failures onto the retryable error taxonomy, and flags
//! responses that look like a bot wall so the coordinator can treat
//! them as retryable failures.

use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use governor::{
    clock::DefaultClock,
    state::{direct::NotKeyed, InMemoryState},
    Quota, RateLimiter,
};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Client;
use tracing::debug;

use crate::domain::errors::FetchError;
use crate::domain::services::{FetchHints, FetchedPage, Fetcher, RenderMode};

/// HTTP client configuration for crawling.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HttpFetcherConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_requests_per_second: u32,
    pub follow_redirects: bool,
    /// Body markers that identify a blocked / bot-wall page.
    pub blocked_markers: Vec<String>,
}

impl Default for HttpFetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: "catalog-crawler/0.3 (daily price monitoring)".to_string(),
            timeout_seconds: 30,
            max_requests_per_second: 7,
            follow_redirects: true,
            blocked_markers: vec!["g-recaptcha".to_string(), "Access Denied".to_string()],
        }
    }
}

/// Rate-limited HTTP client implementing the fetch collaborator seam.
pub struct HttpFetcher {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    config: HttpFetcherConfig,
}

impl HttpFetcher {
    pub fn new(config: HttpFetcherConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).context("Invalid user agent")?,
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .cookie_store(true)
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::limited(10)
            } else {
                reqwest::redirect::Policy::none()
            })
            .build()
            .context("Failed to create HTTP client")?;

        let quota = Quota::per_second(
            NonZeroU32::new(config.max_requests_per_second)
                .context("Rate limit must be greater than 0")?,
        );
        let rate_limiter = RateLimiter::direct(quota);

        Ok(Self {
            client,
            rate_limiter,
            config,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, hints: &FetchHints) -> Result<FetchedPage, FetchError> {
        if hints.render_mode == RenderMode::Scripted {
            // Scripted rendering belongs to a browser-pool collaborator;
            // without one the static body is the best we can do.
            debug!("scripted rendering requested for {url}, falling back to static fetch");
        }

        self.rate_limiter.until_ready().await;

        let response = self.client.get(url).send().await.map_err(|err| {
            if err.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                    timeout_secs: self.config.timeout_seconds,
                }
            } else {
                FetchError::network(url, err)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::BadStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|err| FetchError::network(url, err))?;

        for marker in &self.config.blocked_markers {
            if body.contains(marker.as_str()) {
                return Err(FetchError::blocked(url, marker));
            }
        }

        Ok(FetchedPage {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_rate_limit_rejected() {
        let config = HttpFetcherConfig {
            max_requests_per_second: 0,
            ..HttpFetcherConfig::default()
        };
        assert!(HttpFetcher::new(config).is_err());
    }

    #[test]
    fn test_default_config_builds() {
        assert!(HttpFetcher::new(HttpFetcherConfig::default()).is_ok());
    }
}
