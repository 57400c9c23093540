//! Retrying GET client for the Segment API

use super::rate_limit::RateLimiter;
use crate::auth::Authenticator;
use crate::error::{Error, Result};
use crate::types::{BackoffType, QueryParams};
use reqwest::header::{HeaderMap, ACCEPT, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

/// Transport settings, normally derived from `TapConfig::http_config`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpClientConfig {
    /// API host every stream path is joined onto
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    /// Retries after the first attempt
    pub max_retries: u32,
    pub backoff: BackoffType,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// `None` disables client-side throttling
    pub requests_per_second: Option<u32>,
}

impl HttpClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            user_agent: format!("{}/{}", crate::NAME, crate::VERSION),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            backoff: BackoffType::Exponential,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(30),
            requests_per_second: None,
        }
    }

    /// Pause before retry number `attempt + 1`
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let steps = match self.backoff {
            BackoffType::Constant => 1,
            BackoffType::Linear => attempt.saturating_add(1),
            BackoffType::Exponential => 2u32.saturating_pow(attempt),
        };
        self.initial_backoff
            .saturating_mul(steps)
            .min(self.max_backoff)
    }
}

/// A successful answer with its body already read
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

/// Authenticated, throttled client for one tap run
#[derive(Debug)]
pub struct HttpClient {
    inner: Client,
    config: HttpClientConfig,
    auth: Authenticator,
    throttle: Option<RateLimiter>,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig, auth: Authenticator) -> Result<Self> {
        let inner = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;
        let throttle = config.requests_per_second.map(RateLimiter::per_second);

        Ok(Self {
            inner,
            config,
            auth,
            throttle,
        })
    }

    /// `base_url` joined with a stream path
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// GET `path` with `query`, retrying while the failure is transient
    pub async fn get(&self, path: &str, query: &QueryParams) -> Result<ApiResponse> {
        let url = self.endpoint(path);
        let mut attempt = 0;

        loop {
            let err = match self.send(&url, query).await {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };
            if attempt >= self.config.max_retries || !err.is_retryable() {
                return Err(err);
            }

            let delay = match &err {
                Error::RateLimited {
                    retry_after: Some(secs),
                } => Duration::from_secs(*secs),
                _ => self.config.backoff_delay(attempt),
            };
            attempt += 1;
            warn!(
                %url,
                attempt,
                max_retries = self.config.max_retries,
                ?delay,
                error = %err,
                "retrying Segment request"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn send(&self, url: &str, query: &QueryParams) -> Result<ApiResponse> {
        if let Some(throttle) = &self.throttle {
            throttle.wait().await;
        }

        let request = self
            .inner
            .get(url)
            .header(ACCEPT, "application/json")
            .query(query);
        let response = self
            .auth
            .apply(request)?
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited {
                retry_after: retry_after(&response),
            });
        }

        let headers = response.headers().clone();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        if !status.is_success() {
            return Err(Error::http_status(status.as_u16(), body));
        }

        debug!(%url, status = status.as_u16(), bytes = body.len(), "Segment responded");
        Ok(ApiResponse {
            status: status.as_u16(),
            headers,
            body,
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout {
                timeout_ms: self.config.timeout.as_millis() as u64,
            }
        } else {
            Error::Transport(e)
        }
    }
}

/// Seconds from a numeric `Retry-After` header
fn retry_after(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
