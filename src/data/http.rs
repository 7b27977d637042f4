//! Shared upstream HTTP client with retry, linear backoff and timeout escalation.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::config::HttpConfig;
use crate::error::FetchError;

/// Attempt budget for one upstream request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_timeout: Duration,
    pub timeout_step: Duration,
    pub backoff_step: Duration,
}

impl RetryPolicy {
    pub const MIN_ATTEMPTS: u32 = 3;
    pub const MAX_ATTEMPTS: u32 = 5;

    pub fn from_config(config: &HttpConfig) -> Self {
        Self {
            max_attempts: config
                .max_attempts
                .clamp(Self::MIN_ATTEMPTS, Self::MAX_ATTEMPTS),
            base_timeout: Duration::from_millis(config.base_timeout_ms),
            timeout_step: Duration::from_millis(config.timeout_step_ms),
            backoff_step: Duration::from_millis(config.backoff_step_ms),
        }
    }

    /// Timeout for the 1-based `attempt`; never shrinks between attempts.
    pub fn timeout_for(&self, attempt: u32) -> Duration {
        self.base_timeout + self.timeout_step * attempt.saturating_sub(1)
    }

    /// Pause after the 1-based `attempt` failed.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff_step * attempt
    }
}

pub struct HttpFetcher {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl HttpFetcher {
    /// Build once per run; the common headers ride on every request.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).context("Invalid user agent header")?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_str(&config.accept).context("Invalid accept header")?,
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&config.accept_language)
                .context("Invalid accept-language header")?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            policy: RetryPolicy::from_config(config),
        })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// GET `url` as JSON, retrying timeouts, connection failures and non-2xx
    /// statuses until the attempt budget runs out. Invalid JSON is not retried.
    #[instrument(skip(self, headers))]
    pub async fn get_json(&self, url: &str, headers: &HeaderMap) -> Result<Value, FetchError> {
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let timeout = self.policy.timeout_for(attempt);

            match self.attempt(url, headers, timeout).await {
                Ok(value) => {
                    debug!(attempt, "Upstream request succeeded");
                    return Ok(value);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    if attempt >= self.policy.max_attempts {
                        warn!(attempt, error = %e, "Retry budget exhausted");
                        return Err(e.with_attempts(attempt));
                    }

                    let delay = self.policy.delay_after(attempt);
                    warn!(
                        attempt,
                        max_attempts = self.policy.max_attempts,
                        timeout_ms = timeout.as_millis() as u64,
                        backoff_ms = delay.as_millis() as u64,
                        error = %e,
                        "Upstream request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn attempt(
        &self,
        url: &str,
        headers: &HeaderMap,
        timeout: Duration,
    ) -> Result<Value, FetchError> {
        let resp = self
            .client
            .get(url)
            .headers(headers.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                attempts: 1,
            });
        }

        let text = resp.text().await.map_err(|e| classify(url, e))?;
        serde_json::from_str(&text).map_err(|e| FetchError::Decode {
            url: url.to_string(),
            detail: e.to_string(),
        })
    }
}

fn classify(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
            attempts: 1,
        }
    } else if e.is_builder() {
        FetchError::Request {
            url: url.to_string(),
            detail: e.to_string(),
        }
    } else {
        FetchError::Connect {
            url: url.to_string(),
            attempts: 1,
            detail: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_policy_escalates_timeouts_and_backoff() {
        let policy = RetryPolicy {
            max_attempts: 4,
            base_timeout: Duration::from_secs(15),
            timeout_step: Duration::from_secs(10),
            backoff_step: Duration::from_secs(2),
        };
        let timeouts: Vec<u64> = (1..=4).map(|a| policy.timeout_for(a).as_secs()).collect();
        assert_eq!(timeouts, vec![15, 25, 35, 45]);
        let delays: Vec<u64> = (1..=3).map(|a| policy.delay_after(a).as_secs()).collect();
        assert_eq!(delays, vec![2, 4, 6]);
    }

    #[test]
    fn test_policy_clamps_attempt_budget() {
        let mut config = AppConfig::builtin().unwrap().http;
        config.max_attempts = 1;
        assert_eq!(RetryPolicy::from_config(&config).max_attempts, 3);
        config.max_attempts = 12;
        assert_eq!(RetryPolicy::from_config(&config).max_attempts, 5);
    }

    fn fast_fetcher() -> HttpFetcher {
        let mut config = AppConfig::builtin().unwrap().http;
        config.base_timeout_ms = 500;
        config.timeout_step_ms = 100;
        config.backoff_step_ms = 10;
        HttpFetcher::new(&config).unwrap()
    }

    async fn request_count(server: &MockServer) -> usize {
        server.received_requests().await.unwrap().len()
    }

    #[tokio::test]
    async fn test_transient_503_recovers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/scoreboard"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/scoreboard"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": 1})))
            .mount(&server)
            .await;

        let url = format!("{}/scoreboard", server.uri());
        let body = fast_fetcher().get_json(&url, &HeaderMap::new()).await.unwrap();
        assert_eq!(body, json!({"ok": 1}));
        assert_eq!(request_count(&server).await, 3);
    }

    #[tokio::test]
    async fn test_persistent_500_exhausts_budget() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let url = format!("{}/scoreboard", server.uri());
        let err = fast_fetcher().get_json(&url, &HeaderMap::new()).await.unwrap_err();
        assert!(
            matches!(err, FetchError::Status { status: 500, attempts: 3, .. }),
            "{err:?}"
        );
        assert_eq!(request_count(&server).await, 3);
    }

    #[tokio::test]
    async fn test_invalid_json_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let url = format!("{}/scoreboard", server.uri());
        let err = fast_fetcher().get_json(&url, &HeaderMap::new()).await.unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }), "{err:?}");
        assert_eq!(request_count(&server).await, 1);
    }

    #[test]
    fn test_invalid_url_is_not_retried() {
        let config = AppConfig::builtin().unwrap();
        let fetcher = HttpFetcher::new(&config.http).unwrap();
        let err = tokio_test::block_on(fetcher.get_json("not a url", &HeaderMap::new()))
            .unwrap_err();
        assert!(matches!(err, FetchError::Request { .. }), "{err:?}");
    }
}
