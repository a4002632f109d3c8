// src/http/client.rs

//! Retrying HTTP client.
//!
//! Every call resolves to a [`FetchOutcome`]; nothing a server or the network
//! does can make `execute` return an error or panic.

use std::sync::Arc;
use std::time::Duration;

use super::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
use crate::error::Result;
use crate::models::HttpConfig;

/// Statuses that retrying cannot fix.
pub const TERMINAL_STATUSES: [u16; 4] = [401, 403, 404, 451];

const TOO_MANY_REQUESTS: u16 = 429;

const MAX_BACKOFF_SECS: f64 = 3600.0;

/// Attempt budget and backoff schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts for transport errors, 5xx and other non-2xx statuses
    pub max_retries: u32,
    pub backoff_base: f64,
    /// Ceiling for a server-supplied Retry-After
    pub max_retry_after: Duration,
    /// 429 responses draw from this budget, not `max_retries`
    pub max_rate_limit_retries: u32,
}

impl RetryPolicy {
    pub fn from_config(config: &HttpConfig) -> Self {
        Self {
            max_retries: config.max_retries.max(1),
            backoff_base: config.backoff_base,
            max_retry_after: Duration::from_secs(config.max_retry_after_secs),
            max_rate_limit_retries: config.max_rate_limit_retries,
        }
    }

    /// Wait after the failed attempt `attempt` (0-based): `backoff_base^attempt` seconds.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.backoff_base.powi(exponent);
        if secs.is_finite() && secs >= 0.0 {
            Duration::from_secs_f64(secs.min(MAX_BACKOFF_SECS))
        } else {
            Duration::from_secs_f64(MAX_BACKOFF_SECS)
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&HttpConfig::default())
    }
}

/// Result of a resilient request.
#[derive(Debug)]
pub enum FetchOutcome {
    /// 2xx response
    Success(HttpResponse),
    /// Terminal status, attempted once
    Rejected { status: u16 },
    /// Retry budget spent
    Exhausted { attempts: u32, last_error: String },
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn into_response(self) -> Option<HttpResponse> {
        match self {
            Self::Success(response) => Some(response),
            _ => None,
        }
    }

    /// Human-readable failure, `None` on success.
    pub fn failure(&self) -> Option<String> {
        match self {
            Self::Success(_) => None,
            Self::Rejected { status } => Some(format!("rejected with HTTP {status}")),
            Self::Exhausted {
                attempts,
                last_error,
            } => Some(format!("gave up after {attempts} attempts: {last_error}")),
        }
    }
}

/// HTTP client that retries transient failures with exponential backoff.
#[derive(Clone)]
pub struct ResilientClient {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl ResilientClient {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Client over `reqwest` using the `[http]` settings.
    pub fn from_config(config: &HttpConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config)?;
        Ok(Self::new(Arc::new(transport), RetryPolicy::from_config(config)))
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Send `request` until it succeeds, is rejected, or the budget runs out.
    pub async fn execute(&self, request: &HttpRequest) -> FetchOutcome {
        let mut attempts = 0u32;
        let mut rate_limited = 0u32;
        let mut last_error = String::new();

        while attempts < self.policy.max_retries {
            let failure = match self.transport.send(request).await {
                Ok(response) if response.is_success() => {
                    return FetchOutcome::Success(response);
                }
                Ok(response) if TERMINAL_STATUSES.contains(&response.status) => {
                    log::warn!(
                        "Request to {} rejected with HTTP {}, not retrying",
                        request.url,
                        response.status
                    );
                    return FetchOutcome::Rejected {
                        status: response.status,
                    };
                }
                Ok(response)
                    if response.status == TOO_MANY_REQUESTS
                        && rate_limited < self.policy.max_rate_limit_retries =>
                {
                    rate_limited += 1;
                    let wait = response
                        .retry_after()
                        .map(|d| d.min(self.policy.max_retry_after))
                        .unwrap_or_else(|| self.policy.backoff(attempts));
                    log::warn!(
                        "Rate limited by {} ({}/{}), waiting {:.1}s",
                        request.url,
                        rate_limited,
                        self.policy.max_rate_limit_retries,
                        wait.as_secs_f64()
                    );
                    tokio::time::sleep(wait).await;
                    continue;
                }
                Ok(response) => format!("HTTP {}", response.status),
                Err(e) => e.to_string(),
            };

            attempts += 1;
            log::warn!(
                "Request to {} failed (attempt {}/{}): {}",
                request.url,
                attempts,
                self.policy.max_retries,
                failure
            );
            last_error = failure;

            if attempts < self.policy.max_retries {
                tokio::time::sleep(self.policy.backoff(attempts - 1)).await;
            }
        }

        log::error!(
            "Giving up on {} after {} attempts: {}",
            request.url,
            attempts,
            last_error
        );
        FetchOutcome::Exhausted {
            attempts,
            last_error,
        }
    }

    pub async fn get(&self, url: &str) -> FetchOutcome {
        self.execute(&HttpRequest::get(url)).await
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::Instant;

    use super::*;
    use crate::http::testing::ScriptedTransport;

    #[tokio::test(start_paused = true)]
    async fn test_success_is_not_retried() {
        let (transport, client) = ScriptedTransport::new()
            .push(HttpResponse::new(200, "ok"))
            .into_client();

        let outcome = client.get("https://api.example.com").await;

        assert_eq!(outcome.into_response().unwrap().body, "ok");
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_forbidden_is_terminal() {
        let (transport, client) = ScriptedTransport::new()
            .push(HttpResponse::new(403, "blocked"))
            .push(HttpResponse::new(200, "never reached"))
            .into_client();

        let outcome = client.get("https://api.example.com").await;

        assert!(matches!(outcome, FetchOutcome::Rejected { status: 403 }));
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_terminal_status() {
        for status in TERMINAL_STATUSES {
            let (transport, client) = ScriptedTransport::new()
                .push(HttpResponse::new(status, ""))
                .into_client();
            let outcome = client.get("https://api.example.com").await;
            assert!(outcome.into_response().is_none());
            assert_eq!(transport.request_count(), 1, "status {status}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_errors_exhaust_with_backoff() {
        let (transport, client) = ScriptedTransport::with_fallback(HttpResponse::new(500, ""))
            .into_client();
        let start = Instant::now();

        let outcome = client.get("https://api.example.com").await;

        match outcome {
            FetchOutcome::Exhausted {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 3);
                assert_eq!(last_error, "HTTP 500");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(transport.request_count(), 3);
        // 1s after the first failure, 2s after the second, none after the last
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(3));
        assert!(elapsed < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_errors() {
        let (transport, client) = ScriptedTransport::new()
            .push_error("connection reset")
            .push(HttpResponse::new(503, ""))
            .push(HttpResponse::new(200, "[]"))
            .into_client();

        let outcome = client.get("https://api.example.com").await;

        assert!(outcome.is_success());
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_non_success_is_retried() {
        let (transport, client) = ScriptedTransport::new()
            .push(HttpResponse::new(400, ""))
            .push(HttpResponse::new(200, "ok"))
            .into_client();

        assert!(client.get("https://api.example.com").await.is_success());
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_honours_retry_after() {
        let (transport, client) = ScriptedTransport::new()
            .push(HttpResponse::new(429, "").with_header("Retry-After", "7"))
            .push(HttpResponse::new(200, "ok"))
            .into_client();
        let start = Instant::now();

        assert!(client.get("https://api.example.com").await.is_success());
        assert_eq!(transport.request_count(), 2);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(7));
        assert!(elapsed < Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_wait_is_clamped() {
        let (_, client) = ScriptedTransport::new()
            .push(HttpResponse::new(429, "").with_header("Retry-After", "86400"))
            .push(HttpResponse::new(200, "ok"))
            .into_client();
        let start = Instant::now();

        assert!(client.get("https://api.example.com").await.is_success());
        assert!(start.elapsed() <= Duration::from_secs(61));
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_range_retry_after_is_clamped() {
        let (transport, client) = ScriptedTransport::new()
            .push(HttpResponse::new(429, "").with_header("Retry-After", "1e20"))
            .push(HttpResponse::new(200, "ok"))
            .into_client();
        let start = Instant::now();

        assert!(client.get("https://api.example.com").await.is_success());
        assert_eq!(transport.request_count(), 2);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(60));
        assert!(elapsed < Duration::from_secs(61));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_budget_is_bounded() {
        let (transport, client) =
            ScriptedTransport::with_fallback(HttpResponse::new(429, "").with_header("Retry-After", "1"))
                .into_client();

        let outcome = client.get("https://api.example.com").await;

        assert!(matches!(outcome, FetchOutcome::Exhausted { attempts: 3, .. }));
        // 5 rate-limit waits, then 3 counted attempts
        assert_eq!(transport.request_count(), 8);
    }

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_secs(1));
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
    }

    #[test]
    fn test_outcome_failure_text() {
        assert_eq!(
            FetchOutcome::Rejected { status: 451 }.failure(),
            Some("rejected with HTTP 451".to_string())
        );
        assert_eq!(
            FetchOutcome::Success(HttpResponse::new(200, "")).failure(),
            None
        );
    }
}
