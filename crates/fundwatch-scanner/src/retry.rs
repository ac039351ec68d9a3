//! Error classification and category-aware retries.

use crate::error::{Result, ScanError};
use crate::rate_limiter::RateLimiter;
use fundwatch_browser::BrowserError;
use fundwatch_core::{RetryConfig, RetryStrategyConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Retry category of a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// HTTP 429
    RateLimited,
    /// Navigation or operation deadline exceeded
    Timeout,
    /// HTTP 5xx
    ServerError,
    /// HTTP 4xx other than 429; never retried
    ClientError,
    /// Connection-level failure
    NetworkError,
    /// Anything else
    Unknown,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RateLimited => "rate limited",
            Self::Timeout => "timeout",
            Self::ServerError => "server error",
            Self::ClientError => "client error",
            Self::NetworkError => "network error",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Map an error to its retry category.
#[must_use]
pub fn classify(error: &ScanError) -> ErrorCategory {
    match error {
        ScanError::Http { status, .. } => classify_status(*status),
        ScanError::Timeout(_) | ScanError::ElementsNotFound(_) => ErrorCategory::Timeout,
        ScanError::Network(_) => ErrorCategory::NetworkError,
        ScanError::UnresolvableSlug(_) => ErrorCategory::ClientError,
        ScanError::Browser(browser) => match browser {
            BrowserError::Timeout(_) | BrowserError::SelectorNotFound(_) => ErrorCategory::Timeout,
            BrowserError::NavigationError(_) => ErrorCategory::NetworkError,
            BrowserError::Launch(_)
            | BrowserError::ChromiumError(_)
            | BrowserError::PoolExhausted(_)
            | BrowserError::ShutDown => ErrorCategory::Unknown,
        },
        ScanError::RetriesExhausted { category, .. } => *category,
        ScanError::InvalidResponse(_) | ScanError::Persistence(_) | ScanError::DataSource(_) => {
            ErrorCategory::Unknown
        }
    }
}

fn classify_status(status: u16) -> ErrorCategory {
    match status {
        429 => ErrorCategory::RateLimited,
        400..=499 => ErrorCategory::ClientError,
        500..=599 => ErrorCategory::ServerError,
        _ => ErrorCategory::Unknown,
    }
}

/// Bookkeeping for one failed attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryContext {
    /// 1-based attempt number that just failed
    pub attempt: u32,
    /// Category of the failure
    pub category: ErrorCategory,
    /// Strategy selected for that category
    pub strategy: RetryStrategyConfig,
}

impl RetryContext {
    /// Whether another attempt is allowed.
    #[must_use]
    pub fn can_retry(&self) -> bool {
        self.category != ErrorCategory::ClientError && self.attempt < self.strategy.max_attempts
    }

    /// Delay before the next attempt: `base * multiplier^(attempt-1)`, capped at `cap`.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss,
        clippy::cast_possible_wrap
    )]
    pub fn delay(&self, cap: Duration) -> Duration {
        let exponent = self.attempt.saturating_sub(1) as i32;
        let millis =
            self.strategy.base_delay_ms as f64 * self.strategy.backoff_multiplier.powi(exponent);
        let cap_ms = cap.as_millis() as f64;
        Duration::from_millis(millis.min(cap_ms) as u64)
    }
}

/// Category-aware retry loop around one campaign operation.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Strategy for a category. Client errors get a single attempt.
    #[must_use]
    pub fn strategy_for(&self, category: ErrorCategory) -> RetryStrategyConfig {
        match category {
            ErrorCategory::RateLimited => self.config.rate_limited,
            ErrorCategory::Timeout => self.config.timeout,
            ErrorCategory::ServerError => self.config.server_error,
            ErrorCategory::NetworkError => self.config.network_error,
            ErrorCategory::Unknown => self.config.unknown,
            ErrorCategory::ClientError => RetryStrategyConfig {
                max_attempts: 1,
                ..self.config.unknown
            },
        }
    }

    /// Run `operation` until it succeeds or its error category runs out of attempts.
    ///
    /// Every failed attempt reports a failure to `limiter`; an eventual success
    /// reports exactly one success. Client errors and run-fatal errors are
    /// returned as-is after one attempt. Exhaustion returns
    /// [`ScanError::RetriesExhausted`] wrapping the last error.
    pub async fn execute<T, F, Fut>(&self, limiter: &mut RateLimiter, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let error = match operation().await {
                Ok(value) => {
                    limiter.on_outcome(true);
                    return Ok(value);
                }
                Err(error) => error,
            };
            limiter.on_outcome(false);

            if error.is_fatal() {
                return Err(error);
            }

            let category = classify(&error);
            let context = RetryContext {
                attempt,
                category,
                strategy: self.strategy_for(category),
            };

            if category == ErrorCategory::ClientError {
                tracing::debug!("Not retrying client error: {}", error);
                return Err(error);
            }

            if !context.can_retry() {
                return Err(ScanError::RetriesExhausted {
                    attempts: attempt,
                    category,
                    source: Box::new(error),
                });
            }

            let delay = context.delay(limiter.max_delay());
            tracing::warn!(
                "Attempt {}/{} failed ({}): {}; retrying in {:?}",
                attempt,
                context.strategy.max_attempts,
                category,
                error,
                delay
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fundwatch_core::RateLimitConfig;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    fn limiter() -> RateLimiter {
        RateLimiter::new(RateLimitConfig::default())
    }

    #[test]
    fn test_classify_http_statuses() {
        let http = |status| ScanError::Http {
            status,
            url: "https://chuffed.org/api/graphql".to_string(),
        };
        assert_eq!(classify(&http(429)), ErrorCategory::RateLimited);
        assert_eq!(classify(&http(404)), ErrorCategory::ClientError);
        assert_eq!(classify(&http(403)), ErrorCategory::ClientError);
        assert_eq!(classify(&http(502)), ErrorCategory::ServerError);
        assert_eq!(classify(&http(302)), ErrorCategory::Unknown);
    }

    #[test]
    fn test_classify_other_errors() {
        assert_eq!(
            classify(&ScanError::ElementsNotFound("u".to_string())),
            ErrorCategory::Timeout
        );
        assert_eq!(
            classify(&ScanError::Network("reset".to_string())),
            ErrorCategory::NetworkError
        );
        assert_eq!(
            classify(&ScanError::UnresolvableSlug("help-bob".to_string())),
            ErrorCategory::ClientError
        );
        assert_eq!(
            classify(&ScanError::Browser(BrowserError::Timeout("nav".to_string()))),
            ErrorCategory::Timeout
        );
        assert_eq!(
            classify(&ScanError::InvalidResponse("bad json".to_string())),
            ErrorCategory::Unknown
        );
    }

    #[test]
    fn test_delay_is_exponential_and_capped() {
        let context = |attempt| RetryContext {
            attempt,
            category: ErrorCategory::Timeout,
            strategy: RetryStrategyConfig {
                max_attempts: 10,
                base_delay_ms: 2000,
                backoff_multiplier: 2.0,
            },
        };
        let cap = Duration::from_secs(60);
        assert_eq!(context(1).delay(cap), Duration::from_millis(2000));
        assert_eq!(context(2).delay(cap), Duration::from_millis(4000));
        assert_eq!(context(3).delay(cap), Duration::from_millis(8000));
        assert_eq!(context(9).delay(cap), cap);
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_error_is_not_retried() {
        let policy = RetryPolicy::default();
        let mut limiter = limiter();
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<()> = policy
            .execute(&mut limiter, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(ScanError::Http {
                    status: 404,
                    url: "https://chuffed.org/api/graphql".to_string(),
                })
            })
            .await;

        assert!(matches!(result, Err(ScanError::Http { status: 404, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(limiter.state().consecutive_failures, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_retried_to_max_attempts_with_growing_delays() {
        let policy = RetryPolicy::default();
        let mut limiter = limiter();
        let started = Instant::now();
        let call_times = Mutex::new(Vec::new());
        let recorder = &call_times;

        let result: Result<()> = policy
            .execute(&mut limiter, move || {
                recorder.lock().unwrap().push(started.elapsed());
                async { Err(ScanError::Timeout("navigation".to_string())) }
            })
            .await;

        let times = call_times.into_inner().unwrap();
        assert_eq!(times.len(), 3);
        let first_gap = times[1] - times[0];
        let second_gap = times[2] - times[1];
        assert!(second_gap > first_gap);
        assert_eq!(first_gap, Duration::from_millis(2000));
        assert_eq!(second_gap, Duration::from_millis(4000));

        match result {
            Err(ScanError::RetriesExhausted {
                attempts, category, ..
            }) => {
                assert_eq!(attempts, 3);
                assert_eq!(category, ErrorCategory::Timeout);
            }
            other => panic!("expected exhausted retries, got {other:?}"),
        }
        assert_eq!(limiter.state().consecutive_failures, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_after_failures_reports_one_success() {
        let policy = RetryPolicy::default();
        let mut limiter = limiter();
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let value = policy
            .execute(&mut limiter, move || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(ScanError::Network("connection reset".to_string()))
                } else {
                    Ok(42)
                }
            })
            .await
            .expect("third attempt succeeds");

        assert_eq!(value, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let state = limiter.state();
        assert_eq!(state.consecutive_successes, 1);
        assert_eq!(state.consecutive_failures, 0);
        // two failures doubled the delay twice
        assert_eq!(state.current_delay_ms, 16_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_returned_immediately() {
        let policy = RetryPolicy::default();
        let mut limiter = limiter();
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<()> = policy
            .execute(&mut limiter, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(ScanError::Browser(BrowserError::Launch(
                    "gave up after 3 attempts".to_string(),
                )))
            })
            .await;

        assert!(result.expect_err("launch failure").is_fatal());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
