//! Adaptive delay between campaign requests.
//!
//! One shared budget covers both platforms: sustained success slowly
//! shortens the delay, any failure grows it.

use fundwatch_core::RateLimitConfig;
use rand::Rng;
use std::time::Duration;

/// Mutable limiter state for one scan run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterState {
    /// Delay applied before the next request
    pub current_delay_ms: u64,
    /// Successes since the last failure
    pub consecutive_successes: u32,
    /// Failures since the last success
    pub consecutive_failures: u32,
}

/// Adaptive request pacing.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    state: RateLimiterState,
}

impl RateLimiter {
    /// Create a limiter starting at the configured base delay.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        let current_delay_ms = config
            .base_delay_ms
            .clamp(config.min_delay_ms, config.max_delay_ms);
        Self {
            config,
            state: RateLimiterState {
                current_delay_ms,
                consecutive_successes: 0,
                consecutive_failures: 0,
            },
        }
    }

    /// Current state snapshot.
    #[must_use]
    pub fn state(&self) -> RateLimiterState {
        self.state
    }

    /// Delay that the next [`before_request`](Self::before_request) will apply, without jitter.
    #[must_use]
    pub fn current_delay(&self) -> Duration {
        Duration::from_millis(self.state.current_delay_ms)
    }

    /// Upper bound for any delay, also used to cap retry backoff.
    #[must_use]
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.config.max_delay_ms)
    }

    /// Wait the current delay plus random jitter. Returns the time waited.
    pub async fn before_request(&self) -> Duration {
        let delay = self.current_delay() + self.jitter();
        tracing::debug!("Rate limiter waiting {:?}", delay);
        tokio::time::sleep(delay).await;
        delay
    }

    fn jitter(&self) -> Duration {
        if self.config.jitter_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=self.config.jitter_ms))
    }

    /// Record the outcome of one request attempt.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn on_outcome(&mut self, success: bool) {
        let state = &mut self.state;
        if success {
            state.consecutive_successes = state.consecutive_successes.saturating_add(1);
            state.consecutive_failures = 0;
            if state.consecutive_successes > self.config.success_threshold {
                let reduced =
                    (state.current_delay_ms as f64 * self.config.reduction_factor) as u64;
                state.current_delay_ms = reduced.max(self.config.min_delay_ms);
            }
        } else {
            state.consecutive_successes = 0;
            state.consecutive_failures = state.consecutive_failures.saturating_add(1);
            let grown = (state.current_delay_ms as f64 * self.config.growth_factor) as u64;
            state.current_delay_ms = grown.min(self.config.max_delay_ms);
            tracing::debug!(
                "Rate limiter backing off to {}ms after {} failure(s)",
                state.current_delay_ms,
                state.consecutive_failures
            );
        }
    }
}
