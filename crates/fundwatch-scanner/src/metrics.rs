//! Run counters and response-time statistics.

use fundwatch_core::ScanStatus;
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;

/// Number of response-time samples kept for the statistics.
pub const RESPONSE_TIME_WINDOW: usize = 100;

/// Counters for one scan run. Owned and mutated by the orchestrator only.
#[derive(Debug, Clone)]
pub struct Metrics {
    success: u64,
    failure: u64,
    skipped: u64,
    not_found: u64,
    paused: u64,
    zero_donations: u64,
    response_times: VecDeque<Duration>,
    window: usize,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::with_window(RESPONSE_TIME_WINDOW)
    }
}

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Metrics keeping at most `window` response-time samples.
    #[must_use]
    pub fn with_window(window: usize) -> Self {
        Self {
            success: 0,
            failure: 0,
            skipped: 0,
            not_found: 0,
            paused: 0,
            zero_donations: 0,
            response_times: VecDeque::with_capacity(window),
            window: window.max(1),
        }
    }

    /// Count one campaign outcome. Zero donations also counts as a success.
    pub fn record(&mut self, status: ScanStatus) {
        match status {
            ScanStatus::Success => self.success += 1,
            ScanStatus::ZeroDonations => {
                self.success += 1;
                self.zero_donations += 1;
            }
            ScanStatus::NotFound => self.not_found += 1,
            ScanStatus::Paused => self.paused += 1,
            ScanStatus::Skipped => self.skipped += 1,
            ScanStatus::Failed => self.failure += 1,
        }
    }

    /// Add a response-time sample, evicting the oldest beyond the window.
    pub fn record_response_time(&mut self, elapsed: Duration) {
        if self.response_times.len() == self.window {
            self.response_times.pop_front();
        }
        self.response_times.push_back(elapsed);
    }

    /// Campaigns counted so far (zero donations counted once).
    #[must_use]
    pub fn total(&self) -> u64 {
        self.success + self.failure + self.skipped + self.not_found + self.paused
    }

    /// Mean of the retained samples.
    #[must_use]
    pub fn average_response_time(&self) -> Option<Duration> {
        let count = u32::try_from(self.response_times.len()).ok()?;
        if count == 0 {
            return None;
        }
        Some(self.response_times.iter().sum::<Duration>() / count)
    }

    /// 95th percentile (nearest rank) of the retained samples.
    #[must_use]
    pub fn p95_response_time(&self) -> Option<Duration> {
        if self.response_times.is_empty() {
            return None;
        }
        let mut sorted: Vec<Duration> = self.response_times.iter().copied().collect();
        sorted.sort_unstable();
        let rank = (sorted.len() * 95).div_ceil(100);
        sorted.get(rank.saturating_sub(1)).copied()
    }

    /// Serializable copy of the current values.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            success: self.success,
            failure: self.failure,
            skipped: self.skipped,
            not_found: self.not_found,
            paused: self.paused,
            zero_donations: self.zero_donations,
            total: self.total(),
            average_response_ms: self.average_response_time().map(duration_ms),
            p95_response_ms: self.p95_response_time().map(duration_ms),
        }
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Point-in-time view of [`Metrics`] for summaries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub success: u64,
    pub failure: u64,
    pub skipped: u64,
    pub not_found: u64,
    pub paused: u64,
    pub zero_donations: u64,
    pub total: u64,
    pub average_response_ms: Option<u64>,
    pub p95_response_ms: Option<u64>,
}
