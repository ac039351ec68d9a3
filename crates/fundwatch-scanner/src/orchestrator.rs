//! Scan orchestrator for campaign runs.
//!
//! The `ScanOrchestrator` walks a campaign list in ascending id order, paces
//! requests through the [`RateLimiter`], wraps every adapter call in the
//! [`RetryPolicy`], persists each result before moving on and keeps the run
//! [`Metrics`]. Cancellation is checked between campaigns only.

use crate::adapters::SiteAdapter;
use crate::error::{Result, ScanError};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::platform::{clean_campaign_url, detect_platform};
use crate::rate_limiter::RateLimiter;
use crate::retry::RetryPolicy;
use crate::store::CampaignStore;
use chrono::{DateTime, Utc};
use fundwatch_core::{
    Campaign, FailureRecord, Platform, RateLimitConfig, RetryConfig, ScanResult, ScanStatus,
};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Attempts for one persistence call before the campaign is failed.
const PERSIST_ATTEMPTS: u32 = 3;

/// Pause between persistence attempts.
const PERSIST_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Which campaigns a run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    /// Collection (table) to scan
    pub collection: String,
    /// First position (0-based, inclusive) in the id-sorted list
    pub start: usize,
    /// Last position (exclusive); `None` runs to the end
    pub end: Option<usize>,
    /// Leave out campaigns scanned before
    pub only_unfetched: bool,
}

impl ScanRequest {
    /// Scan a whole collection.
    #[must_use]
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            start: 0,
            end: None,
            only_unfetched: false,
        }
    }
}

/// End-of-run report.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Unique id of this run
    pub run_id: String,
    /// Collection that was scanned
    pub collection: String,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
    /// Final counters
    pub metrics: MetricsSnapshot,
    /// Every failed campaign, in processing order
    pub failures: Vec<FailureRecord>,
    /// Whether shutdown stopped the run early
    pub interrupted: bool,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.metrics;
        let elapsed = (self.finished_at - self.started_at).num_seconds();
        writeln!(
            f,
            "Run {} on '{}' {} after {}s",
            self.run_id,
            self.collection,
            if self.interrupted { "interrupted" } else { "finished" },
            elapsed
        )?;
        writeln!(
            f,
            "  total {} | success {} (zero donations {}) | not found {} | paused {} | skipped {} | failed {}",
            m.total, m.success, m.zero_donations, m.not_found, m.paused, m.skipped, m.failure
        )?;
        if let (Some(avg), Some(p95)) = (m.average_response_ms, m.p95_response_ms) {
            writeln!(f, "  response time avg {avg}ms, p95 {p95}ms")?;
        }
        for failure in &self.failures {
            writeln!(
                f,
                "  failed #{} {}: {}",
                failure.campaign_id,
                failure.url.as_deref().unwrap_or("-"),
                failure.reason
            )?;
        }
        Ok(())
    }
}

/// Drives one sequential scan over a campaign list.
pub struct ScanOrchestrator<S: CampaignStore> {
    store: Arc<S>,
    adapters: HashMap<Platform, Arc<dyn SiteAdapter>>,
    retry: RetryPolicy,
    limiter: RateLimiter,
    metrics: Metrics,
    shutdown: CancellationToken,
}

impl<S: CampaignStore> ScanOrchestrator<S> {
    /// Create an orchestrator with fresh limiter and metrics state.
    #[must_use]
    pub fn new(
        store: Arc<S>,
        rate_limit: RateLimitConfig,
        retry: RetryConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            store,
            adapters: HashMap::new(),
            retry: RetryPolicy::new(retry),
            limiter: RateLimiter::new(rate_limit),
            metrics: Metrics::new(),
            shutdown,
        }
    }

    /// Register the adapter for its platform, replacing any previous one.
    #[must_use]
    pub fn with_adapter(mut self, adapter: Arc<dyn SiteAdapter>) -> Self {
        self.adapters.insert(adapter.platform(), adapter);
        self
    }

    /// Metrics of the run so far.
    #[must_use]
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Rate limiter state of the run so far.
    #[must_use]
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Scan the campaigns selected by `request`.
    ///
    /// A failed campaign never aborts the run. Only a failed campaign-list
    /// read or a run-fatal adapter error (browser unavailable) returns `Err`.
    pub async fn run(&mut self, request: &ScanRequest) -> Result<RunSummary> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now();

        let campaigns = self
            .store
            .list_campaigns(&request.collection, request.only_unfetched)
            .await?;
        let selected = select_range(campaigns, request.start, request.end);

        tracing::info!(
            "Run {} scanning {} campaign(s) from '{}'",
            run_id,
            selected.len(),
            request.collection
        );

        let mut failures = Vec::new();
        let mut interrupted = false;

        for campaign in &selected {
            if self.shutdown.is_cancelled() {
                tracing::warn!("Shutdown requested; stopping before campaign {}", campaign.id);
                interrupted = true;
                break;
            }

            let result = self.scan_campaign(campaign).await?;
            let result = self.persist(&request.collection, result).await;

            if result.status == ScanStatus::Failed {
                let failure = FailureRecord {
                    campaign_id: campaign.id,
                    url: campaign.url.clone(),
                    reason: result
                        .failure_reason
                        .clone()
                        .unwrap_or_else(|| "unknown failure".to_string()),
                    failed_at: Utc::now(),
                };
                if let Err(e) = self
                    .store
                    .record_failure(&run_id, &request.collection, &failure)
                    .await
                {
                    tracing::warn!("Could not log failure of campaign {}: {}", campaign.id, e);
                }
                failures.push(failure);
            }

            self.metrics.record(result.status);
            tracing::debug!("Campaign {} -> {}", campaign.id, result.status);
        }

        let summary = RunSummary {
            run_id,
            collection: request.collection.clone(),
            started_at,
            finished_at: Utc::now(),
            metrics: self.metrics.snapshot(),
            failures,
            interrupted,
        };
        tracing::info!(
            "Run {} done: {} success, {} failed, {} skipped",
            summary.run_id,
            summary.metrics.success,
            summary.metrics.failure,
            summary.metrics.skipped
        );
        Ok(summary)
    }

    /// Scan one campaign. Returns `Err` only for run-fatal errors.
    async fn scan_campaign(&mut self, campaign: &Campaign) -> Result<ScanResult> {
        let id = campaign.id;
        let Some(raw_url) = campaign.url.as_deref() else {
            tracing::debug!("Skipping campaign {}: no URL", id);
            return Ok(ScanResult::skipped(id, "missing URL"));
        };
        let Some(url) = clean_campaign_url(raw_url) else {
            tracing::debug!("Skipping campaign {}: unparseable URL '{}'", id, raw_url);
            return Ok(ScanResult::skipped(id, "unrecognized URL"));
        };
        let Some(platform) = detect_platform(&url) else {
            tracing::debug!("Skipping campaign {}: unknown platform for {}", id, url);
            return Ok(ScanResult::skipped(id, "unrecognized platform"));
        };
        let Some(adapter) = self.adapters.get(&platform).cloned() else {
            tracing::warn!("Skipping campaign {}: no adapter for {}", id, platform);
            return Ok(ScanResult::skipped(id, format!("no adapter for {platform}")));
        };

        self.limiter.before_request().await;

        // one sample per attempt; backoff sleeps are not response time
        let samples = Mutex::new(Vec::new());
        let timings = &samples;
        let adapter: &dyn SiteAdapter = adapter.as_ref();
        let target: &str = &url;
        let outcome = self
            .retry
            .execute(&mut self.limiter, move || async move {
                let started = Instant::now();
                let outcome = adapter.scan(target).await;
                if let Ok(mut timings) = timings.lock() {
                    timings.push(started.elapsed());
                }
                outcome
            })
            .await;
        for elapsed in samples.into_inner().unwrap_or_default() {
            self.metrics.record_response_time(elapsed);
        }

        match outcome {
            Ok(outcome) => Ok(outcome.into_scan_result(id)),
            Err(e) if e.is_fatal() => {
                tracing::error!("Campaign {} hit a run-fatal error: {}", id, e);
                Err(e)
            }
            Err(e) => {
                tracing::error!("Campaign {} ({}) failed: {}", id, url, e);
                Ok(ScanResult::failed(id, e.to_string()))
            }
        }
    }

    /// Store `result`; a persistence failure turns it into a failed result.
    async fn persist(&self, collection: &str, result: ScanResult) -> ScanResult {
        let id = result.campaign_id;
        let stored = match result.status {
            ScanStatus::Success | ScanStatus::ZeroDonations | ScanStatus::Paused => {
                with_persist_retry(|| self.store.upsert_result(collection, &result)).await
            }
            ScanStatus::NotFound => {
                with_persist_retry(|| self.store.flag_dead_link(collection, id)).await
            }
            ScanStatus::Skipped | ScanStatus::Failed => Ok(()),
        };

        match stored {
            Ok(()) => result,
            Err(e) => {
                let reason = ScanError::Persistence(e.to_string()).to_string();
                tracing::error!("Campaign {}: {}", id, reason);
                ScanResult::failed(id, reason)
            }
        }
    }
}

async fn with_persist_retry<F, Fut>(mut operation: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(()) => return Ok(()),
            Err(e) if attempt >= PERSIST_ATTEMPTS => return Err(e),
            Err(e) => {
                tracing::warn!(
                    "Persistence attempt {}/{} failed: {}",
                    attempt,
                    PERSIST_ATTEMPTS,
                    e
                );
                attempt += 1;
                tokio::time::sleep(PERSIST_RETRY_DELAY).await;
            }
        }
    }
}

/// Sort by id and keep positions `start..end`.
fn select_range(mut campaigns: Vec<Campaign>, start: usize, end: Option<usize>) -> Vec<Campaign> {
    campaigns.sort_by_key(|c| c.id);
    let end = end.unwrap_or(campaigns.len()).min(campaigns.len());
    campaigns
        .into_iter()
        .skip(start)
        .take(end.saturating_sub(start))
        .collect()
}
