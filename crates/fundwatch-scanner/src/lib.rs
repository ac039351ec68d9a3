//! Fundwatch Scanner - Campaign scan engine.
//!
//! This crate walks a list of fundraising campaigns, reads the current totals
//! of each one through a platform adapter and writes the results back to the
//! record store. Requests share one adaptive pacing delay, transient failures
//! are retried per error category, and one bad campaign never stops a run.
//!
//! # Features
//!
//! - Amount parsing for display strings in many currency formats
//! - Adaptive rate limiting with jitter
//! - Category-based retry with exponential backoff
//! - Headless-browser adapter for the DOM platform
//! - GraphQL adapter for the API platform
//! - Run metrics with response-time percentiles
//!
//! # Example
//!
//! ```rust,ignore
//! use fundwatch_scanner::{ApiAdapter, ScanOrchestrator, ScanRequest};
//! use std::sync::Arc;
//!
//! let mut orchestrator = ScanOrchestrator::new(
//!     Arc::new(database),
//!     config.rate_limit.clone(),
//!     config.retry.clone(),
//!     shutdown_token,
//! )
//! .with_adapter(Arc::new(ApiAdapter::new(&config.api)?));
//!
//! let summary = orchestrator.run(&ScanRequest::new("campaigns")).await?;
//! println!("{summary}");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

#[allow(missing_docs)]
pub mod adapters;
#[allow(missing_docs)]
pub mod amount;
#[allow(missing_docs)]
pub mod error;
#[allow(missing_docs)]
pub mod metrics;
pub mod orchestrator;
pub mod platform;
pub mod rate_limiter;
pub mod retry;
pub mod store;

// Re-export commonly used types
pub use adapters::{ApiAdapter, BrowserAdapter, CampaignData, ScanOutcome, SiteAdapter};
pub use amount::{parse_count, parse_raised, parse_target, ParsedAmount};
pub use error::{Result, ScanError};
pub use metrics::{Metrics, MetricsSnapshot};
pub use orchestrator::{RunSummary, ScanOrchestrator, ScanRequest};
pub use platform::{clean_campaign_url, detect_platform};
pub use rate_limiter::{RateLimiter, RateLimiterState};
pub use retry::{classify, ErrorCategory, RetryPolicy};
pub use store::CampaignStore;
