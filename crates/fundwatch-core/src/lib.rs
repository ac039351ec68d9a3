//! Fundwatch Core - Foundation crate for the Fundwatch campaign scanner.
//!
//! This crate provides shared types, error handling and configuration
//! management that all other Fundwatch crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Shared newtypes and enums (`CampaignId`, `Campaign`, `ScanResult`)
//!
//! # Example
//!
//! ```rust
//! use fundwatch_core::{AppConfig, Platform};
//!
//! let config = AppConfig::default();
//! assert_eq!(config.rate_limit.base_delay_ms, 4000);
//! assert_eq!(Platform::GoFundMe.to_string(), "gofundme");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{
    ApiConfig, AppConfig, BrowserConfig, DatabaseConfig, DomSelectors, NotificationConfig,
    RateLimitConfig, RetryConfig, RetryStrategyConfig, ShutdownConfig,
};
pub use error::{ConfigError, ConfigResult, FundwatchError, Result};
pub use types::{Campaign, CampaignId, FailureRecord, Platform, ScanResult, ScanStatus};
