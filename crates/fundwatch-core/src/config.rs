//! Configuration management for Fundwatch.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration.
///
/// This is loaded from `~/.config/fundwatch/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Record store settings
    pub database: DatabaseConfig,
    /// Shared request pacing
    pub rate_limit: RateLimitConfig,
    /// Per-category retry strategies
    pub retry: RetryConfig,
    /// Headless browser settings
    pub browser: BrowserConfig,
    /// CSS selectors and banner phrases for the DOM platform
    pub selectors: DomSelectors,
    /// GraphQL platform settings
    pub api: ApiConfig,
    /// Webhook notification settings
    pub notifications: NotificationConfig,
    /// Graceful shutdown settings
    pub shutdown: ShutdownConfig,
}

impl AppConfig {
    /// Load configuration from the default location, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit path. The file must exist.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }
        tracing::debug!("Loading config from {}", path.display());
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `FUNDWATCH_DATABASE_PATH`: Override the SQLite database path
    /// - `FUNDWATCH_HEADLESS`: Override browser headless mode (true/false)
    /// - `FUNDWATCH_WEBHOOK_URL`: Override the notification webhook
    /// - `FUNDWATCH_MAX_PAGES_PER_BROWSER`: Override the browser recycle ceiling
    pub fn load_with_env(explicit: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match explicit {
            Some(path) => Self::load_from(path)?,
            None => Self::load()?,
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup function.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("FUNDWATCH_DATABASE_PATH") {
            tracing::debug!("Override database.path from env: {}", path);
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(val) = lookup("FUNDWATCH_HEADLESS") {
            if let Ok(headless) = val.parse() {
                self.browser.headless = headless;
                tracing::debug!("Override browser.headless from env: {}", headless);
            }
        }

        if let Some(url) = lookup("FUNDWATCH_WEBHOOK_URL") {
            tracing::debug!("Override notifications.webhook_url from env");
            self.notifications.webhook_url = Some(url);
        }

        if let Some(val) = lookup("FUNDWATCH_MAX_PAGES_PER_BROWSER") {
            if let Ok(pages) = val.parse() {
                self.browser.max_pages_per_browser = pages;
                tracing::debug!("Override browser.max_pages_per_browser from env: {}", pages);
            }
        }
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> ConfigResult<()> {
        let rl = &self.rate_limit;
        if rl.min_delay_ms > rl.max_delay_ms {
            return Err(ConfigError::InvalidValue {
                field: "rate_limit.min_delay_ms".to_string(),
                reason: format!(
                    "{} is greater than max_delay_ms {}",
                    rl.min_delay_ms, rl.max_delay_ms
                ),
            });
        }
        if !(rl.reduction_factor > 0.0 && rl.reduction_factor < 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "rate_limit.reduction_factor".to_string(),
                reason: "must be between 0 and 1 (exclusive)".to_string(),
            });
        }
        if rl.growth_factor < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "rate_limit.growth_factor".to_string(),
                reason: "must be at least 1.0".to_string(),
            });
        }
        if self.browser.pool_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "browser.pool_size".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.browser.launch_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "browser.launch_attempts".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/fundwatch/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/fundwatch`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().to_path_buf())
    }

    fn project_dirs() -> ConfigResult<ProjectDirs> {
        ProjectDirs::from("org", "fundwatch", "fundwatch").ok_or(ConfigError::NoConfigDir)
    }
}

/// Record store settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file path; defaults to `fundwatch.db` in the data directory
    pub path: Option<PathBuf>,
}

impl DatabaseConfig {
    /// The configured path, or the default one under the data directory.
    pub fn resolved_path(&self) -> ConfigResult<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => Ok(AppConfig::data_dir()?.join("fundwatch.db")),
        }
    }
}

/// Shared request pacing.
///
/// One delay gates every outbound request on both platforms.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Delay used for the first request
    pub base_delay_ms: u64,
    /// Floor for the adaptive delay
    pub min_delay_ms: u64,
    /// Ceiling for the adaptive delay (also caps retry delays)
    pub max_delay_ms: u64,
    /// Upper bound of the random jitter added to every wait
    pub jitter_ms: u64,
    /// Consecutive successes that must be exceeded before the delay shrinks
    pub success_threshold: u32,
    /// Multiplier applied on sustained success
    pub reduction_factor: f64,
    /// Multiplier applied on failure
    pub growth_factor: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 4000,
            min_delay_ms: 1000,
            max_delay_ms: 60_000,
            jitter_ms: 1000,
            success_threshold: 5,
            reduction_factor: 0.9,
            growth_factor: 2.0,
        }
    }
}

/// Retry strategy for one error category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryStrategyConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub base_delay_ms: u64,
    /// Growth of the delay per further attempt
    pub backoff_multiplier: f64,
}

impl RetryStrategyConfig {
    const fn new(max_attempts: u32, base_delay_ms: u64, backoff_multiplier: f64) -> Self {
        Self {
            max_attempts,
            base_delay_ms,
            backoff_multiplier,
        }
    }
}

/// Per-category retry strategies. Client errors are never retried.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// HTTP 429
    pub rate_limited: RetryStrategyConfig,
    /// Navigation or selector deadline exceeded
    pub timeout: RetryStrategyConfig,
    /// HTTP 5xx
    pub server_error: RetryStrategyConfig,
    /// Connection-level failures
    pub network_error: RetryStrategyConfig,
    /// Anything unclassified
    pub unknown: RetryStrategyConfig,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            rate_limited: RetryStrategyConfig::new(4, 10_000, 2.0),
            timeout: RetryStrategyConfig::new(3, 2000, 2.0),
            server_error: RetryStrategyConfig::new(3, 3000, 2.0),
            network_error: RetryStrategyConfig::new(3, 2000, 2.0),
            unknown: RetryStrategyConfig::new(2, 2000, 2.0),
        }
    }
}

/// Browser automation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// Navigation timeout in seconds
    pub navigation_timeout_secs: u64,
    /// How long to wait for extraction selectors
    pub selector_timeout_ms: u64,
    /// Pages served by one browser process before it is recycled
    pub max_pages_per_browser: u32,
    /// Number of browser processes in the pool
    pub pool_size: usize,
    /// Launch attempts before the run is aborted
    pub launch_attempts: u32,
    /// Pause between launch attempts
    pub launch_retry_delay_ms: u64,
    /// Explicit Chrome/Chromium binary
    pub executable_path: Option<PathBuf>,
    /// User agent sent by pages
    pub user_agent: String,
    /// CDP resource types aborted at the interception layer
    pub blocked_resource_types: Vec<String>,
    /// Host suffixes whose requests are aborted
    pub blocked_domains: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1366,
            window_height: 768,
            navigation_timeout_secs: 30,
            selector_timeout_ms: 10_000,
            max_pages_per_browser: 25,
            pool_size: 1,
            launch_attempts: 3,
            launch_retry_delay_ms: 2000,
            executable_path: None,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            blocked_resource_types: ["Image", "Stylesheet", "Font", "Media"]
                .into_iter()
                .map(String::from)
                .collect(),
            blocked_domains: [
                "google-analytics.com",
                "googletagmanager.com",
                "doubleclick.net",
                "facebook.net",
                "hotjar.com",
                "segment.io",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Selectors and banner phrases for the DOM-rendered platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DomSelectors {
    /// Campaign title
    pub title: String,
    /// Raised amount (may render as adjacent amount/currency spans)
    pub raised: String,
    /// Goal text
    pub goal: String,
    /// Donation count text
    pub donation_count: String,
    /// Lowercase phrases marking a paused campaign
    pub paused_phrases: Vec<String>,
    /// Lowercase phrases marking a campaign without donations
    pub zero_donation_phrases: Vec<String>,
}

impl Default for DomSelectors {
    fn default() -> Self {
        Self {
            title: "h1".to_string(),
            raised: "[class*='progressBarHeading']".to_string(),
            goal: "[class*='progressBarSecondaryText']".to_string(),
            donation_count: "[class*='donationCount'], [class*='donation-count']".to_string(),
            paused_phrases: vec![
                "no longer accepting donations".to_string(),
                "not accepting donations".to_string(),
                "donations are paused".to_string(),
            ],
            zero_donation_phrases: vec![
                "no donations yet".to_string(),
                "be the first to donate".to_string(),
            ],
        }
    }
}

/// GraphQL platform settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// GraphQL endpoint
    pub graphql_endpoint: String,
    /// Currency used when the API omits one
    pub default_currency: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// User agent for API and slug-resolution requests
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            graphql_endpoint: "https://chuffed.org/api/graphql".to_string(),
            default_currency: "AUD".to_string(),
            timeout_secs: 30,
            user_agent: "Fundwatch/0.1.0 (+https://github.com/fundwatch/fundwatch)".to_string(),
        }
    }
}

/// Webhook notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Send notifications at all
    pub enabled: bool,
    /// Target webhook; nothing is sent when unset
    pub webhook_url: Option<String>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            webhook_url: None,
        }
    }
}

/// Graceful shutdown settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Hard exit this long after a shutdown signal if the run has not stopped
    pub grace_period_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_period_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.rate_limit.base_delay_ms, 4000);
        assert_eq!(config.rate_limit.success_threshold, 5);
        assert!(config.browser.headless);
        assert_eq!(config.api.default_currency, "AUD");
        assert!(config.notifications.webhook_url.is_none());
        config.validate().expect("defaults are valid");
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("[rate_limit]"));
        assert!(toml_str.contains("[browser]"));
        assert!(toml_str.contains("[retry.timeout]"));

        let parsed: AppConfig = toml::from_str(&toml_str).expect("parse serialized config");
        assert_eq!(parsed.browser.max_pages_per_browser, 25);
        assert_eq!(parsed.retry.timeout, config.retry.timeout);
    }

    #[test]
    fn test_load_from_file() {
        let tmp = TempDir::new().expect("create temp dir");
        let config_path = tmp.path().join("config.toml");

        let mut config = AppConfig::default();
        config.browser.max_pages_per_browser = 10;
        config.rate_limit.jitter_ms = 0;
        fs::write(
            &config_path,
            toml::to_string_pretty(&config).expect("serialize config"),
        )
        .expect("write config file");

        let loaded = AppConfig::load_from(&config_path).expect("load config");
        assert_eq!(loaded.browser.max_pages_per_browser, 10);
        assert_eq!(loaded.rate_limit.jitter_ms, 0);
    }

    #[test]
    fn test_load_from_missing_file() {
        let tmp = TempDir::new().expect("create temp dir");
        let err = AppConfig::load_from(&tmp.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("FUNDWATCH_HEADLESS", "false"),
            ("FUNDWATCH_DATABASE_PATH", "/tmp/fw.db"),
            ("FUNDWATCH_WEBHOOK_URL", "https://hooks.test/abc"),
            ("FUNDWATCH_MAX_PAGES_PER_BROWSER", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env_overrides(|key| vars.get(key).map(|v| (*v).to_string()));

        assert!(!config.browser.headless);
        assert_eq!(config.database.path, Some(PathBuf::from("/tmp/fw.db")));
        assert_eq!(
            config.notifications.webhook_url.as_deref(),
            Some("https://hooks.test/abc")
        );
        // Unparseable values leave the default in place
        assert_eq!(config.browser.max_pages_per_browser, 25);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[rate_limit]
base_delay_ms = 100
jitter_ms = 0

[retry.timeout]
max_attempts = 5
base_delay_ms = 10
backoff_multiplier = 3.0
"#;

        let config: AppConfig = toml::from_str(toml_str).expect("parse partial config");
        assert_eq!(config.rate_limit.base_delay_ms, 100);
        assert_eq!(config.retry.timeout.max_attempts, 5);
        // These should be defaults
        assert_eq!(config.rate_limit.max_delay_ms, 60_000);
        assert_eq!(config.retry.server_error.max_attempts, 3);
        assert!(config.browser.headless);
    }

    #[test]
    fn test_validate_rejects_inverted_bounds() {
        let mut config = AppConfig::default();
        config.rate_limit.min_delay_ms = 90_000;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("rate_limit.min_delay_ms"));

        let mut config = AppConfig::default();
        config.rate_limit.reduction_factor = 1.5;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.browser.pool_size = 0;
        assert!(config.validate().is_err());
    }
}
