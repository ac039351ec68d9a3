use crate::error::{BrowserError, Result};
use chromiumoxide::browser::BrowserConfig as ChromiumConfig;
use chromiumoxide::handler::viewport::Viewport;
use fundwatch_core::BrowserConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Chromium flags used for every launch.
///
/// Sandboxing is disabled separately through `no_sandbox()` so the browser
/// runs inside containers without extra privileges.
pub const LAUNCH_FLAGS: &[&str] = &[
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--disable-extensions",
    "--disable-background-networking",
    "--disable-default-apps",
    "--disable-sync",
    "--disable-translate",
    "--mute-audio",
    "--no-first-run",
    "--hide-scrollbars",
    "--metrics-recording-only",
];

/// Launch configuration for one headless browser process
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub user_agent: String,
    pub executable_path: Option<PathBuf>,
    pub request_timeout: Duration,
}

impl LaunchOptions {
    /// Build launch options from the application's browser settings
    pub fn from_config(config: &BrowserConfig) -> Self {
        Self {
            headless: config.headless,
            viewport_width: config.window_width,
            viewport_height: config.window_height,
            user_agent: config.user_agent.clone(),
            executable_path: config.executable_path.clone(),
            request_timeout: Duration::from_secs(config.navigation_timeout_secs),
        }
    }

    /// Full argument list passed to Chromium, besides the sandbox switch
    pub fn args(&self) -> Vec<String> {
        let mut args: Vec<String> = LAUNCH_FLAGS.iter().map(|f| (*f).to_string()).collect();
        args.push(format!("--user-agent={}", self.user_agent));
        args
    }

    /// Convert into a chromiumoxide launch config
    pub fn to_chromium_config(&self) -> Result<ChromiumConfig> {
        let mut builder = ChromiumConfig::builder()
            .no_sandbox()
            .window_size(self.viewport_width, self.viewport_height)
            .viewport(Viewport {
                width: self.viewport_width,
                height: self.viewport_height,
                device_scale_factor: None,
                emulating_mobile: false,
                is_landscape: true,
                has_touch: false,
            })
            .request_timeout(self.request_timeout)
            .args(self.args());

        if !self.headless {
            builder = builder.with_head();
        }

        if let Some(path) = &self.executable_path {
            builder = builder.chrome_executable(path);
        }

        builder.build().map_err(BrowserError::Launch)
    }
}
