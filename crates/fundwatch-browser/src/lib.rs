//! Headless browser pool for the DOM-rendered campaign platform.
//!
//! Provides a bounded, recycling pool of Chromium processes, the page
//! actions adapters need, and request blocking for non-essential resources.

pub mod actions;
pub mod blocking;
pub mod chromium;
pub mod error;
pub mod launch;
pub mod manager;

pub use actions::{NavigationResponse, PageActions};
pub use blocking::RequestBlocker;
pub use chromium::{ChromiumBrowser, ChromiumLauncher, ChromiumPage};
pub use error::{BrowserError, Result};
pub use launch::LaunchOptions;
pub use manager::{BrowserHandle, BrowserLauncher, BrowserManager, ManagerSettings, PageLease};
