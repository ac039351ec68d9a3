use crate::error::{BrowserError, Result};

/// What the browser saw for the main document of a navigation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationResponse {
    /// HTTP status of the main document, when the browser reported one
    pub status: Option<u16>,
    /// URL after redirects
    pub final_url: Option<String>,
}

impl NavigationResponse {
    /// Response with a known status code.
    #[must_use]
    pub fn with_status(status: u16) -> Self {
        Self {
            status: Some(status),
            final_url: None,
        }
    }
}

/// Page actions needed to read a campaign page
#[async_trait::async_trait]
pub trait PageActions: Send + Sync {
    /// Navigate to a URL and report the main document response
    async fn navigate(&self, url: &str) -> Result<NavigationResponse>;

    /// Wait for a selector to appear
    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<()>;

    /// Serialized DOM of the current page
    async fn content(&self) -> Result<String>;

    /// Close the page
    async fn close(&self) -> Result<()>;
}

/// Helper to extract domain from URL
pub fn extract_domain(url: &str) -> Result<String> {
    let url = url::Url::parse(url)
        .map_err(|e| BrowserError::NavigationError(format!("Invalid URL: {}", e)))?;

    url.host_str()
        .ok_or_else(|| BrowserError::NavigationError("No host in URL".to_string()))
        .map(|s| s.to_string())
}
