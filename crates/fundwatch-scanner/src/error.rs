use crate::retry::ErrorCategory;
use fundwatch_browser::BrowserError;
use thiserror::Error;

/// Errors raised while scanning a campaign.
///
/// Each failure site produces its own variant so [`crate::retry::classify`]
/// can map every error to a retry category without inspecting messages.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("no campaign elements found on {0}")]
    ElementsNotFound(String),

    #[error("unresolvable slug: {0}")]
    UnresolvableSlug(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("persistence failed: {0}")]
    Persistence(String),

    #[error("data source read failed: {0}")]
    DataSource(String),

    #[error("final attempt failed after {attempts} attempt(s): {source}")]
    RetriesExhausted {
        attempts: u32,
        category: ErrorCategory,
        #[source]
        source: Box<ScanError>,
    },
}

impl ScanError {
    /// Whether this error must abort the whole run instead of one campaign.
    ///
    /// Browser launches are already retried by the browser manager, so a
    /// launch error reaching the scanner means the browser is unavailable.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Browser(BrowserError::Launch(_) | BrowserError::ShutDown) => true,
            Self::DataSource(_) => true,
            Self::RetriesExhausted { source, .. } => source.is_fatal(),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ScanError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map_or_else(|| "<unknown>".to_string(), ToString::to_string);
        if err.is_timeout() {
            Self::Timeout(format!("request to {url} timed out"))
        } else if let Some(status) = err.status() {
            Self::Http {
                status: status.as_u16(),
                url,
            }
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_message_carries_last_error() {
        let err = ScanError::RetriesExhausted {
            attempts: 3,
            category: ErrorCategory::Timeout,
            source: Box::new(ScanError::Timeout("navigation".to_string())),
        };
        assert_eq!(
            err.to_string(),
            "final attempt failed after 3 attempt(s): timed out: navigation"
        );
    }

    #[test]
    fn test_fatal_errors() {
        assert!(ScanError::Browser(BrowserError::Launch("no chrome".to_string())).is_fatal());
        assert!(ScanError::DataSource("db locked".to_string()).is_fatal());
        assert!(!ScanError::Timeout("x".to_string()).is_fatal());
        assert!(!ScanError::Browser(BrowserError::NavigationError("x".to_string())).is_fatal());
    }
}
