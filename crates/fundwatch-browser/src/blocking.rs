//! Request blocking rules applied at the network-interception layer.
//!
//! Blocking only saves bandwidth and CPU; extraction never depends on it.

use crate::actions::extract_domain;
use fundwatch_core::BrowserConfig;

/// Decides which intercepted requests are aborted.
#[derive(Debug, Clone, Default)]
pub struct RequestBlocker {
    resource_types: Vec<String>,
    domains: Vec<String>,
}

impl RequestBlocker {
    pub fn new(
        resource_types: impl IntoIterator<Item = String>,
        domains: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            resource_types: resource_types
                .into_iter()
                .map(|t| t.to_ascii_lowercase())
                .collect(),
            domains: domains
                .into_iter()
                .map(|d| d.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &BrowserConfig) -> Self {
        Self::new(
            config.blocked_resource_types.iter().cloned(),
            config.blocked_domains.iter().cloned(),
        )
    }

    /// `resource_type` is the CDP name (`Image`, `Stylesheet`, ...).
    pub fn should_block(&self, resource_type: &str, url: &str) -> bool {
        let resource_type = resource_type.to_ascii_lowercase();
        if self.resource_types.iter().any(|t| *t == resource_type) {
            return true;
        }

        match extract_domain(url) {
            Ok(host) => {
                let host = host.to_ascii_lowercase();
                self.domains
                    .iter()
                    .any(|d| host == *d || host.ends_with(&format!(".{d}")))
            }
            Err(_) => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.resource_types.is_empty() && self.domains.is_empty()
    }
}
