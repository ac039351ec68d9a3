//! Outbound run notifications.

use fundwatch_core::NotificationConfig;
use serde_json::json;
use std::time::Duration;

/// Posts human-readable run updates to a chat webhook.
///
/// Delivery problems are logged and swallowed; a notification never
/// affects the scan.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: Option<String>,
}

impl WebhookNotifier {
    /// Notifier for the configured webhook; a no-op when disabled or unset.
    pub fn from_config(config: &NotificationConfig) -> Self {
        let url = config
            .webhook_url
            .clone()
            .filter(|url| config.enabled && !url.trim().is_empty());
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            url,
        }
    }

    /// Whether anything will be sent.
    pub fn is_active(&self) -> bool {
        self.url.is_some()
    }

    /// Send `content` as `{"content": ...}`.
    pub async fn notify(&self, content: &str) {
        let Some(url) = &self.url else {
            return;
        };

        let result = self
            .client
            .post(url)
            .json(&json!({ "content": content }))
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);
        match result {
            Ok(_) => tracing::debug!("Notification delivered"),
            Err(e) => tracing::warn!("Notification failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(url: Option<String>, enabled: bool) -> NotificationConfig {
        NotificationConfig {
            enabled,
            webhook_url: url,
        }
    }

    #[test]
    fn test_inactive_without_url_or_when_disabled() {
        assert!(!WebhookNotifier::from_config(&config(None, true)).is_active());
        assert!(!WebhookNotifier::from_config(&config(Some("  ".to_string()), true)).is_active());
        assert!(!WebhookNotifier::from_config(&config(
            Some("https://hooks.test/x".to_string()),
            false
        ))
        .is_active());
    }

    #[tokio::test]
    async fn test_posts_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_json(json!({ "content": "Run started" })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let notifier =
            WebhookNotifier::from_config(&config(Some(format!("{}/hook", server.uri())), true));
        notifier.notify("Run started").await;
    }

    #[tokio::test]
    async fn test_delivery_errors_are_swallowed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let notifier =
            WebhookNotifier::from_config(&config(Some(format!("{}/hook", server.uri())), true));
        notifier.notify("Run finished").await;

        let unreachable =
            WebhookNotifier::from_config(&config(Some("http://127.0.0.1:9/hook".to_string()), true));
        unreachable.notify("Run finished").await;
    }
}
