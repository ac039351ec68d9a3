use super::{CampaignData, ScanOutcome, SiteAdapter};
use crate::amount::format_minor_units;
use crate::error::{Result, ScanError};
use async_trait::async_trait;
use fundwatch_core::{ApiConfig, Platform};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use std::time::Duration;

const CAMPAIGN_QUERY: &str = "query getCampaign($id: ID!) { \
    campaign(id: $id) { \
        id title \
        collected { amount } \
        target { amount currency } \
        donations { totalCount } \
    } \
}";

#[allow(clippy::expect_used)]
static PROJECT_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/project/(\d+)\b").expect("project id pattern is valid"));

/// Tokens that carry the numeric campaign id in a slug page.
#[allow(clippy::expect_used)]
static EMBEDDED_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:"campaign_?[iI]d"|"project_?[iI]d"|data-campaign-id=)\s*:?\s*"?(\d+)"#)
        .expect("embedded id pattern is valid")
});

/// Reads campaign totals from the platform's GraphQL API.
#[derive(Debug, Clone)]
pub struct ApiAdapter {
    client: reqwest::Client,
    endpoint: String,
    default_currency: String,
}

impl ApiAdapter {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ScanError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.graphql_endpoint.clone(),
            default_currency: config.default_currency.clone(),
        })
    }

    /// Resolve a slug URL to its numeric id by scanning the page body.
    ///
    /// Server-side and transport errors are returned for retry; a missing
    /// page or a body without an id token is [`ScanError::UnresolvableSlug`].
    async fn resolve_slug(&self, url: &str) -> Result<u64> {
        tracing::debug!("Resolving slug URL {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status.as_u16() == 429 || status.is_server_error() {
            return Err(ScanError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(ScanError::UnresolvableSlug(format!("{url} (HTTP {status})")));
        }

        let body = response.text().await?;
        find_embedded_id(&body).ok_or_else(|| ScanError::UnresolvableSlug(url.to_string()))
    }

    async fn query_campaign(&self, id: u64) -> Result<Value> {
        let body = json!({
            "operationName": "getCampaign",
            "variables": { "id": id },
            "query": CAMPAIGN_QUERY,
        });

        let response = self.client.post(&self.endpoint).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::Http {
                status: status.as_u16(),
                url: self.endpoint.clone(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ScanError::InvalidResponse(format!("campaign {id}: {e}")))
    }
}

#[async_trait]
impl SiteAdapter for ApiAdapter {
    fn platform(&self) -> Platform {
        Platform::Chuffed
    }

    async fn scan(&self, url: &str) -> Result<ScanOutcome> {
        let id = match project_id(url) {
            Some(id) => id,
            None => self.resolve_slug(url).await?,
        };
        let response = self.query_campaign(id).await?;
        interpret_response(&response, &self.default_currency)
    }
}

/// Numeric id from a `/project/<id>` URL.
fn project_id(url: &str) -> Option<u64> {
    PROJECT_ID.captures(url)?.get(1)?.as_str().parse().ok()
}

fn find_embedded_id(body: &str) -> Option<u64> {
    EMBEDDED_ID.captures(body)?.get(1)?.as_str().parse().ok()
}

/// Money fields arrive as minor units, either as numbers or numeric strings.
#[allow(clippy::cast_possible_truncation)]
fn minor_units(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Turn a GraphQL response into a scan outcome.
fn interpret_response(response: &Value, default_currency: &str) -> Result<ScanOutcome> {
    let campaign = &response["data"]["campaign"];
    if campaign.is_null() {
        if let Some(errors) = response["errors"].as_array().filter(|e| !e.is_empty()) {
            let message = errors
                .iter()
                .filter_map(|e| e["message"].as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ScanError::InvalidResponse(format!("GraphQL error: {message}")));
        }
        return Ok(ScanOutcome::NotFound);
    }
    if !campaign.is_object() {
        return Err(ScanError::InvalidResponse(
            "campaign field is not an object".to_string(),
        ));
    }

    let currency = campaign["target"]["currency"]
        .as_str()
        .filter(|c| !c.trim().is_empty())
        .unwrap_or(default_currency)
        .to_uppercase();
    let donation_count = campaign["donations"]["totalCount"].as_u64();

    let mut data = CampaignData {
        title: campaign["title"]
            .as_str()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(ToString::to_string),
        raised_amount: minor_units(&campaign["collected"]["amount"]).map(format_minor_units),
        target_amount: minor_units(&campaign["target"]["amount"]).map(format_minor_units),
        currency_code: Some(currency),
        donation_count,
    };

    if donation_count == Some(0) {
        data.raised_amount = Some("0".to_string());
        return Ok(ScanOutcome::ZeroDonations(data));
    }
    Ok(ScanOutcome::Extracted(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn campaign_json(collected: Value, target: Value, currency: Value, count: u64) -> Value {
        json!({
            "data": {
                "campaign": {
                    "id": "123",
                    "title": " Legal fund ",
                    "collected": { "amount": collected },
                    "target": { "amount": target, "currency": currency },
                    "donations": { "totalCount": count }
                }
            }
        })
    }

    fn adapter_for(server: &MockServer) -> ApiAdapter {
        ApiAdapter::new(&ApiConfig {
            graphql_endpoint: format!("{}/api/graphql", server.uri()),
            ..ApiConfig::default()
        })
        .expect("build adapter")
    }

    #[test]
    fn test_project_id_from_url() {
        assert_eq!(project_id("https://chuffed.org/project/12345"), Some(12345));
        assert_eq!(project_id("https://chuffed.org/project/12345-save-the-park"), Some(12345));
        assert_eq!(project_id("https://chuffed.org/project/save-the-park"), None);
        assert_eq!(project_id("https://chuffed.org/project/123abc"), None);
    }

    #[test]
    fn test_interpret_converts_cents() {
        let response = campaign_json(json!(123_456), json!("500000"), json!("usd"), 12);
        let outcome = interpret_response(&response, "AUD").expect("interpret");
        assert_eq!(
            outcome,
            ScanOutcome::Extracted(CampaignData {
                title: Some("Legal fund".to_string()),
                raised_amount: Some("1234.56".to_string()),
                target_amount: Some("5000".to_string()),
                currency_code: Some("USD".to_string()),
                donation_count: Some(12),
            })
        );
    }

    #[test]
    fn test_interpret_default_currency_and_zero_donations() {
        let response = campaign_json(json!(0), json!(100_000), Value::Null, 0);
        let outcome = interpret_response(&response, "AUD").expect("interpret");
        match outcome {
            ScanOutcome::ZeroDonations(data) => {
                assert_eq!(data.currency_code.as_deref(), Some("AUD"));
                assert_eq!(data.raised_amount.as_deref(), Some("0"));
                assert_eq!(data.target_amount.as_deref(), Some("1000"));
            }
            other => panic!("expected zero donations, got {other:?}"),
        }
    }

    #[test]
    fn test_interpret_missing_campaign() {
        let outcome = interpret_response(&json!({"data": {"campaign": null}}), "AUD")
            .expect("interpret");
        assert_eq!(outcome, ScanOutcome::NotFound);

        let err = interpret_response(
            &json!({"data": null, "errors": [{"message": "boom"}]}),
            "AUD",
        )
        .unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_scan_numeric_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/graphql"))
            .and(body_partial_json(json!({
                "operationName": "getCampaign",
                "variables": { "id": 321 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(campaign_json(
                json!(2500),
                json!(10_000),
                json!("AUD"),
                3,
            )))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = adapter_for(&server)
            .scan("https://chuffed.org/project/321")
            .await
            .expect("scan");
        match outcome {
            ScanOutcome::Extracted(data) => {
                assert_eq!(data.raised_amount.as_deref(), Some("25"));
                assert_eq!(data.target_amount.as_deref(), Some("100"));
                assert_eq!(data.donation_count, Some(3));
            }
            other => panic!("expected extracted data, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_scan_resolves_slug() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/project/save-the-park"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<html><script>window.__STATE__ = {"campaignId": 777};</script></html>"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/graphql"))
            .and(body_partial_json(json!({ "variables": { "id": 777 } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(campaign_json(
                json!(100),
                json!(200),
                json!("AUD"),
                1,
            )))
            .mount(&server)
            .await;

        let url = format!("{}/project/save-the-park", server.uri());
        let outcome = adapter_for(&server).scan(&url).await.expect("scan");
        assert!(matches!(outcome, ScanOutcome::Extracted(_)));
    }

    #[tokio::test]
    async fn test_unresolvable_slug() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/project/mystery"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>nothing</html>"))
            .mount(&server)
            .await;

        let url = format!("{}/project/mystery", server.uri());
        let err = adapter_for(&server).scan(&url).await.unwrap_err();
        assert!(matches!(err, ScanError::UnresolvableSlug(_)));
        assert!(err.to_string().contains("unresolvable slug"));
    }

    #[tokio::test]
    async fn test_endpoint_errors_map_to_http() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/graphql"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = adapter_for(&server)
            .scan("https://chuffed.org/project/1")
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::Http { status: 502, .. }));
    }
}
