//! Platform-specific campaign extraction.
//!
//! Each adapter turns one campaign URL into a [`ScanOutcome`]; retries,
//! pacing and persistence stay with the orchestrator.

mod api;
mod browser;

pub use api::ApiAdapter;
pub use browser::BrowserAdapter;

use crate::amount::ParsedAmount;
use crate::error::Result;
use async_trait::async_trait;
use fundwatch_core::{CampaignId, Platform, ScanResult, ScanStatus};

/// Figures read from a campaign page. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CampaignData {
    pub title: Option<String>,
    pub raised_amount: Option<String>,
    pub target_amount: Option<String>,
    pub currency_code: Option<String>,
    pub donation_count: Option<u64>,
}

impl CampaignData {
    /// Combine separately parsed raised and target amounts.
    ///
    /// The raised amount's currency wins when the two disagree.
    #[must_use]
    pub fn from_amounts(
        title: Option<String>,
        raised: ParsedAmount,
        target: ParsedAmount,
        donation_count: Option<u64>,
    ) -> Self {
        if let (Some(raised_code), Some(target_code)) = (&raised.currency_code, &target.currency_code)
        {
            if raised_code != target_code {
                tracing::warn!(
                    "Currency mismatch: raised '{}' is {} but target '{}' is {}",
                    raised.raw_match_text,
                    raised_code,
                    target.raw_match_text,
                    target_code
                );
            }
        }

        Self {
            title,
            raised_amount: raised.amount_major_units,
            target_amount: target.amount_major_units,
            currency_code: raised.currency_code.or(target.currency_code),
            donation_count,
        }
    }
}

/// Terminal state of one campaign scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Figures extracted (possibly partially)
    Extracted(CampaignData),
    /// Live campaign without donations; raised is zero
    ZeroDonations(CampaignData),
    /// Campaign is not accepting donations
    Paused,
    /// Page or campaign no longer exists
    NotFound,
}

impl ScanOutcome {
    /// Build the result recorded for `campaign_id`.
    #[must_use]
    pub fn into_scan_result(self, campaign_id: CampaignId) -> ScanResult {
        let (status, data) = match self {
            Self::Extracted(data) => (ScanStatus::Success, data),
            Self::ZeroDonations(data) => (ScanStatus::ZeroDonations, data),
            Self::Paused => (ScanStatus::Paused, CampaignData::default()),
            Self::NotFound => return ScanResult::not_found(campaign_id),
        };
        ScanResult {
            campaign_id,
            title: data.title,
            raised_amount: data.raised_amount,
            target_amount: data.target_amount,
            currency_code: data.currency_code,
            donation_count: data.donation_count,
            status,
            failure_reason: None,
        }
    }
}

/// Extraction strategy for one platform.
#[async_trait]
pub trait SiteAdapter: Send + Sync {
    /// Platform this adapter reads.
    fn platform(&self) -> Platform;

    /// Scan one campaign page.
    async fn scan(&self, url: &str) -> Result<ScanOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::{parse_raised, parse_target};

    #[test]
    fn test_from_amounts_raised_currency_wins() {
        let data = CampaignData::from_amounts(
            Some("Roof".to_string()),
            parse_raised("€1,234"),
            parse_target("$5k"),
            Some(3),
        );
        assert_eq!(data.currency_code.as_deref(), Some("EUR"));
        assert_eq!(data.raised_amount.as_deref(), Some("1234"));
        assert_eq!(data.target_amount.as_deref(), Some("5000"));
    }

    #[test]
    fn test_from_amounts_falls_back_to_target_currency() {
        let data = CampaignData::from_amounts(None, parse_raised("n/a"), parse_target("5k GBP"), None);
        assert_eq!(data.currency_code.as_deref(), Some("GBP"));
        assert!(data.raised_amount.is_none());
    }

    #[test]
    fn test_outcome_to_result() {
        let id = CampaignId::new(4).expect("valid id");
        let result = ScanOutcome::ZeroDonations(CampaignData {
            raised_amount: Some("0".to_string()),
            donation_count: Some(0),
            ..CampaignData::default()
        })
        .into_scan_result(id);
        assert_eq!(result.status, ScanStatus::ZeroDonations);
        assert_eq!(result.raised_amount.as_deref(), Some("0"));

        assert_eq!(
            ScanOutcome::NotFound.into_scan_result(id).status,
            ScanStatus::NotFound
        );
        assert_eq!(ScanOutcome::Paused.into_scan_result(id).status, ScanStatus::Paused);
    }
}
