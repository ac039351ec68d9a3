//! Shared types used across Fundwatch.
//!
//! This module defines common newtypes and enums that provide type safety
//! and clear domain modeling.

use crate::error::FundwatchError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Newtype for campaign identifiers.
///
/// Campaign IDs are stable positive integers assigned by the data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CampaignId(i64);

impl CampaignId {
    /// Create a new `CampaignId`.
    ///
    /// # Errors
    /// Returns error if the ID is not positive.
    pub fn new(id: i64) -> Result<Self, FundwatchError> {
        if id <= 0 {
            return Err(FundwatchError::Validation(format!(
                "invalid campaign ID: must be positive, got {id}"
            )));
        }
        Ok(Self(id))
    }

    /// Get the inner integer value.
    #[must_use]
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for CampaignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One fundraising page tracked by the data source.
///
/// Campaigns are created by the ingestion side; the scanner only reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    /// Stable identifier
    pub id: CampaignId,
    /// Campaign page URL, if the source row has one
    pub url: Option<String>,
    /// Title seen on the previous scan
    pub last_known_title: Option<String>,
}

impl Campaign {
    /// Create a campaign with a URL and no known title.
    #[must_use]
    pub fn new(id: CampaignId, url: impl Into<String>) -> Self {
        Self {
            id,
            url: Some(url.into()),
            last_known_title: None,
        }
    }
}

/// Fundraising platforms the scanner knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// DOM-rendered platform, scraped through a headless browser
    GoFundMe,
    /// API-backed platform, queried through its GraphQL endpoint
    Chuffed,
}

impl Platform {
    /// Stable lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GoFundMe => "gofundme",
            Self::Chuffed => "chuffed",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome category of a single campaign scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanStatus {
    /// Figures extracted
    Success,
    /// Page is gone (HTTP 404 or missing campaign)
    NotFound,
    /// Campaign is paused / not accepting donations
    Paused,
    /// Campaign is live but has no donations yet
    ZeroDonations,
    /// No network call made (missing or unrecognized URL)
    Skipped,
    /// Scan failed after retries
    Failed,
}

impl ScanStatus {
    /// Stable name used for storage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::NotFound => "NotFound",
            Self::Paused => "Paused",
            Self::ZeroDonations => "ZeroDonations",
            Self::Skipped => "Skipped",
            Self::Failed => "Failed",
        }
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanStatus {
    type Err = FundwatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Success" => Ok(Self::Success),
            "NotFound" => Ok(Self::NotFound),
            "Paused" => Ok(Self::Paused),
            "ZeroDonations" => Ok(Self::ZeroDonations),
            "Skipped" => Ok(Self::Skipped),
            "Failed" => Ok(Self::Failed),
            other => Err(FundwatchError::Validation(format!(
                "unknown scan status '{other}'"
            ))),
        }
    }
}

/// Result of one campaign attempt.
///
/// Amounts are decimal strings in major units (e.g. `"1234.5"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Campaign this result belongs to
    pub campaign_id: CampaignId,
    /// Campaign title
    pub title: Option<String>,
    /// Amount raised so far
    pub raised_amount: Option<String>,
    /// Fundraising goal
    pub target_amount: Option<String>,
    /// ISO-4217 currency code
    pub currency_code: Option<String>,
    /// Number of donations
    pub donation_count: Option<u64>,
    /// Outcome category
    pub status: ScanStatus,
    /// Why the scan failed or was skipped
    pub failure_reason: Option<String>,
}

impl ScanResult {
    fn bare(campaign_id: CampaignId, status: ScanStatus, reason: Option<String>) -> Self {
        Self {
            campaign_id,
            title: None,
            raised_amount: None,
            target_amount: None,
            currency_code: None,
            donation_count: None,
            status,
            failure_reason: reason,
        }
    }

    /// A campaign skipped without any network call.
    #[must_use]
    pub fn skipped(campaign_id: CampaignId, reason: impl Into<String>) -> Self {
        Self::bare(campaign_id, ScanStatus::Skipped, Some(reason.into()))
    }

    /// A campaign whose page no longer exists.
    #[must_use]
    pub fn not_found(campaign_id: CampaignId) -> Self {
        Self::bare(campaign_id, ScanStatus::NotFound, None)
    }

    /// A campaign that could not be scanned.
    #[must_use]
    pub fn failed(campaign_id: CampaignId, reason: impl Into<String>) -> Self {
        Self::bare(campaign_id, ScanStatus::Failed, Some(reason.into()))
    }
}

/// A failed campaign, kept for the post-run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Campaign that failed
    pub campaign_id: CampaignId,
    /// URL that was attempted
    pub url: Option<String>,
    /// Final error description
    pub reason: String,
    /// When the failure was recorded
    pub failed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_campaign_id_validation() {
        assert!(CampaignId::new(1).is_ok());
        assert!(CampaignId::new(0).is_err());
        assert!(CampaignId::new(-4).is_err());
        assert_eq!(CampaignId::new(42).expect("valid id").to_string(), "42");
    }

    #[test]
    fn test_campaign_id_ordering() {
        let a = CampaignId::new(3).expect("valid id");
        let b = CampaignId::new(10).expect("valid id");
        assert!(a < b);
    }

    #[test]
    fn test_platform_properties() {
        assert_eq!(Platform::GoFundMe.to_string(), "gofundme");
        assert_eq!(Platform::Chuffed.to_string(), "chuffed");
    }

    #[test]
    fn test_scan_status_round_trip_names() {
        for status in [
            ScanStatus::Success,
            ScanStatus::NotFound,
            ScanStatus::Paused,
            ScanStatus::ZeroDonations,
            ScanStatus::Skipped,
            ScanStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<ScanStatus>().expect("parse"), status);
        }
        assert!("Bogus".parse::<ScanStatus>().is_err());
    }

    #[test]
    fn test_scan_result_constructors() {
        let id = CampaignId::new(7).expect("valid id");
        let result = ScanResult::failed(id, "timeout");
        assert_eq!(result.status, ScanStatus::Failed);
        assert_eq!(result.failure_reason.as_deref(), Some("timeout"));
        assert!(result.raised_amount.is_none());

        let result = ScanResult::not_found(id);
        assert_eq!(result.status, ScanStatus::NotFound);
        assert!(result.failure_reason.is_none());
    }

    #[test]
    fn test_serde_representation() {
        let id = CampaignId::new(9).expect("valid id");
        let json = serde_json::to_string(&Campaign::new(id, "https://x.test")).expect("serialize");
        assert!(json.contains("\"id\":9"));
    }
}
