//! Record-store seam used by the orchestrator.

use crate::error::{Result, ScanError};
use async_trait::async_trait;
use chrono::Utc;
use fundwatch_core::{Campaign, CampaignId, FailureRecord, ScanResult};
use fundwatch_db::{campaigns, scan_failures, Database};

/// Reads campaign lists and stores scan results.
#[async_trait]
pub trait CampaignStore: Send + Sync {
    /// Campaigns of a collection in ascending id order.
    async fn list_campaigns(&self, collection: &str, only_unfetched: bool)
        -> Result<Vec<Campaign>>;

    /// Write the fields of one result, keyed by campaign id.
    async fn upsert_result(&self, collection: &str, result: &ScanResult) -> Result<()>;

    /// Mark a campaign whose page is gone.
    async fn flag_dead_link(&self, collection: &str, id: CampaignId) -> Result<()>;

    /// Append to the failure log of a run.
    async fn record_failure(
        &self,
        run_id: &str,
        collection: &str,
        failure: &FailureRecord,
    ) -> Result<()>;
}

#[async_trait]
impl CampaignStore for Database {
    async fn list_campaigns(
        &self,
        collection: &str,
        only_unfetched: bool,
    ) -> Result<Vec<Campaign>> {
        campaigns::list_campaigns(self.pool(), collection, only_unfetched)
            .await
            .map_err(|e| ScanError::DataSource(e.to_string()))
    }

    async fn upsert_result(&self, collection: &str, result: &ScanResult) -> Result<()> {
        campaigns::upsert_result(self.pool(), collection, result, Utc::now())
            .await
            .map_err(|e| ScanError::Persistence(e.to_string()))
    }

    async fn flag_dead_link(&self, collection: &str, id: CampaignId) -> Result<()> {
        campaigns::flag_dead_link(self.pool(), collection, id, Utc::now())
            .await
            .map_err(|e| ScanError::Persistence(e.to_string()))
    }

    async fn record_failure(
        &self,
        run_id: &str,
        collection: &str,
        failure: &FailureRecord,
    ) -> Result<()> {
        scan_failures::record_failure(self.pool(), run_id, collection, failure)
            .await
            .map(|_| ())
            .map_err(|e| ScanError::Persistence(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fundwatch_core::ScanStatus;

    #[tokio::test]
    async fn test_database_store_round_trip() {
        let db = Database::open(":memory:").await.expect("open database");
        let id = CampaignId::new(8).expect("valid id");
        campaigns::insert_campaigns(
            db.pool(),
            "alpha",
            &[(id, Some("https://chuffed.org/project/8".to_string()))],
        )
        .await
        .expect("seed");

        let listed = db.list_campaigns("alpha", true).await.expect("list");
        assert_eq!(listed.len(), 1);

        let mut result = ScanResult::not_found(id);
        result.status = ScanStatus::Success;
        result.raised_amount = Some("10".to_string());
        db.upsert_result("alpha", &result).await.expect("upsert");
        assert!(db.list_campaigns("alpha", true).await.expect("list").is_empty());

        let missing = CampaignId::new(9).expect("valid id");
        let err = db.flag_dead_link("alpha", missing).await.unwrap_err();
        assert!(err.to_string().starts_with("persistence failed"));
    }
}
