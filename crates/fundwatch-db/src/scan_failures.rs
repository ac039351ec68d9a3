//! Failure log for post-run reports.

use crate::error::{DatabaseError, Result};
use chrono::{DateTime, Utc};
use fundwatch_core::{CampaignId, FailureRecord};
use sqlx::SqlitePool;

/// A stored failure with the run it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFailure {
    /// Row identifier (UUID v4)
    pub id: String,
    /// Run that produced the failure
    pub run_id: String,
    /// Collection being scanned
    pub collection: String,
    /// The failure itself
    pub record: FailureRecord,
}

/// Append a failure to the log. Returns the new row id.
pub async fn record_failure(
    pool: &SqlitePool,
    run_id: &str,
    collection: &str,
    failure: &FailureRecord,
) -> Result<String> {
    let id = uuid::Uuid::new_v4().to_string();

    sqlx::query(
        "INSERT INTO scan_failures (id, run_id, collection, campaign_id, url, reason, failed_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(run_id)
    .bind(collection)
    .bind(failure.campaign_id.get())
    .bind(failure.url.as_deref())
    .bind(&failure.reason)
    .bind(failure.failed_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(id)
}

/// List the failures of one run, oldest first.
pub async fn list_failures(pool: &SqlitePool, run_id: &str) -> Result<Vec<StoredFailure>> {
    let rows = sqlx::query_as::<_, (String, String, String, i64, Option<String>, String, String)>(
        "SELECT id, run_id, collection, campaign_id, url, reason, failed_at
         FROM scan_failures WHERE run_id = ?
         ORDER BY failed_at ASC, campaign_id ASC",
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(
            |(id, run_id, collection, campaign_id, url, reason, failed_at)| {
                let campaign_id = CampaignId::new(campaign_id)
                    .map_err(|e| DatabaseError::Decode(e.to_string()))?;
                let failed_at = DateTime::parse_from_rfc3339(&failed_at)
                    .map_err(|e| {
                        DatabaseError::Decode(format!("invalid timestamp '{failed_at}': {e}"))
                    })?
                    .with_timezone(&Utc);
                Ok(StoredFailure {
                    id,
                    run_id,
                    collection,
                    record: FailureRecord {
                        campaign_id,
                        url,
                        reason,
                        failed_at,
                    },
                })
            },
        )
        .collect()
}

/// The run id of the most recent recorded failure, if any.
pub async fn latest_run_id(pool: &SqlitePool) -> Result<Option<String>> {
    let run_id = sqlx::query_scalar::<_, String>(
        "SELECT run_id FROM scan_failures ORDER BY failed_at DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;
    Ok(run_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use chrono::Duration;

    async fn setup_test_db() -> Database {
        let db = Database::new(":memory:").await.expect("create test database");
        db.run_migrations().await.expect("run migrations");
        db
    }

    fn failure(id: i64, reason: &str, failed_at: DateTime<Utc>) -> FailureRecord {
        FailureRecord {
            campaign_id: CampaignId::new(id).expect("valid id"),
            url: Some(format!("https://chuffed.org/project/{id}")),
            reason: reason.to_string(),
            failed_at,
        }
    }

    #[tokio::test]
    async fn test_record_and_list_failures() {
        let db = setup_test_db().await;
        let t0 = Utc::now();

        record_failure(db.pool(), "run-1", "alpha", &failure(4, "timeout", t0))
            .await
            .expect("record failure");
        record_failure(
            db.pool(),
            "run-1",
            "alpha",
            &failure(9, "unresolvable slug", t0 + Duration::seconds(5)),
        )
        .await
        .expect("record failure");
        record_failure(db.pool(), "run-2", "alpha", &failure(1, "x", t0))
            .await
            .expect("record failure");

        let failures = list_failures(db.pool(), "run-1").await.expect("list failures");
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].record.campaign_id.get(), 4);
        assert_eq!(failures[1].record.reason, "unresolvable slug");
        assert_eq!(failures[0].collection, "alpha");
    }

    #[tokio::test]
    async fn test_latest_run_id() {
        let db = setup_test_db().await;
        assert!(latest_run_id(db.pool()).await.expect("latest").is_none());

        let t0 = Utc::now();
        record_failure(db.pool(), "old", "alpha", &failure(1, "x", t0))
            .await
            .expect("record failure");
        record_failure(
            db.pool(),
            "new",
            "alpha",
            &failure(2, "y", t0 + Duration::minutes(1)),
        )
        .await
        .expect("record failure");

        assert_eq!(
            latest_run_id(db.pool()).await.expect("latest").as_deref(),
            Some("new")
        );
    }
}
