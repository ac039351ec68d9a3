//! Campaign rows: listing, result upserts and dead-link flags.

use crate::error::{DatabaseError, Result};
use chrono::{DateTime, Utc};
use fundwatch_core::{Campaign, CampaignId, ScanResult, ScanStatus};
use sqlx::SqlitePool;

/// A campaign row as stored, including the latest scan result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignRecord {
    /// Collection the campaign belongs to
    pub collection: String,
    /// Campaign identifier
    pub id: CampaignId,
    /// Campaign page URL
    pub link: Option<String>,
    /// Latest title
    pub title: Option<String>,
    /// Latest raised amount (major units)
    pub raised_amount: Option<String>,
    /// Latest target amount (major units)
    pub target_amount: Option<String>,
    /// Latest ISO-4217 currency code
    pub currency_code: Option<String>,
    /// Latest donation count
    pub donation_count: Option<u64>,
    /// Latest scan status
    pub status: Option<ScanStatus>,
    /// Latest failure reason
    pub failure_reason: Option<String>,
    /// Whether the link has been flagged as gone
    pub dead_link: bool,
    /// When the campaign was last scanned
    pub last_scanned_at: Option<DateTime<Utc>>,
}

type CampaignRow = (
    String,
    i64,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<i64>,
    Option<String>,
    Option<String>,
    i64,
    Option<String>,
);

fn campaign_id(raw: i64) -> Result<CampaignId> {
    CampaignId::new(raw).map_err(|e| DatabaseError::Decode(e.to_string()))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| DatabaseError::Decode(format!("invalid timestamp '{raw}': {e}")))
}

/// List campaigns of `collection` in ascending id order.
///
/// With `only_unfetched`, campaigns that have been scanned before are left out.
pub async fn list_campaigns(
    pool: &SqlitePool,
    collection: &str,
    only_unfetched: bool,
) -> Result<Vec<Campaign>> {
    let sql = if only_unfetched {
        "SELECT id, link, title FROM campaigns
         WHERE collection = ? AND last_scanned_at IS NULL
         ORDER BY id ASC"
    } else {
        "SELECT id, link, title FROM campaigns
         WHERE collection = ?
         ORDER BY id ASC"
    };

    let rows = sqlx::query_as::<_, (i64, Option<String>, Option<String>)>(sql)
        .bind(collection)
        .fetch_all(pool)
        .await?;

    rows.into_iter()
        .map(|(id, link, title)| {
            Ok(Campaign {
                id: campaign_id(id)?,
                url: link,
                last_known_title: title,
            })
        })
        .collect()
}

/// Insert or refresh campaign links for `collection`.
///
/// Existing rows keep their scan results; only the link is replaced.
/// Returns the number of rows written.
pub async fn insert_campaigns(
    pool: &SqlitePool,
    collection: &str,
    campaigns: &[(CampaignId, Option<String>)],
) -> Result<u64> {
    let mut tx = pool.begin().await?;
    let mut written = 0;

    for (id, link) in campaigns {
        let result = sqlx::query(
            "INSERT INTO campaigns (collection, id, link) VALUES (?, ?, ?)
             ON CONFLICT(collection, id) DO UPDATE SET link = excluded.link",
        )
        .bind(collection)
        .bind(id.get())
        .bind(link.as_deref())
        .execute(&mut *tx)
        .await?;
        written += result.rows_affected();
    }

    tx.commit().await?;
    tracing::debug!("Stored {} campaign links in '{}'", written, collection);
    Ok(written)
}

/// Write the fields of `result` onto its campaign row.
///
/// Creates the row if it does not exist. A missing title in `result` keeps
/// the previously stored title. A paused result carries no figures, so it
/// only updates the status of an existing row.
pub async fn upsert_result(
    pool: &SqlitePool,
    collection: &str,
    result: &ScanResult,
    scanned_at: DateTime<Utc>,
) -> Result<()> {
    let donation_count = result
        .donation_count
        .map(i64::try_from)
        .transpose()
        .map_err(|e| DatabaseError::Query(format!("donation count out of range: {e}")))?;

    sqlx::query(
        "INSERT INTO campaigns (
            collection, id, title, raised_amount, target_amount, currency_code,
            donation_count, status, failure_reason, last_scanned_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(collection, id) DO UPDATE SET
            title = COALESCE(excluded.title, campaigns.title),
            raised_amount = CASE WHEN excluded.status = 'Paused'
                THEN campaigns.raised_amount ELSE excluded.raised_amount END,
            target_amount = CASE WHEN excluded.status = 'Paused'
                THEN campaigns.target_amount ELSE excluded.target_amount END,
            currency_code = CASE WHEN excluded.status = 'Paused'
                THEN campaigns.currency_code ELSE excluded.currency_code END,
            donation_count = CASE WHEN excluded.status = 'Paused'
                THEN campaigns.donation_count ELSE excluded.donation_count END,
            status = excluded.status,
            failure_reason = excluded.failure_reason,
            last_scanned_at = excluded.last_scanned_at",
    )
    .bind(collection)
    .bind(result.campaign_id.get())
    .bind(result.title.as_deref())
    .bind(result.raised_amount.as_deref())
    .bind(result.target_amount.as_deref())
    .bind(result.currency_code.as_deref())
    .bind(donation_count)
    .bind(result.status.as_str())
    .bind(result.failure_reason.as_deref())
    .bind(scanned_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Mark a campaign's link as gone.
///
/// # Errors
/// Returns `DatabaseError::NotFound` if the campaign does not exist.
pub async fn flag_dead_link(
    pool: &SqlitePool,
    collection: &str,
    id: CampaignId,
    scanned_at: DateTime<Utc>,
) -> Result<()> {
    let result = sqlx::query(
        "UPDATE campaigns SET dead_link = 1, status = ?, last_scanned_at = ?
         WHERE collection = ? AND id = ?",
    )
    .bind(ScanStatus::NotFound.as_str())
    .bind(scanned_at.to_rfc3339())
    .bind(collection)
    .bind(id.get())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound(format!(
            "campaign {id} not found in '{collection}'"
        )));
    }
    Ok(())
}

/// Fetch one campaign row.
pub async fn get_campaign(
    pool: &SqlitePool,
    collection: &str,
    id: CampaignId,
) -> Result<Option<CampaignRecord>> {
    let row = sqlx::query_as::<_, CampaignRow>(
        "SELECT collection, id, link, title, raised_amount, target_amount, currency_code,
                donation_count, status, failure_reason, dead_link, last_scanned_at
         FROM campaigns WHERE collection = ? AND id = ?",
    )
    .bind(collection)
    .bind(id.get())
    .fetch_optional(pool)
    .await?;

    row.map(
        |(
            collection,
            id,
            link,
            title,
            raised_amount,
            target_amount,
            currency_code,
            donation_count,
            status,
            failure_reason,
            dead_link,
            last_scanned_at,
        )| {
            Ok(CampaignRecord {
                collection,
                id: campaign_id(id)?,
                link,
                title,
                raised_amount,
                target_amount,
                currency_code,
                donation_count: donation_count
                    .map(u64::try_from)
                    .transpose()
                    .map_err(|e| DatabaseError::Decode(format!("negative donation count: {e}")))?,
                status: status
                    .map(|s| s.parse::<ScanStatus>())
                    .transpose()
                    .map_err(|e| DatabaseError::Decode(e.to_string()))?,
                failure_reason,
                dead_link: dead_link != 0,
                last_scanned_at: last_scanned_at.as_deref().map(parse_timestamp).transpose()?,
            })
        },
    )
    .transpose()
}
