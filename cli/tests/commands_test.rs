//! Store-backed commands against a temporary database.

use fundwatch_cli::{import_campaigns, list_failures};
use fundwatch_core::{AppConfig, CampaignId, FailureRecord};
use fundwatch_db::{scan_failures, Database};
use std::io::Write;

fn config_in(dir: &tempfile::TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.database.path = Some(dir.path().join("fundwatch.db"));
    config
}

#[tokio::test]
async fn test_import_then_reimport_updates_links() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = config_in(&dir);

    let csv = dir.path().join("seed.csv");
    let mut file = std::fs::File::create(&csv).expect("create csv");
    writeln!(file, "id,link").expect("write");
    writeln!(file, "1,https://www.gofundme.com/f/one").expect("write");
    writeln!(file, "2,https://chuffed.org/project/2").expect("write");
    drop(file);

    let written = import_campaigns(&config, "alpha", &csv).await.expect("import");
    assert_eq!(written, 2);

    let db = Database::open(dir.path().join("fundwatch.db"))
        .await
        .expect("open database");
    let listed = fundwatch_db::campaigns::list_campaigns(db.pool(), "alpha", false)
        .await
        .expect("list");
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[1].url.as_deref(), Some("https://chuffed.org/project/2"));
    db.close().await;
}

#[tokio::test]
async fn test_failures_default_to_latest_run() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = config_in(&dir);

    assert!(list_failures(&config, None).await.expect("list").is_empty());

    let db = Database::open(dir.path().join("fundwatch.db"))
        .await
        .expect("open database");
    let older = chrono::Utc::now() - chrono::Duration::hours(1);
    let failure = |id: i64, at| FailureRecord {
        campaign_id: CampaignId::new(id).expect("valid id"),
        url: None,
        reason: "timed out".to_string(),
        failed_at: at,
    };
    scan_failures::record_failure(db.pool(), "run-old", "alpha", &failure(1, older))
        .await
        .expect("record");
    scan_failures::record_failure(db.pool(), "run-new", "alpha", &failure(2, chrono::Utc::now()))
        .await
        .expect("record");
    db.close().await;

    let latest = list_failures(&config, None).await.expect("list");
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].run_id, "run-new");

    let explicit = list_failures(&config, Some("run-old".to_string()))
        .await
        .expect("list");
    assert_eq!(explicit.len(), 1);
    assert_eq!(explicit[0].record.campaign_id.get(), 1);
}
