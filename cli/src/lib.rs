//! Fundwatch command-line shell.
//!
//! This is the thin binary layer that parses arguments, sets up logging and
//! signal handling, and wires the library crates together. Scan logic lives
//! in the `crates/` directory.

pub mod import;
pub mod notify;
pub mod shutdown;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fundwatch_browser::{BrowserManager, ChromiumLauncher, ManagerSettings};
use fundwatch_core::AppConfig;
use fundwatch_db::{campaigns, scan_failures, Database, StoredFailure};
use fundwatch_scanner::{ApiAdapter, BrowserAdapter, RunSummary, ScanOrchestrator, ScanRequest};
use notify::WebhookNotifier;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Parser)]
#[command(name = "fundwatch")]
#[command(about = "Scan fundraising campaigns and record their totals")]
#[command(version)]
pub struct Cli {
    /// Config file path (defaults to the XDG config location)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan the campaigns of a collection
    Scan {
        /// Collection to scan
        #[arg(long)]
        collection: String,
        /// First position (0-based) in the id-sorted list
        #[arg(long, default_value = "0")]
        start: usize,
        /// Stop before this position
        #[arg(long)]
        end: Option<usize>,
        /// Skip campaigns that were scanned before
        #[arg(long)]
        only_unfetched: bool,
        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the failures of a run
    Failures {
        /// Run to report on (defaults to the latest run with failures)
        #[arg(long)]
        run_id: Option<String>,
    },

    /// Seed a collection from a CSV file of `id,link` lines
    Import {
        /// Collection to add the campaigns to
        #[arg(long)]
        collection: String,
        /// CSV file
        file: PathBuf,
    },
}

/// Initialize tracing subscriber for logging
pub fn init_tracing(quiet: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default = if quiet { "warn" } else { "info,fundwatch=debug" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

/// Execute a parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load_with_env(cli.config.as_deref()).context("failed to load config")?;

    match cli.command {
        Commands::Scan {
            collection,
            start,
            end,
            only_unfetched,
            json,
        } => {
            let request = ScanRequest {
                collection,
                start,
                end,
                only_unfetched,
            };
            let summary = scan(&config, &request).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{summary}");
            }
        }
        Commands::Failures { run_id } => {
            let failures = list_failures(&config, run_id).await?;
            if failures.is_empty() {
                println!("No failures recorded.");
            }
            for failure in failures {
                println!(
                    "{} [{}] #{} {}: {}",
                    failure.record.failed_at.format("%Y-%m-%d %H:%M:%S"),
                    failure.collection,
                    failure.record.campaign_id,
                    failure.record.url.as_deref().unwrap_or("-"),
                    failure.record.reason
                );
            }
        }
        Commands::Import { collection, file } => {
            let written = import_campaigns(&config, &collection, &file).await?;
            println!("Imported {written} campaign(s) into '{collection}'.");
        }
    }
    Ok(())
}

async fn open_database(config: &AppConfig) -> Result<Database> {
    let path = config.database.resolved_path()?;
    tracing::debug!("Using database {}", path.display());
    Database::open(&path)
        .await
        .with_context(|| format!("failed to open database {}", path.display()))
}

/// Run one scan with both platform adapters and the configured notifier.
pub async fn scan(config: &AppConfig, request: &ScanRequest) -> Result<RunSummary> {
    let db = Arc::new(open_database(config).await?);
    let notifier = WebhookNotifier::from_config(&config.notifications);

    let token = CancellationToken::new();
    shutdown::install(
        token.clone(),
        Duration::from_secs(config.shutdown.grace_period_secs),
    );

    let manager = Arc::new(BrowserManager::new(
        ChromiumLauncher::new(&config.browser),
        ManagerSettings::from_config(&config.browser),
    ));
    let browser = Arc::new(BrowserAdapter::new(
        manager.clone(),
        config.selectors.clone(),
        config.browser.selector_timeout_ms,
    ));
    let api = Arc::new(ApiAdapter::new(&config.api)?);

    let mut orchestrator = ScanOrchestrator::new(
        db.clone(),
        config.rate_limit.clone(),
        config.retry.clone(),
        token,
    )
    .with_adapter(browser)
    .with_adapter(api);

    notifier
        .notify(&format!("Scan of '{}' started", request.collection))
        .await;

    if let Err(e) = manager.warm_up().await {
        notifier
            .notify(&format!("Scan of '{}' aborted: {e}", request.collection))
            .await;
        manager.shutdown().await;
        return Err(e).context("failed to launch the browser pool");
    }

    let outcome = orchestrator.run(request).await;
    manager.shutdown().await;

    match outcome {
        Ok(summary) => {
            notifier.notify(&summary.to_string()).await;
            Ok(summary)
        }
        Err(e) => {
            notifier
                .notify(&format!("Scan of '{}' aborted: {e}", request.collection))
                .await;
            Err(e).context("scan aborted")
        }
    }
}

/// Failures of `run_id`, or of the latest run that had any.
pub async fn list_failures(
    config: &AppConfig,
    run_id: Option<String>,
) -> Result<Vec<StoredFailure>> {
    let db = open_database(config).await?;
    let run_id = match run_id {
        Some(id) => Some(id),
        None => scan_failures::latest_run_id(db.pool()).await?,
    };
    let failures = match run_id {
        Some(id) => scan_failures::list_failures(db.pool(), &id).await?,
        None => Vec::new(),
    };
    db.close().await;
    Ok(failures)
}

/// Insert the campaigns of a CSV file; returns the number of rows written.
pub async fn import_campaigns(
    config: &AppConfig,
    collection: &str,
    file: &std::path::Path,
) -> Result<u64> {
    let parsed = import::read_campaign_csv(file)?;
    let db = open_database(config).await?;
    let written = campaigns::insert_campaigns(db.pool(), collection, &parsed).await?;
    tracing::info!("Imported {} campaign(s) into '{}'", written, collection);
    db.close().await;
    Ok(written)
}
