//! Signal handling: graceful stop first, hard exit after a grace period.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Exit code used when the grace period runs out.
pub const FORCED_EXIT_CODE: i32 = 130;

/// Cancel `token` on the first SIGINT/SIGTERM and exit the process if the
/// run has not stopped within `grace`.
pub fn install(token: CancellationToken, grace: Duration) {
    tokio::spawn(async move {
        if let Err(e) = wait_for_signal().await {
            tracing::warn!("Signal handling unavailable: {}", e);
            return;
        }
        tracing::warn!(
            "Shutdown requested; finishing the current campaign (hard exit in {:?})",
            grace
        );
        token.cancel();
        force_exit_after(grace).await;
    });
}

async fn force_exit_after(grace: Duration) {
    tokio::time::sleep(grace).await;
    tracing::error!("Run did not stop within {:?}; exiting", grace);
    std::process::exit(FORCED_EXIT_CODE);
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
