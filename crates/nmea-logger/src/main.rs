//! NMEA Logger Daemon - Main Entry Point

use anyhow::Context;
use nmea_logger::{init_logging, LoggerConfig, Pipeline};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    info!("=== NMEA Logger v{} ===", env!("CARGO_PKG_VERSION"));

    let config = LoggerConfig::load().context("loading configuration")?;
    info!(
        host = %config.host,
        port = config.port,
        storage_path = %config.storage_path.display(),
        "starting ingestion"
    );

    let pipeline = Pipeline::new(config)
        .await
        .context("opening telemetry store")?;
    // A storage fault that survives its retries propagates here; the non-zero
    // exit lets the service manager restart us with a clean slate.
    let stats = pipeline.run(shutdown_signal()).await?;
    info!(?stats, "graceful shutdown");
    Ok(())
}

/// Resolves on ctrl-c or, on unix, SIGTERM (what the service manager sends).
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
