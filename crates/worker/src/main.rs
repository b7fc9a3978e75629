//! Worker entry point.

use tokio::signal;
use worker::{Config, DetachedActivities, WorkerError, telemetry};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = signal::ctrl_c() => {
                result?;
                tracing::info!("received SIGINT, starting graceful shutdown");
            }
            _ = terminate.recv() => {
                tracing::info!("received SIGTERM, starting graceful shutdown");
            }
        }
        Ok(())
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await?;
        tracing::info!("received SIGINT, starting graceful shutdown");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), WorkerError> {
    let config = Config::from_env()?;
    telemetry::init_tracing(&config);
    tracing::info!(metrics_addr = %config.metrics_addr, "starting worker");

    // No collaborator adapters are linked into this binary.
    worker::run(config, DetachedActivities, shutdown_signal()).await?;

    tracing::info!("worker shut down gracefully");
    Ok(())
}
