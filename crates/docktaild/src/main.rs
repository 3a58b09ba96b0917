//! Docktail Daemon - container log collector

use anyhow::Result;
use clap::Parser;
use docktail_runtime::DockerRuntime;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod monitor;
mod stream;

use cli::Cli;
use monitor::Monitor;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docktaild=info,docktail_logs=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Cli::parse().into_settings()?;
    let runtime = Arc::new(DockerRuntime::connect()?);

    info!(
        containers = ?settings.containers,
        log_path = %settings.log_root.display(),
        limit = settings.limit_bytes,
        "starting container log monitor"
    );

    let mut monitor = Monitor::new(runtime, settings);

    // Set up signal handlers
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;

    tokio::select! {
        _ = monitor.run() => {}
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down...");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down...");
        }
    }

    monitor.shutdown().await;
    info!("Shutdown complete");
    Ok(())
}
