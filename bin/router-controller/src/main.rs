use anyhow::Result;
use kube::Client;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod metrics;
mod network_controller;
mod server;

use config::ControllerConfig;
use metrics::ControllerMetrics;
use network_controller::ContextData;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting gerrit-router-controller...");

    let config = ControllerConfig::from_env()?;
    let metrics = Arc::new(ControllerMetrics::new()?);
    let client = Client::try_default().await?;

    let metrics_addr = config.metrics_addr;
    let server_metrics = metrics.clone();
    tokio::spawn(async move {
        if let Err(e) = server::serve(metrics_addr, server_metrics).await {
            error!("Metrics server error: {}", e);
        }
    });

    let ctx = ContextData::new(client, config, metrics);
    tokio::spawn(async move {
        if let Err(e) = network_controller::run(ctx).await {
            error!("GerritNetwork controller error: {}", e);
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting...");

    Ok(())
}
