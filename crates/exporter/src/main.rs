//! Kube Summary Exporter
//!
//! Serves Prometheus filesystem metrics (container logs and rootfs, pod
//! ephemeral storage, node image filesystem) translated on every scrape from
//! the kubelet `/stats/summary` endpoint of each node.

use anyhow::{Context, Result};
use clap::Parser;
use exporter_lib::{
    api::{self, AppState},
    source::KubeCluster,
    ExporterMetrics, NodeSelector, Scraper, StructuredLogger,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;

const EXPORTER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let cli = config::Cli::parse();
    let config = config::ExporterConfig::load(&cli)?;
    info!(
        listen_address = %config.listen_address,
        kubeconfig = ?config.kubeconfig,
        "Exporter configured"
    );

    let cluster = KubeCluster::connect(config.kubeconfig.as_deref())
        .await
        .map_err(|e| anyhow::anyhow!(e))
        .context("Cannot create kube client")?;
    let cluster = Arc::new(cluster);

    let logger = StructuredLogger::new(&config.listen_address);
    let selector = NodeSelector::new(cluster.clone(), cluster)
        .with_max_concurrent_fetches(config.max_concurrent_fetches);
    let scraper = Scraper::new(selector, logger.clone());
    let app_state = Arc::new(AppState::new(scraper, ExporterMetrics::new()));

    let bind_address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    logger.log_startup(EXPORTER_VERSION, config.max_concurrent_fetches);

    let shutdown_logger = logger.clone();
    api::serve(listener, app_state, async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        shutdown_logger.log_shutdown("SIGINT received");
    })
    .await
    .context("API server failed")?;

    info!("Shutting down");
    Ok(())
}
