//! Metric Scaler binary - runs one watcher per configured workload

use anyhow::Context;
use metric_scaler::{Config, KubeHttpClient, MetricsSampler, Watcher};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse configuration
    let config = Config::parse_config();

    // Initialize logging
    if config.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    }

    info!("Starting Demon Metric Scaler");
    info!("Configuration:");
    info!("  API server: {}", config.api_server);
    info!("  Namespace: {}", config.namespace);
    info!("  Workloads: {}", config.workloads.join(", "));
    info!("  Metrics port: {}", config.metrics_port);
    info!("  Tick: {}ms x {} samples", config.tick_ms, config.samples_per_window);
    info!("  Dry-run: {}", config.dry_run);

    if config.workloads.is_empty() {
        warn!("No workloads configured, nothing to watch");
        return Ok(());
    }

    let token = match &config.token_path {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read API token from {}", path))?
                .trim()
                .to_string(),
        ),
        None => None,
    };

    let client = Arc::new(KubeHttpClient::new(
        config.api_server.clone(),
        config.namespace.clone(),
        token,
        config.api_timeout_secs,
    )?);

    let mut handles = Vec::with_capacity(config.workloads.len());
    for workload in &config.workloads {
        let sampler = MetricsSampler::with_port(
            client.clone(),
            config.metrics_port,
            config.scrape_timeout(),
        )?;
        let watcher = Watcher::new(workload.clone(), sampler, config.watcher_options());
        info!(workload = %workload, "Starting watcher");
        handles.push(watcher.start());
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received, stopping watchers");

    for handle in handles {
        let workload = handle.workload().to_string();
        match handle.stop().await {
            Ok(_) => info!(workload = %workload, "Watcher stopped"),
            Err(e) => error!(workload = %workload, error = %e, "Watcher failed"),
        }
    }

    info!("Metric scaler exited normally");
    Ok(())
}
