//! Configuration for the metric scaler service

use crate::watcher::WatcherOptions;
use clap::Parser;
use std::env;
use std::time::Duration;

/// Configuration for the metric scaler
#[derive(Debug, Clone, Parser)]
#[command(name = "demon-metric-scaler")]
#[command(about = "Scales workloads on a custom utilization metric scraped from their pods")]
pub struct Config {
    /// Kubernetes API server URL
    #[arg(long, env, default_value = "https://kubernetes.default.svc")]
    pub api_server: String,

    /// Namespace of the watched workloads
    #[arg(long, env, default_value = "default")]
    pub namespace: String,

    /// Path to a bearer token file for the API server
    #[arg(long, env)]
    pub token_path: Option<String>,

    /// Workloads (deployment names) to watch, comma separated
    #[arg(long, env, value_delimiter = ',')]
    pub workloads: Vec<String>,

    /// Port every pod serves its metrics exposition on
    #[arg(long, env, default_value_t = crate::sampler::METRICS_PORT)]
    pub metrics_port: u16,

    /// Sampling tick in milliseconds
    #[arg(long, env, default_value_t = 1000)]
    pub tick_ms: u64,

    /// Samples per decision window
    #[arg(long, env, default_value_t = crate::buffer::MAX_SAMPLES)]
    pub samples_per_window: usize,

    /// Per-pod scrape timeout in seconds
    #[arg(long, env, default_value_t = 5)]
    pub scrape_timeout_secs: u64,

    /// Orchestrator API timeout in seconds
    #[arg(long, env, default_value_t = 10)]
    pub api_timeout_secs: u64,

    /// Give up waiting for pods to converge after this many seconds
    #[arg(long, env)]
    pub convergence_timeout_secs: Option<u64>,

    /// Dry-run mode (log only, no actual scale calls)
    #[arg(long, env)]
    pub dry_run: bool,

    /// Output logs in JSON format
    #[arg(long, env)]
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_server: env::var("API_SERVER")
                .unwrap_or_else(|_| "https://kubernetes.default.svc".to_string()),
            namespace: env::var("NAMESPACE").unwrap_or_else(|_| "default".to_string()),
            token_path: env::var("TOKEN_PATH").ok(),
            workloads: env::var("WORKLOADS")
                .map(|v| {
                    v.split(',')
                        .filter(|w| !w.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
            metrics_port: env::var("METRICS_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(crate::sampler::METRICS_PORT),
            tick_ms: env::var("TICK_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .unwrap_or(1000),
            samples_per_window: env::var("SAMPLES_PER_WINDOW")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(crate::buffer::MAX_SAMPLES),
            scrape_timeout_secs: env::var("SCRAPE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),
            api_timeout_secs: env::var("API_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            convergence_timeout_secs: env::var("CONVERGENCE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok()),
            dry_run: env::var("DRY_RUN")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
            log_json: env::var("LOG_JSON")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
        }
    }
}

impl Config {
    /// Parse configuration from command-line args and environment variables
    pub fn parse_config() -> Self {
        Config::parse()
    }

    /// Watcher timing derived from this configuration
    pub fn watcher_options(&self) -> WatcherOptions {
        WatcherOptions {
            tick: Duration::from_millis(self.tick_ms.max(1)),
            samples_per_window: self.samples_per_window.max(1),
            convergence_timeout: self.convergence_timeout_secs.map(Duration::from_secs),
            dry_run: self.dry_run,
        }
    }

    pub fn scrape_timeout(&self) -> Duration {
        Duration::from_secs(self.scrape_timeout_secs)
    }
}
