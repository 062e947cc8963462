//! Utilization sampling across a workload's pods
//!
//! Each pod serves a plain-text exposition on `:9394/metrics`. A sample is
//! the ratio of the summed "current" metric to the summed "max" metric over
//! every pod that answered and has warmed up, expressed as a percentage.

use crate::error::ScalerError;
use crate::metrics::Metrics;
use crate::orchestrator::OrchestratorClient;
use anyhow::Context;
use futures_util::future::join_all;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Port every pod serves its metrics on
pub const METRICS_PORT: u16 = 9394;

/// Path of the text exposition on each pod
pub const METRICS_PATH: &str = "/metrics";

/// Result of one sampling tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    /// Aggregate utilization percentage
    Usage(f64),
    /// No pod contributed (no endpoints, all failed, or none warmed up)
    NoData,
}

impl Sample {
    pub fn usage(&self) -> Option<f64> {
        match self {
            Sample::Usage(pct) => Some(*pct),
            Sample::NoData => None,
        }
    }
}

/// Parse a text exposition into a name → raw value map.
///
/// Comment lines (`#`) and blank lines are skipped, as is any line that does
/// not consist of exactly two whitespace-separated tokens. Later duplicates win.
pub fn parse_exposition(body: &str) -> HashMap<String, String> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            match (tokens.next(), tokens.next(), tokens.next()) {
                (Some(name), Some(value), None) => Some((name.to_string(), value.to_string())),
                _ => None,
            }
        })
        .collect()
}

/// Value of `name` in a parsed exposition; missing, unparsable, non-finite or
/// negative reads as 0
fn metric_value(metrics: &HashMap<String, String>, name: &str) -> f64 {
    metrics
        .get(name)
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .unwrap_or(0.0)
}

/// Scrapes pod metrics and aggregates them into a utilization percentage
pub struct MetricsSampler<C: OrchestratorClient> {
    client: Arc<C>,
    http: reqwest::Client,
    port: u16,
    metrics: Metrics,
}

impl<C: OrchestratorClient> MetricsSampler<C> {
    /// Create a sampler scraping the standard metrics port
    pub fn new(client: Arc<C>, scrape_timeout: Duration) -> anyhow::Result<Self> {
        Self::with_port(client, METRICS_PORT, scrape_timeout)
    }

    /// Create a sampler scraping pods on a custom port
    pub fn with_port(client: Arc<C>, port: u16, scrape_timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(scrape_timeout)
            .build()
            .context("Failed to build scrape HTTP client")?;

        Ok(Self {
            client,
            http,
            port,
            metrics: Metrics,
        })
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    /// Sample the aggregate utilization of `workload`.
    ///
    /// Pods whose max metric is exactly 0 have not warmed up and are left out
    /// of both sums. A pod that cannot be scraped is logged and left out too.
    pub async fn sample_percent_usage(
        &self,
        workload: &str,
        current_metric_name: &str,
        max_metric_name: &str,
    ) -> Sample {
        let pods = match self.client.endpoints(workload).await {
            Ok(pods) => pods,
            Err(e) => {
                warn!(workload = %workload, error = %e, "Failed to resolve pod endpoints");
                self.metrics.record_error("endpoints", workload);
                return Sample::NoData;
            }
        };

        let scrapes = join_all(pods.iter().map(|pod| self.scrape(*pod))).await;

        let mut total_consumed = 0.0;
        let mut total_max = 0.0;
        let mut included = 0usize;

        for (pod, scrape) in pods.iter().zip(scrapes) {
            let exposition = match scrape {
                Ok(exposition) => exposition,
                Err(e) => {
                    warn!(workload = %workload, pod = %pod, error = %e, "Skipping pod in sample");
                    self.metrics.record_scrape_failure(workload, &pod.to_string());
                    continue;
                }
            };

            let max = metric_value(&exposition, max_metric_name);
            if max == 0.0 {
                debug!(workload = %workload, pod = %pod, "Pod not warmed up, skipping");
                continue;
            }

            total_consumed += metric_value(&exposition, current_metric_name);
            total_max += max;
            included += 1;
        }

        if total_max == 0.0 {
            debug!(
                workload = %workload,
                pods = pods.len(),
                "No eligible pods, sample skipped"
            );
            return Sample::NoData;
        }

        let usage = total_consumed / total_max * 100.0;
        self.metrics.record_sample(workload, usage, included);
        Sample::Usage(usage)
    }

    async fn scrape(&self, pod: IpAddr) -> Result<HashMap<String, String>, ScalerError> {
        let url = format!("http://{}{}", SocketAddr::new(pod, self.port), METRICS_PATH);
        let scrape_error = |message: String| ScalerError::Scrape {
            pod: pod.to_string(),
            message,
        };

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| scrape_error(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(scrape_error(format!("unexpected status {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| scrape_error(format!("failed to read body: {}", e)))?;

        Ok(parse_exposition(&body))
    }
}
