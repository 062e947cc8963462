//! Metrics for the metric scaler
//!
//! Recorded through structured logging; each call carries the workload name
//! so samples and scale actions can be correlated per workload.

use std::time::Duration;
use tracing::{debug, info};

/// Metrics recorder shared by the sampler and the watcher
#[derive(Debug, Clone, Copy, Default)]
pub struct Metrics;

impl Metrics {
    /// Record an aggregated utilization sample
    pub fn record_sample(&self, workload: &str, usage_pct: f64, pods: usize) {
        debug!(
            workload = %workload,
            usage_pct = usage_pct,
            pods = pods,
            "Recorded utilization sample"
        );
    }

    /// Record a pod that could not be scraped
    pub fn record_scrape_failure(&self, workload: &str, pod: &str) {
        info!(workload = %workload, pod = %pod, "Recorded scrape failure");
    }

    /// Record a scale decision that changed the replica count
    pub fn record_scale(&self, workload: &str, direction: &str, from: u32, to: u32) {
        info!(
            workload = %workload,
            direction = %direction,
            from = from,
            to = to,
            "Recorded scale action"
        );
    }

    /// Record how long the workload took to reach the requested pod count
    pub fn record_convergence(&self, workload: &str, replicas: u32, waited: Duration) {
        info!(
            workload = %workload,
            replicas = replicas,
            waited_ms = waited.as_millis() as u64,
            "Recorded convergence"
        );
    }

    /// Record a workload whose annotations do not form a complete config
    pub fn record_unconfigured(&self, workload: &str) {
        info!(workload = %workload, "Recorded unconfigured workload");
    }

    /// Record processing error
    pub fn record_error(&self, error_type: &str, workload: &str) {
        info!(
            error_type = %error_type,
            workload = %workload,
            "Recorded error"
        );
    }
}
