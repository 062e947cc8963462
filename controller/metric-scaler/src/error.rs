//! Error types for the metric scaler

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScalerError {
    #[error("Orchestrator request for workload {workload} failed: {message}")]
    Orchestrator { workload: String, message: String },

    #[error("Metrics scrape of pod {pod} failed: {message}")]
    Scrape { pod: String, message: String },

    #[error(
        "Workload {workload} did not converge to {desired} pods within {waited:?} (observed {observed})"
    )]
    ConvergenceTimeout {
        workload: String,
        desired: u32,
        observed: usize,
        waited: Duration,
    },

    #[error("Watcher for workload {workload} was cancelled")]
    Cancelled { workload: String },

    #[error("Watcher task for workload {workload} failed: {message}")]
    Task { workload: String, message: String },
}

impl ScalerError {
    pub fn orchestrator(workload: &str, message: impl std::fmt::Display) -> Self {
        ScalerError::Orchestrator {
            workload: workload.to_string(),
            message: message.to_string(),
        }
    }
}

pub type Result<T, E = ScalerError> = std::result::Result<T, E>;
