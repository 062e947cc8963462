//! Metric Scaler - scales workloads on a custom utilization metric
//!
//! Each watched workload gets a `Watcher` that scrapes two counters from
//! every pod's metrics endpoint, keeps a rolling window of the aggregate
//! utilization, and moves the replica count one step at a time towards the
//! target configured in the workload's annotations.

pub mod annotations;
pub mod buffer;
pub mod config;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod policy;
pub mod sampler;
pub mod watcher;

pub use annotations::WatcherConfig;
pub use buffer::RollingBuffer;
pub use config::Config;
pub use error::ScalerError;
pub use metrics::Metrics;
pub use orchestrator::{KubeHttpClient, OrchestratorClient, ReplicaSpec};
pub use policy::desired_replicas;
pub use sampler::{MetricsSampler, Sample};
pub use watcher::{ScaleOutcome, Watcher, WatcherHandle, WatcherOptions, WatcherState};
