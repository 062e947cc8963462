//! Per-workload watcher: sampling loop, scale decision and convergence wait
//!
//! A `Watcher` owns its configuration and sample window outright. `start()`
//! moves it into a single tokio task and hands back a `WatcherHandle`; the
//! only state shared with the handle is the cancellation token and the
//! `scaling_allowed` flag. `WatcherHandle::stop()` joins the task and returns
//! the watcher, so nothing can scale the workload after it returns.

use crate::annotations::{Incomplete, WatcherConfig};
use crate::buffer::{RollingBuffer, MAX_SAMPLES};
use crate::error::{Result, ScalerError};
use crate::metrics::Metrics;
use crate::orchestrator::OrchestratorClient;
use crate::policy::{desired_replicas, ScaleDirection};
use crate::sampler::{MetricsSampler, Sample};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Timing and safety knobs of a watcher
#[derive(Debug, Clone)]
pub struct WatcherOptions {
    /// Pause between samples, and between pod-count polls while converging
    pub tick: Duration,
    /// Samples taken per window; one scale decision is made per window
    pub samples_per_window: usize,
    /// Upper bound on the convergence wait, unbounded when `None`
    pub convergence_timeout: Option<Duration>,
    /// Log decisions without issuing scale requests
    pub dry_run: bool,
}

impl Default for WatcherOptions {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            samples_per_window: MAX_SAMPLES,
            convergence_timeout: None,
            dry_run: false,
        }
    }
}

/// What a call to `scale_to_desired_replicas` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleOutcome {
    NotConfigured,
    NoSamples,
    Unchanged { replicas: u32 },
    DryRun { from: u32, to: u32 },
    Scaled { from: u32, to: u32 },
}

/// Lifecycle state of a watcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Unconfigured,
    Configured,
    Running,
    Stopped,
}

/// Autoscaling watcher for a single workload
pub struct Watcher<C: OrchestratorClient> {
    workload: String,
    client: Arc<C>,
    sampler: MetricsSampler<C>,
    options: WatcherOptions,
    config: Option<WatcherConfig>,
    buffer: RollingBuffer,
    scaling_allowed: Arc<AtomicBool>,
    cancel: CancellationToken,
    incomplete_reported: bool,
    metrics: Metrics,
}

impl<C: OrchestratorClient> Watcher<C> {
    /// Create a watcher for `workload`, using the sampler's orchestration client
    pub fn new(
        workload: impl Into<String>,
        sampler: MetricsSampler<C>,
        options: WatcherOptions,
    ) -> Self {
        let buffer = RollingBuffer::with_capacity(options.samples_per_window.max(1));
        Self {
            workload: workload.into(),
            client: sampler.client().clone(),
            sampler,
            options,
            config: None,
            buffer,
            scaling_allowed: Arc::new(AtomicBool::new(false)),
            cancel: CancellationToken::new(),
            incomplete_reported: false,
            metrics: Metrics,
        }
    }

    pub fn workload(&self) -> &str {
        &self.workload
    }

    pub fn config(&self) -> Option<&WatcherConfig> {
        self.config.as_ref()
    }

    pub fn buffer(&self) -> &RollingBuffer {
        &self.buffer
    }

    pub fn options(&self) -> &WatcherOptions {
        &self.options
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    /// Whether the watcher currently holds a complete configuration
    pub fn scaling_allowed(&self) -> bool {
        self.scaling_allowed.load(Ordering::Acquire)
    }

    /// State of a watcher that is not running its loop
    pub fn state(&self) -> WatcherState {
        if self.cancel.is_cancelled() {
            WatcherState::Stopped
        } else if self.is_configured() {
            WatcherState::Configured
        } else {
            WatcherState::Unconfigured
        }
    }

    /// Re-read the workload annotations and rebuild the configuration.
    ///
    /// Returns whether the workload is configured afterwards. An incomplete
    /// config is logged once per detection, not on every call.
    pub async fn configure(&mut self) -> bool {
        let next = match self.client.annotations(&self.workload).await {
            Ok(annotations) => WatcherConfig::from_annotations(&annotations),
            Err(e) => {
                warn!(workload = %self.workload, error = %e, "Failed to read workload annotations");
                self.metrics.record_error("annotations", &self.workload);
                Err(Incomplete::Unreadable(e.to_string()))
            }
        };

        match next {
            Ok(config) => {
                if self.config.as_ref() != Some(&config) {
                    info!(
                        workload = %self.workload,
                        current_metric = %config.current_metric_name,
                        max_metric = %config.max_metric_name,
                        min_replicas = config.min_replicas,
                        max_replicas = config.max_replicas,
                        target_usage_pct = config.target_usage_pct,
                        scale_threshold_pct = config.scale_threshold_pct,
                        "Workload configured"
                    );
                }
                self.config = Some(config);
                self.incomplete_reported = false;
                self.scaling_allowed.store(true, Ordering::Release);
                true
            }
            Err(reason) => {
                if !self.incomplete_reported {
                    warn!(
                        workload = %self.workload,
                        reason = %reason,
                        "Workload configuration incomplete, scaling suspended"
                    );
                    self.metrics.record_unconfigured(&self.workload);
                    self.incomplete_reported = true;
                }
                self.config = None;
                self.scaling_allowed.store(false, Ordering::Release);
                false
            }
        }
    }

    /// Take one utilization sample and push it into the window.
    ///
    /// Ticks without data (no eligible pods) are not pushed.
    pub async fn sample(&mut self) -> Sample {
        let Some(config) = &self.config else {
            return Sample::NoData;
        };

        let sample = self
            .sampler
            .sample_percent_usage(
                &self.workload,
                &config.current_metric_name,
                &config.max_metric_name,
            )
            .await;

        if let Sample::Usage(usage) = sample {
            self.buffer.push(usage);
        }
        sample
    }

    /// Move the replica count one step towards the target and wait for it.
    ///
    /// Blocks until the number of pod endpoints equals the new replica count.
    /// The wait is unbounded unless `convergence_timeout` is set, and ends
    /// early with `ScalerError::Cancelled` once the watcher is stopped.
    pub async fn scale_to_desired_replicas(&self) -> Result<ScaleOutcome> {
        let Some(config) = &self.config else {
            return Ok(ScaleOutcome::NotConfigured);
        };
        let Some(average) = self.buffer.mean() else {
            debug!(workload = %self.workload, "No samples yet, skipping scale decision");
            return Ok(ScaleOutcome::NoSamples);
        };

        let current = self.client.replica_spec(&self.workload).await?.replicas;
        let desired = desired_replicas(
            current,
            average,
            config.target_usage_pct,
            config.scale_threshold_pct,
            config.min_replicas,
            config.max_replicas,
        );

        if desired == current {
            debug!(
                workload = %self.workload,
                replicas = current,
                average_usage_pct = average,
                "Replica count unchanged"
            );
            return Ok(ScaleOutcome::Unchanged { replicas: current });
        }

        let direction = ScaleDirection::between(current, desired);
        if self.options.dry_run {
            info!(
                workload = %self.workload,
                direction = direction.as_str(),
                from = current,
                to = desired,
                average_usage_pct = average,
                "Scale recommendation (dry-run mode)"
            );
            return Ok(ScaleOutcome::DryRun {
                from: current,
                to: desired,
            });
        }

        if self.cancel.is_cancelled() {
            return Err(ScalerError::Cancelled {
                workload: self.workload.clone(),
            });
        }

        info!(
            workload = %self.workload,
            direction = direction.as_str(),
            from = current,
            to = desired,
            average_usage_pct = average,
            target_usage_pct = config.target_usage_pct,
            "Scaling workload"
        );
        self.client.scale(&self.workload, desired).await?;
        self.metrics
            .record_scale(&self.workload, direction.as_str(), current, desired);

        let waited = self
            .wait_for_pods(desired, self.options.convergence_timeout)
            .await?;
        self.metrics.record_convergence(&self.workload, desired, waited);

        Ok(ScaleOutcome::Scaled {
            from: current,
            to: desired,
        })
    }

    /// Poll the pod count every tick until it equals `desired`.
    ///
    /// A failed endpoint lookup is not an observation: it is logged and
    /// polled again on the next tick. Returns the time spent waiting.
    pub async fn wait_for_pods(&self, desired: u32, timeout: Option<Duration>) -> Result<Duration> {
        let started = Instant::now();
        let mut observed = None;
        loop {
            match self.client.endpoints(&self.workload).await {
                Ok(pods) => {
                    if pods.len() == desired as usize {
                        info!(
                            workload = %self.workload,
                            replicas = desired,
                            waited_ms = started.elapsed().as_millis() as u64,
                            "Workload converged"
                        );
                        return Ok(started.elapsed());
                    }
                    observed = Some(pods.len());
                    debug!(
                        workload = %self.workload,
                        desired = desired,
                        observed = pods.len(),
                        "Waiting for pods to converge"
                    );
                }
                Err(e) => {
                    warn!(workload = %self.workload, error = %e, "Failed to poll pod endpoints");
                    self.metrics.record_error("endpoints", &self.workload);
                }
            }

            if let Some(limit) = timeout {
                if started.elapsed() >= limit {
                    // Last successful count, or 0 if every lookup failed
                    return Err(ScalerError::ConvergenceTimeout {
                        workload: self.workload.clone(),
                        desired,
                        observed: observed.unwrap_or(0),
                        waited: started.elapsed(),
                    });
                }
            }

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    return Err(ScalerError::Cancelled {
                        workload: self.workload.clone(),
                    });
                }
                _ = tokio::time::sleep(self.options.tick) => {}
            }
        }
    }

    /// Scale decision at the end of a window.
    ///
    /// After a scale the window is emptied, so the next decision only sees
    /// samples taken at the new replica count.
    async fn decision_tick(&mut self) -> Result<ScaleOutcome> {
        let outcome = self.scale_to_desired_replicas().await?;
        if let ScaleOutcome::Scaled { .. } = outcome {
            self.buffer.clear();
        }
        Ok(outcome)
    }

    /// Run the sampling loop until cancelled or the workload loses its config
    async fn run(&mut self) {
        let cancel = self.cancel.clone();
        info!(
            workload = %self.workload,
            samples_per_window = self.options.samples_per_window,
            tick_ms = self.options.tick.as_millis() as u64,
            "Watcher started"
        );

        'watch: while !cancel.is_cancelled() {
            if !self.configure().await {
                warn!(workload = %self.workload, "Workload not configured, watcher exiting");
                break;
            }

            for _ in 0..self.options.samples_per_window {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break 'watch,
                    _ = self.sample() => {}
                }
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break 'watch,
                    _ = tokio::time::sleep(self.options.tick) => {}
                }
            }

            match self.decision_tick().await {
                Ok(outcome) => {
                    debug!(workload = %self.workload, outcome = ?outcome, "Decision tick")
                }
                Err(ScalerError::Cancelled { .. }) => break,
                Err(e) => {
                    error!(workload = %self.workload, error = %e, "Scale decision failed");
                    self.metrics.record_error("scale", &self.workload);
                }
            }
        }

        self.scaling_allowed.store(false, Ordering::Release);
        info!(workload = %self.workload, "Watcher finished");
    }
}

impl<C: OrchestratorClient + 'static> Watcher<C> {
    /// Spawn the watch loop on the current tokio runtime
    pub fn start(mut self) -> WatcherHandle<C> {
        if self.cancel.is_cancelled() {
            // A watcher handed back by `stop()` gets a fresh token
            self.cancel = CancellationToken::new();
        }
        let workload = self.workload.clone();
        let cancel = self.cancel.clone();
        let scaling_allowed = self.scaling_allowed.clone();

        let task = tokio::spawn(async move {
            let mut watcher = self;
            watcher.run().await;
            watcher
        });

        WatcherHandle {
            workload,
            cancel,
            scaling_allowed,
            task,
        }
    }
}

/// Handle to a running watcher
pub struct WatcherHandle<C: OrchestratorClient> {
    workload: String,
    cancel: CancellationToken,
    scaling_allowed: Arc<AtomicBool>,
    task: JoinHandle<Watcher<C>>,
}

impl<C: OrchestratorClient> WatcherHandle<C> {
    pub fn workload(&self) -> &str {
        &self.workload
    }

    pub fn scaling_allowed(&self) -> bool {
        self.scaling_allowed.load(Ordering::Acquire)
    }

    /// Whether the watch loop has exited (stopped or lost its config)
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn state(&self) -> WatcherState {
        if self.task.is_finished() {
            WatcherState::Stopped
        } else {
            WatcherState::Running
        }
    }

    /// Signal the loop to finish and wait for it to exit.
    ///
    /// The watcher is returned inert: its loop has exited and it will issue
    /// no further requests unless started again.
    pub async fn stop(self) -> Result<Watcher<C>> {
        self.cancel.cancel();
        self.task.await.map_err(|e| ScalerError::Task {
            workload: self.workload.clone(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations;
    use crate::orchestrator::ReplicaSpec;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeState {
        annotations: HashMap<String, String>,
        replicas: u32,
        pods: usize,
        scale_calls: Vec<u32>,
        converge: bool,
        fail_annotations: bool,
        fail_endpoints: bool,
    }

    #[derive(Default)]
    struct FakeOrchestrator {
        state: Mutex<FakeState>,
    }

    impl FakeOrchestrator {
        fn configured(replicas: u32, converge: bool) -> Self {
            let annotations = [
                (annotations::CURRENT_METRIC_NAME, "busy"),
                (annotations::MAX_METRIC_NAME, "max"),
                (annotations::MAX_REPLICAS, "5"),
                (annotations::MIN_REPLICAS, "1"),
                (annotations::TARGET_USAGE_PCT, "50"),
                (annotations::SCALE_THRESHOLD_PCT, "10"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

            Self {
                state: Mutex::new(FakeState {
                    annotations,
                    replicas,
                    pods: replicas as usize,
                    scale_calls: Vec::new(),
                    converge,
                    ..FakeState::default()
                }),
            }
        }

        fn scale_calls(&self) -> Vec<u32> {
            self.state.lock().unwrap().scale_calls.clone()
        }
    }

    #[async_trait]
    impl OrchestratorClient for FakeOrchestrator {
        async fn annotations(&self, workload: &str) -> Result<HashMap<String, String>> {
            let state = self.state.lock().unwrap();
            if state.fail_annotations {
                return Err(ScalerError::orchestrator(workload, "connection refused"));
            }
            Ok(state.annotations.clone())
        }

        async fn replica_spec(&self, _workload: &str) -> Result<ReplicaSpec> {
            Ok(ReplicaSpec {
                replicas: self.state.lock().unwrap().replicas,
            })
        }

        async fn scale(&self, _workload: &str, desired: u32) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            state.replicas = desired;
            state.scale_calls.push(desired);
            if state.converge {
                state.pods = desired as usize;
            }
            Ok(())
        }

        async fn endpoints(&self, workload: &str) -> Result<Vec<IpAddr>> {
            let state = self.state.lock().unwrap();
            if state.fail_endpoints {
                return Err(ScalerError::orchestrator(workload, "connection refused"));
            }
            Ok(vec![IpAddr::V4(Ipv4Addr::LOCALHOST); state.pods])
        }
    }

    fn test_options() -> WatcherOptions {
        WatcherOptions {
            tick: Duration::from_millis(5),
            samples_per_window: 3,
            convergence_timeout: None,
            dry_run: false,
        }
    }

    fn watcher(
        client: Arc<FakeOrchestrator>,
        options: WatcherOptions,
    ) -> Watcher<FakeOrchestrator> {
        // Port 9 (discard) is never served in tests; these watchers do not scrape
        let sampler = MetricsSampler::with_port(client, 9, Duration::from_millis(50)).unwrap();
        Watcher::new("web", sampler, options)
    }

    #[tokio::test]
    async fn test_configure_is_idempotent() {
        let client = Arc::new(FakeOrchestrator::configured(3, true));
        let mut watcher = watcher(client, test_options());

        assert!(!watcher.scaling_allowed());
        assert_eq!(watcher.state(), WatcherState::Unconfigured);
        assert!(watcher.configure().await);
        assert_eq!(watcher.state(), WatcherState::Configured);
        let first = watcher.config().cloned();
        assert!(watcher.configure().await);

        assert_eq!(watcher.config().cloned(), first);
        assert!(watcher.scaling_allowed());
    }

    #[tokio::test]
    async fn test_configure_reflects_live_edits() {
        let client = Arc::new(FakeOrchestrator::configured(3, true));
        let mut watcher = watcher(client.clone(), test_options());
        assert!(watcher.configure().await);

        client
            .state
            .lock()
            .unwrap()
            .annotations
            .remove(annotations::TARGET_USAGE_PCT);
        assert!(!watcher.configure().await);
        assert!(!watcher.is_configured());
        assert!(!watcher.scaling_allowed());

        client
            .state
            .lock()
            .unwrap()
            .annotations
            .insert(annotations::TARGET_USAGE_PCT.to_string(), "70".to_string());
        assert!(watcher.configure().await);
        assert_eq!(watcher.config().unwrap().target_usage_pct, 70);
    }

    #[tokio::test]
    async fn test_unreadable_annotations_suspend_scaling() {
        let client = Arc::new(FakeOrchestrator::configured(3, true));
        let mut watcher = watcher(client.clone(), test_options());
        assert!(watcher.configure().await);
        assert!(watcher.scaling_allowed());

        client.state.lock().unwrap().fail_annotations = true;
        assert!(!watcher.configure().await);
        assert!(!watcher.scaling_allowed());
        assert_eq!(watcher.state(), WatcherState::Unconfigured);
    }

    #[tokio::test]
    async fn test_scale_noop_when_unconfigured() {
        let client = Arc::new(FakeOrchestrator::default());
        let mut watcher = watcher(client.clone(), test_options());
        watcher.buffer.push(95.0);

        assert!(!watcher.configure().await);
        let outcome = watcher.scale_to_desired_replicas().await.unwrap();
        assert_eq!(outcome, ScaleOutcome::NotConfigured);
        assert!(client.scale_calls().is_empty());
    }

    #[tokio::test]
    async fn test_scale_needs_samples() {
        let client = Arc::new(FakeOrchestrator::configured(3, true));
        let mut watcher = watcher(client, test_options());
        watcher.configure().await;

        let outcome = watcher.scale_to_desired_replicas().await.unwrap();
        assert_eq!(outcome, ScaleOutcome::NoSamples);
    }

    #[tokio::test]
    async fn test_scale_within_tolerance_is_unchanged() {
        let client = Arc::new(FakeOrchestrator::configured(3, true));
        let mut watcher = watcher(client.clone(), test_options());
        watcher.configure().await;
        watcher.buffer.push(50.0);
        watcher.buffer.push(60.0);

        let outcome = watcher.scale_to_desired_replicas().await.unwrap();
        assert_eq!(outcome, ScaleOutcome::Unchanged { replicas: 3 });
        assert!(client.scale_calls().is_empty());
    }

    #[tokio::test]
    async fn test_scale_up_waits_for_convergence() {
        let client = Arc::new(FakeOrchestrator::configured(3, true));
        let mut watcher = watcher(client.clone(), test_options());
        watcher.configure().await;
        watcher.buffer.push(80.0);

        let outcome = watcher.scale_to_desired_replicas().await.unwrap();
        assert_eq!(outcome, ScaleOutcome::Scaled { from: 3, to: 4 });
        assert_eq!(client.scale_calls(), vec![4]);
    }

    #[tokio::test]
    async fn test_scale_down() {
        let client = Arc::new(FakeOrchestrator::configured(3, true));
        let mut watcher = watcher(client.clone(), test_options());
        watcher.configure().await;
        watcher.buffer.push(10.0);

        let outcome = watcher.scale_to_desired_replicas().await.unwrap();
        assert_eq!(outcome, ScaleOutcome::Scaled { from: 3, to: 2 });
    }

    #[tokio::test]
    async fn test_dry_run_does_not_scale() {
        let client = Arc::new(FakeOrchestrator::configured(3, true));
        let options = WatcherOptions {
            dry_run: true,
            ..test_options()
        };
        let mut watcher = watcher(client.clone(), options);
        watcher.configure().await;
        watcher.buffer.push(90.0);

        let outcome = watcher.scale_to_desired_replicas().await.unwrap();
        assert_eq!(outcome, ScaleOutcome::DryRun { from: 3, to: 4 });
        assert!(client.scale_calls().is_empty());
    }

    #[tokio::test]
    async fn test_bounded_convergence_wait_times_out() {
        let client = Arc::new(FakeOrchestrator::configured(3, false));
        let options = WatcherOptions {
            convergence_timeout: Some(Duration::from_millis(30)),
            ..test_options()
        };
        let mut watcher = watcher(client.clone(), options);
        watcher.configure().await;
        watcher.buffer.push(90.0);

        let err = watcher.scale_to_desired_replicas().await.unwrap_err();
        assert!(matches!(
            err,
            ScalerError::ConvergenceTimeout {
                desired: 4,
                observed: 3,
                ..
            }
        ));
        assert_eq!(client.scale_calls(), vec![4]);
    }

    #[tokio::test]
    async fn test_failed_endpoint_lookup_never_converges() {
        let client = Arc::new(FakeOrchestrator::configured(1, true));
        client.state.lock().unwrap().fail_endpoints = true;
        let watcher = watcher(client, test_options());

        let err = watcher
            .wait_for_pods(0, Some(Duration::from_millis(30)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ScalerError::ConvergenceTimeout {
                desired: 0,
                observed: 0,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_convergence_resumes_after_lookup_failure() {
        let client = Arc::new(FakeOrchestrator::configured(2, true));
        client.state.lock().unwrap().fail_endpoints = true;
        let watcher = watcher(client.clone(), test_options());

        let recover = {
            let client = client.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                client.state.lock().unwrap().fail_endpoints = false;
            })
        };
        let waited = watcher
            .wait_for_pods(2, Some(Duration::from_secs(2)))
            .await
            .unwrap();
        recover.await.unwrap();
        assert!(waited >= Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_window_cleared_after_scale() {
        let client = Arc::new(FakeOrchestrator::configured(3, true));
        let mut watcher = watcher(client.clone(), test_options());
        watcher.configure().await;
        watcher.buffer.push(80.0);
        watcher.buffer.push(90.0);

        let outcome = watcher.decision_tick().await.unwrap();
        assert_eq!(outcome, ScaleOutcome::Scaled { from: 3, to: 4 });
        assert!(watcher.buffer().is_empty());

        // No fresh samples: the next decision is skipped, not repeated
        let outcome = watcher.decision_tick().await.unwrap();
        assert_eq!(outcome, ScaleOutcome::NoSamples);
        assert_eq!(client.scale_calls(), vec![4]);
    }

    #[tokio::test]
    async fn test_window_kept_when_unchanged() {
        let client = Arc::new(FakeOrchestrator::configured(3, true));
        let mut watcher = watcher(client, test_options());
        watcher.configure().await;
        watcher.buffer.push(50.0);

        let outcome = watcher.decision_tick().await.unwrap();
        assert_eq!(outcome, ScaleOutcome::Unchanged { replicas: 3 });
        assert_eq!(watcher.buffer().len(), 1);
    }

    #[tokio::test]
    async fn test_convergence_wait_is_cancellable() {
        let client = Arc::new(FakeOrchestrator::configured(3, false));
        let watcher = watcher(client, test_options());
        let cancel = watcher.cancel.clone();

        let wait = tokio::spawn(async move { watcher.wait_for_pods(4, None).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        let result = wait.await.unwrap();
        assert!(matches!(result, Err(ScalerError::Cancelled { .. })));
    }

    #[tokio::test]
    async fn test_loop_exits_when_unconfigured() {
        let client = Arc::new(FakeOrchestrator::default());
        let handle = watcher(client, test_options()).start();

        tokio::time::timeout(Duration::from_secs(2), async {
            while !handle.is_finished() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("loop should exit without a config");

        assert!(!handle.scaling_allowed());
        assert_eq!(handle.state(), WatcherState::Stopped);
        let watcher = handle.stop().await.unwrap();
        assert!(!watcher.is_configured());
        assert_eq!(watcher.state(), WatcherState::Stopped);
    }
}
