//! Shared test fixtures: an in-memory orchestrator

#![allow(dead_code)]

use async_trait::async_trait;
use metric_scaler::annotations;
use metric_scaler::error::Result;
use metric_scaler::{OrchestratorClient, ReplicaSpec};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub struct FakeOrchestrator {
    pub annotations: Mutex<HashMap<String, String>>,
    pub replicas: Mutex<u32>,
    pub pods: Mutex<usize>,
    pub scale_calls: Mutex<Vec<u32>>,
    pub endpoint_lookups: AtomicUsize,
}

impl FakeOrchestrator {
    /// A workload with `replicas` running pods and a complete scaling config
    pub fn new(replicas: u32) -> Self {
        Self {
            annotations: Mutex::new(complete_annotations()),
            replicas: Mutex::new(replicas),
            pods: Mutex::new(replicas as usize),
            scale_calls: Mutex::new(Vec::new()),
            endpoint_lookups: AtomicUsize::new(0),
        }
    }

    pub fn scale_calls(&self) -> Vec<u32> {
        self.scale_calls.lock().unwrap().clone()
    }

    pub fn endpoint_lookups(&self) -> usize {
        self.endpoint_lookups.load(Ordering::SeqCst)
    }
}

pub fn complete_annotations() -> HashMap<String, String> {
    [
        (annotations::CURRENT_METRIC_NAME, "puma_busy_threads"),
        (annotations::MAX_METRIC_NAME, "puma_max_threads"),
        (annotations::MAX_REPLICAS, "4"),
        (annotations::MIN_REPLICAS, "1"),
        (annotations::TARGET_USAGE_PCT, "50"),
        (annotations::SCALE_THRESHOLD_PCT, "10"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

#[async_trait]
impl OrchestratorClient for FakeOrchestrator {
    async fn annotations(&self, _workload: &str) -> Result<HashMap<String, String>> {
        Ok(self.annotations.lock().unwrap().clone())
    }

    async fn replica_spec(&self, _workload: &str) -> Result<ReplicaSpec> {
        Ok(ReplicaSpec {
            replicas: *self.replicas.lock().unwrap(),
        })
    }

    async fn scale(&self, _workload: &str, desired: u32) -> Result<()> {
        *self.replicas.lock().unwrap() = desired;
        *self.pods.lock().unwrap() = desired as usize;
        self.scale_calls.lock().unwrap().push(desired);
        Ok(())
    }

    async fn endpoints(&self, _workload: &str) -> Result<Vec<IpAddr>> {
        self.endpoint_lookups.fetch_add(1, Ordering::SeqCst);
        let pods = *self.pods.lock().unwrap();
        Ok(vec![IpAddr::V4(Ipv4Addr::LOCALHOST); pods])
    }
}
