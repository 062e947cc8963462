//! Orchestration client trait and the Kubernetes REST implementation
//!
//! The watcher only needs three reads and one write from the orchestrator.
//! `KubeHttpClient` maps them onto the apps/v1 deployment, its `scale`
//! subresource, and the core/v1 endpoints of the same name.

use crate::error::{Result, ScalerError};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Desired replica count as recorded in the workload spec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicaSpec {
    pub replicas: u32,
}

/// Orchestration client trait - implement this to drive a different orchestrator
#[async_trait]
pub trait OrchestratorClient: Send + Sync {
    /// Current annotations of the workload
    async fn annotations(&self, workload: &str) -> Result<HashMap<String, String>>;

    /// Replica count currently requested in the workload spec
    async fn replica_spec(&self, workload: &str) -> Result<ReplicaSpec>;

    /// Request a new replica count
    async fn scale(&self, workload: &str, desired: u32) -> Result<()>;

    /// Addresses of the pods currently backing the workload
    async fn endpoints(&self, workload: &str) -> Result<Vec<IpAddr>>;
}

#[derive(Debug, Deserialize)]
struct Deployment {
    #[serde(default)]
    metadata: ObjectMeta,
    #[serde(default)]
    spec: DeploymentSpec,
}

#[derive(Debug, Default, Deserialize)]
struct ObjectMeta {
    #[serde(default)]
    annotations: Option<HashMap<String, String>>,
}

#[derive(Debug, Default, Deserialize)]
struct DeploymentSpec {
    #[serde(default)]
    replicas: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct Endpoints {
    #[serde(default)]
    subsets: Option<Vec<EndpointSubset>>,
}

#[derive(Debug, Deserialize)]
struct EndpointSubset {
    #[serde(default)]
    addresses: Option<Vec<EndpointAddress>>,
}

#[derive(Debug, Deserialize)]
struct EndpointAddress {
    ip: String,
}

/// Merge patch sent to the `scale` subresource
#[derive(Debug, Serialize)]
struct ScalePatch {
    spec: ScalePatchSpec,
}

#[derive(Debug, Serialize)]
struct ScalePatchSpec {
    replicas: u32,
}

fn request_failed(workload: &str, e: reqwest::Error) -> ScalerError {
    ScalerError::orchestrator(workload, format!("HTTP request failed: {}", e))
}

/// Kubernetes API client scoped to a single namespace
pub struct KubeHttpClient {
    api_server: String,
    namespace: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl KubeHttpClient {
    /// Create a new Kubernetes API client
    pub fn new(
        api_server: String,
        namespace: String,
        token: Option<String>,
        timeout_secs: u64,
    ) -> anyhow::Result<Self> {
        if !api_server.starts_with("http://") && !api_server.starts_with("https://") {
            anyhow::bail!(
                "Invalid API server address: {}. Must start with http:// or https://",
                api_server
            );
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            api_server: api_server.trim_end_matches('/').to_string(),
            namespace,
            token,
            client,
        })
    }

    fn deployment_url(&self, workload: &str) -> String {
        format!(
            "{}/apis/apps/v1/namespaces/{}/deployments/{}",
            self.api_server, self.namespace, workload
        )
    }

    fn endpoints_url(&self, workload: &str) -> String {
        format!(
            "{}/api/v1/namespaces/{}/endpoints/{}",
            self.api_server, self.namespace, workload
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        workload: &str,
        url: &str,
    ) -> Result<T> {
        debug!(workload = %workload, url = %url, "Querying orchestrator");

        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|e| request_failed(workload, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unable to read body>".to_string());
            return Err(ScalerError::orchestrator(
                workload,
                format!("API returned error status {}: {}", status, body),
            ));
        }

        response.json::<T>().await.map_err(|e| {
            ScalerError::orchestrator(workload, format!("Invalid response body: {}", e))
        })
    }

    async fn deployment(&self, workload: &str) -> Result<Deployment> {
        let url = self.deployment_url(workload);
        self.get_json(workload, &url).await
    }
}

#[async_trait]
impl OrchestratorClient for KubeHttpClient {
    async fn annotations(&self, workload: &str) -> Result<HashMap<String, String>> {
        let deployment = self.deployment(workload).await?;
        Ok(deployment.metadata.annotations.unwrap_or_default())
    }

    async fn replica_spec(&self, workload: &str) -> Result<ReplicaSpec> {
        let deployment = self.deployment(workload).await?;
        // The API server defaults an absent replica count to 1
        Ok(ReplicaSpec {
            replicas: deployment.spec.replicas.unwrap_or(1),
        })
    }

    async fn scale(&self, workload: &str, desired: u32) -> Result<()> {
        let url = format!("{}/scale", self.deployment_url(workload));
        let patch = ScalePatch {
            spec: ScalePatchSpec { replicas: desired },
        };
        let body = serde_json::to_vec(&patch).map_err(|e| {
            ScalerError::orchestrator(workload, format!("Failed to encode patch: {}", e))
        })?;

        let response = self
            .authorize(self.client.patch(&url))
            .header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/merge-patch+json"),
            )
            .body(body)
            .send()
            .await
            .map_err(|e| request_failed(workload, e))?;

        let status = response.status();
        if status.is_success() {
            info!(
                workload = %workload,
                replicas = desired,
                status = %status,
                "Requested replica change"
            );
            Ok(())
        } else {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unable to read body>".to_string());
            warn!(workload = %workload, status = %status, "Scale request rejected");
            Err(ScalerError::orchestrator(
                workload,
                format!("Scale API returned error status {}: {}", status, body),
            ))
        }
    }

    async fn endpoints(&self, workload: &str) -> Result<Vec<IpAddr>> {
        let url = self.endpoints_url(workload);
        let endpoints: Endpoints = self.get_json(workload, &url).await?;

        let mut addresses = Vec::new();
        for address in endpoints
            .subsets
            .unwrap_or_default()
            .into_iter()
            .flat_map(|subset| subset.addresses.unwrap_or_default())
        {
            match address.ip.parse::<IpAddr>() {
                Ok(ip) => addresses.push(ip),
                Err(e) => {
                    warn!(
                        workload = %workload,
                        ip = %address.ip,
                        error = %e,
                        "Skipping malformed endpoint address"
                    );
                }
            }
        }
        Ok(addresses)
    }
}
