use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::api::discovery::v1::EndpointSlice;
use kube::api::{ListParams, LogParams};
use kube::{Api, Client};
use tracing::{debug, info};

use crate::inventory::running_pods_from_list;
use crate::types::RunningPod;

const RUNNING_FIELD_SELECTOR: &str = "status.phase=Running";

/// The cluster operations the bot needs. `namespace: None` means all namespaces.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn list_running_pods(&self, namespace: Option<&str>, label_selector: &str) -> Result<Vec<RunningPod>>;

    async fn list_endpoint_slices(&self, namespace: Option<&str>) -> Result<Vec<EndpointSlice>>;

    async fn pod_logs(&self, namespace: &str, pod: &str, container: Option<&str>, tail_lines: i64) -> Result<String>;
}

/// Build a client from the in-cluster service account, falling back to the
/// local kubeconfig.
pub async fn connect() -> Result<Client> {
    let config = match kube::Config::incluster() {
        Ok(config) => {
            info!("Loaded Kubernetes configuration from within the cluster");
            config
        }
        Err(e) => {
            debug!("In-cluster configuration unavailable: {}", e);
            let config = kube::Config::infer()
                .await
                .context("Failed to load Kubernetes configuration")?;
            info!("Loaded Kubernetes configuration from local kubeconfig");
            config
        }
    };
    Client::try_from(config).context("Failed to build Kubernetes client")
}

#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn pods(&self, namespace: Option<&str>) -> Api<Pod> {
        match namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        }
    }
}

#[async_trait]
impl ClusterApi for KubeCluster {
    async fn list_running_pods(&self, namespace: Option<&str>, label_selector: &str) -> Result<Vec<RunningPod>> {
        let mut params = ListParams::default().fields(RUNNING_FIELD_SELECTOR);
        if !label_selector.is_empty() {
            params = params.labels(label_selector);
        }
        let pods = self.pods(namespace)
            .list(&params)
            .await
            .with_context(|| format!("Failed to list running pods (selector '{}')", label_selector))?;
        let running = running_pods_from_list(&pods.items, Utc::now());
        info!("Retrieved {} running pods", running.len());
        Ok(running)
    }

    async fn list_endpoint_slices(&self, namespace: Option<&str>) -> Result<Vec<EndpointSlice>> {
        let api: Api<EndpointSlice> = match namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        };
        let slices = api
            .list(&ListParams::default())
            .await
            .context("Failed to list EndpointSlices")?;
        info!("Retrieved {} EndpointSlices", slices.items.len());
        Ok(slices.items)
    }

    async fn pod_logs(&self, namespace: &str, pod: &str, container: Option<&str>, tail_lines: i64) -> Result<String> {
        let params = LogParams {
            container: container.map(|c| c.to_string()),
            tail_lines: Some(tail_lines),
            ..Default::default()
        };
        let logs = self.pods(Some(namespace))
            .logs(pod, &params)
            .await
            .with_context(|| format!("Failed to fetch logs for pod {}/{}", namespace, pod))?;
        debug!("Retrieved {} bytes of logs for pod {}/{}", logs.len(), namespace, pod);
        Ok(logs)
    }
}
