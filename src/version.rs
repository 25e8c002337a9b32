use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::join_all;
use tracing::{debug, warn};

use crate::inventory::label_version;
use crate::types::{Config, EndpointTarget, RunningPod, VersionSource};

/// How a pod's version is discovered.
#[derive(Debug, Clone)]
pub enum VersionStrategy {
    /// `GET http://{ip}:{port}{path}` against each endpoint.
    Http(HttpVersionFetcher),
    /// Read a label (or annotation) already present on the pod.
    Label { key: String },
}

impl VersionStrategy {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        Ok(match cfg.version_source {
            VersionSource::Http => VersionStrategy::Http(HttpVersionFetcher::new(
                &cfg.version_url,
                Duration::from_secs(cfg.version_timeout_secs),
            )?),
            VersionSource::Label => VersionStrategy::Label {
                key: cfg.version_label_key.clone(),
            },
        })
    }

    pub fn label_version(&self, pod: &RunningPod) -> Option<String> {
        match self {
            VersionStrategy::Label { key } => label_version(pod, key),
            VersionStrategy::Http(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpVersionFetcher {
    client: reqwest::Client,
    path: String,
}

impl HttpVersionFetcher {
    pub fn new(path: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build version HTTP client")?;
        Ok(Self {
            client,
            path: path.to_string(),
        })
    }

    pub fn url_for(&self, target: &EndpointTarget) -> String {
        let host = if target.ip.contains(':') {
            format!("[{}]", target.ip)
        } else {
            target.ip.clone()
        };
        format!("http://{}:{}{}", host, target.port, self.path)
    }

    /// Version reported by one endpoint, or `None` on any failure.
    pub async fn fetch(&self, target: &EndpointTarget) -> Option<String> {
        let url = self.url_for(target);
        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("Error fetching version from {}: {}", url, e);
                return None;
            }
        };
        if response.status() != reqwest::StatusCode::OK {
            debug!("Version endpoint {} returned {}", url, response.status());
            return None;
        }
        match response.text().await {
            Ok(body) => Some(body.trim().to_string()).filter(|v| !v.is_empty()),
            Err(e) => {
                warn!("Error reading version body from {}: {}", url, e);
                None
            }
        }
    }

    /// Fetch all targets concurrently; results line up with `targets`.
    pub async fn fetch_all(&self, targets: &[EndpointTarget]) -> Vec<Option<String>> {
        join_all(targets.iter().map(|t| self.fetch(t))).await
    }
}
