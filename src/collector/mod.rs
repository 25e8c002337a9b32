use std::sync::Arc;

use anyhow::Result;
use futures::future::join_all;
use tracing::{error, info};

use crate::inventory::filter_endpoints_by_running_pods;
use crate::kubernetes::ClusterApi;
use crate::parsing::construct_label_selector;
use crate::types::*;
use crate::version::VersionStrategy;

/// Gathers what a single command needs from the cluster
#[derive(Clone)]
pub struct ServiceCollector {
    cluster: Arc<dyn ClusterApi>,
    config: Arc<Config>,
    versions: VersionStrategy,
}

impl ServiceCollector {
    pub fn new(cluster: Arc<dyn ClusterApi>, config: Arc<Config>, versions: VersionStrategy) -> Self {
        Self {
            cluster,
            config,
            versions,
        }
    }

    /// Running pods of a service with the version each one reports.
    ///
    /// With the HTTP strategy only pods backing an EndpointSlice are listed,
    /// once per exposed TCP port.
    pub async fn services_info(&self, service: Option<&str>, namespace: Option<&str>) -> Result<Vec<ServiceVersionRow>> {
        let selector = construct_label_selector(&self.config.label_selector_key, service)?;
        info!("Collecting service info (selector '{}', namespace {:?})", selector, namespace);

        match &self.versions {
            VersionStrategy::Http(fetcher) => {
                let (pods, slices) = tokio::try_join!(
                    self.cluster.list_running_pods(namespace, &selector),
                    self.cluster.list_endpoint_slices(namespace),
                )?;
                let targets = filter_endpoints_by_running_pods(&pods, &slices);
                let versions = fetcher.fetch_all(&targets).await;

                Ok(targets
                    .into_iter()
                    .zip(versions)
                    .map(|(t, version)| ServiceVersionRow {
                        pod: t.pod,
                        ip: t.ip,
                        uptime: t.uptime,
                        version,
                    })
                    .collect())
            }
            VersionStrategy::Label { .. } => {
                let pods = self.cluster.list_running_pods(namespace, &selector).await?;
                Ok(pods
                    .iter()
                    .map(|p| ServiceVersionRow {
                        pod: p.name.clone(),
                        ip: p.ip.clone().unwrap_or_else(|| "N/A".to_string()),
                        uptime: p.uptime.clone(),
                        version: self.versions.label_version(p),
                    })
                    .collect())
            }
        }
    }

    /// Last `lines` log lines of every running pod of `service`, one chunk
    /// per container when a pod runs several.
    pub async fn service_logs(&self, service: &str, namespace: Option<&str>, lines: i64) -> Result<Vec<LogChunk>> {
        let selector = construct_label_selector(&self.config.label_selector_key, Some(service))?;
        let pods = self.cluster.list_running_pods(namespace, &selector).await?;
        info!("Fetching {} log lines from {} pods of {}", lines, pods.len(), service);

        let sources: Vec<(&RunningPod, Option<&str>)> = pods
            .iter()
            .flat_map(|pod| {
                if pod.containers.len() > 1 {
                    pod.containers.iter().map(|c| (pod, Some(c.as_str()))).collect::<Vec<_>>()
                } else {
                    vec![(pod, None)]
                }
            })
            .collect();

        let chunks = join_all(sources.into_iter().map(|(pod, container)| async move {
            let text = match self.cluster.pod_logs(&pod.namespace, &pod.name, container, lines).await {
                Ok(text) => text,
                Err(e) => {
                    error!("Error fetching logs for pod {}: {:#}", pod.name, e);
                    format!("Error fetching logs for pod {}: {}", pod.name, e)
                }
            };
            LogChunk {
                pod: pod.name.clone(),
                namespace: pod.namespace.clone(),
                container: container.map(|c| c.to_string()),
                text,
            }
        }))
        .await;

        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{load_config_with_env, MockEnvironment};
    use crate::kubernetes::testing::{running_pod, MockCluster};
    use k8s_openapi::api::discovery::v1::{Endpoint, EndpointPort, EndpointSlice};
    use std::collections::BTreeMap;

    fn config() -> Arc<Config> {
        let env = MockEnvironment::new()
            .with_var("SLACK_BOT_TOKEN", "xoxb-test")
            .with_var("SLACK_APP_TOKEN", "xapp-test")
            .with_var("VERSION_SOURCE", "label");
        Arc::new(load_config_with_env(&env).unwrap())
    }

    fn label_collector(cluster: MockCluster) -> (ServiceCollector, Arc<MockCluster>) {
        let cluster = Arc::new(cluster);
        let versions = VersionStrategy::Label { key: "app.kubernetes.io/version".to_string() };
        (ServiceCollector::new(cluster.clone(), config(), versions), cluster)
    }

    fn slice_for(ip: &str, port: i32) -> EndpointSlice {
        EndpointSlice {
            address_type: "IPv4".to_string(),
            endpoints: vec![Endpoint { addresses: vec![ip.to_string()], ..Default::default() }],
            ports: Some(vec![EndpointPort { port: Some(port), protocol: Some("TCP".to_string()), ..Default::default() }]),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_services_info_with_label_versions() {
        let mut tagged = running_pod("api-1", "web", "10.0.0.1", "api");
        tagged.labels.insert("app.kubernetes.io/version".to_string(), "1.2.3".to_string());
        let untagged = running_pod("api-2", "web", "10.0.0.2", "api");
        let other = running_pod("db-1", "web", "10.0.0.3", "db");

        let (collector, cluster) = label_collector(MockCluster {
            pods: vec![tagged, untagged, other],
            ..Default::default()
        });

        let rows = collector.services_info(Some("api"), None).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].version.as_deref(), Some("1.2.3"));
        assert_eq!(rows[1].version, None);
        assert_eq!(cluster.selectors.lock().unwrap().as_slice(), ["app.kubernetes.io/name=api"]);
    }

    #[tokio::test]
    async fn test_services_info_without_service_lists_everything() {
        let (collector, cluster) = label_collector(MockCluster {
            pods: vec![running_pod("api-1", "web", "10.0.0.1", "api"), running_pod("db-1", "data", "10.0.0.3", "db")],
            ..Default::default()
        });

        let rows = collector.services_info(None, Some("data")).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].pod, "db-1");
        assert_eq!(cluster.selectors.lock().unwrap().as_slice(), [""]);
    }

    #[tokio::test]
    async fn test_services_info_over_http() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/version").with_status(200).with_body("v2.0.1\n").create_async().await;
        let address = server.host_with_port();
        let (ip, port) = address.rsplit_once(':').unwrap();
        let port: i32 = port.parse().unwrap();

        let cluster = Arc::new(MockCluster {
            pods: vec![running_pod("api-1", "web", ip, "api"), running_pod("api-2", "web", "10.255.0.2", "api")],
            slices: vec![slice_for(ip, port)],
            ..Default::default()
        });
        let fetcher = crate::version::HttpVersionFetcher::new("/version", std::time::Duration::from_secs(2)).unwrap();
        let collector = ServiceCollector::new(cluster, config(), VersionStrategy::Http(fetcher));

        let rows = collector.services_info(Some("api"), None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].pod, "api-1");
        assert_eq!(rows[0].version.as_deref(), Some("v2.0.1"));
    }

    #[tokio::test]
    async fn test_services_info_propagates_listing_errors() {
        let (collector, _) = label_collector(MockCluster { fail_listing: true, ..Default::default() });
        assert!(collector.services_info(Some("api"), None).await.is_err());
    }

    #[tokio::test]
    async fn test_service_logs_per_pod_and_container() {
        let single = running_pod("api-1", "web", "10.0.0.1", "api");
        let mut sidecar = running_pod("api-2", "web", "10.0.0.2", "api");
        sidecar.containers = vec!["app".to_string(), "proxy".to_string()];

        let (collector, cluster) = label_collector(MockCluster {
            pods: vec![single, sidecar],
            logs: BTreeMap::from([
                ("api-1".to_string(), "started\n".to_string()),
                ("api-2/app".to_string(), "ready\n".to_string()),
            ]),
            ..Default::default()
        });

        let chunks = collector.service_logs("api", Some("web"), 25).await.unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text, "started\n");
        assert_eq!(chunks[0].container, None);
        assert_eq!(chunks[1].container.as_deref(), Some("app"));
        assert_eq!(chunks[1].text, "ready\n");
        assert_eq!(chunks[2].container.as_deref(), Some("proxy"));
        assert!(chunks[2].text.starts_with("Error fetching logs for pod api-2:"));
        assert!(cluster.tail_lines.lock().unwrap().iter().all(|n| *n == 25));
    }

    #[tokio::test]
    async fn test_selector_syntax_never_reaches_cluster() {
        let (collector, cluster) = label_collector(MockCluster {
            pods: vec![running_pod("api-1", "web", "10.0.0.1", "api")],
            ..Default::default()
        });

        assert!(collector.services_info(Some("a,tier!=x"), None).await.is_err());
        assert!(collector.service_logs("api,db", None, 10).await.is_err());
        assert!(cluster.selectors.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_service_logs_without_pods() {
        let (collector, _) = label_collector(MockCluster::default());
        assert!(collector.service_logs("ghost", None, 10).await.unwrap().is_empty());
    }
}
