use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Pod;

use crate::types::RunningPod;
use super::base::{pod_ip, pod_phase, pod_status_time, uptime_since};

/// Convert listed pods into `RunningPod`s, skipping anything not in the
/// `Running` phase or without a name.
pub fn running_pods_from_list(pods: &[Pod], now: DateTime<Utc>) -> Vec<RunningPod> {
    pods.iter()
        .filter_map(|pod| running_pod_from(pod, now))
        .collect()
}

pub fn running_pod_from(pod: &Pod, now: DateTime<Utc>) -> Option<RunningPod> {
    if pod_phase(pod) != "Running" {
        return None;
    }
    let name = pod.metadata.name.clone()?;
    let namespace = pod.metadata.namespace.clone().unwrap_or_else(|| "default".to_string());
    let started_at = pod_status_time(pod);

    Some(RunningPod {
        name,
        namespace,
        ip: pod_ip(pod),
        labels: pod.metadata.labels.clone().unwrap_or_default(),
        annotations: pod.metadata.annotations.clone().unwrap_or_default(),
        containers: pod
            .spec
            .as_ref()
            .map(|spec| spec.containers.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default(),
        started_at,
        uptime: uptime_since(started_at, now),
    })
}

/// Version published by the pod itself under `key`, label first, then annotation.
pub fn label_version(pod: &RunningPod, key: &str) -> Option<String> {
    pod.labels
        .get(key)
        .or_else(|| pod.annotations.get(key))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
