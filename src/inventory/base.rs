use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Pod;

use crate::parsing::format_uptime;

pub const UNKNOWN_UPTIME: &str = "Unknown";

pub fn pod_status_time(pod: &Pod) -> Option<DateTime<Utc>> {
    // Prefer status.startTime, fallback to metadata.creationTimestamp
    if let Some(st) = pod.status.as_ref().and_then(|s| s.start_time.as_ref()) {
        return Some(st.0);
    }
    pod.metadata
        .creation_timestamp
        .as_ref()
        .map(|t| t.0)
}

pub fn pod_phase(pod: &Pod) -> &str {
    pod.status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .unwrap_or("")
}

pub fn pod_ip(pod: &Pod) -> Option<String> {
    pod.status
        .as_ref()
        .and_then(|s| s.pod_ip.clone())
        .filter(|ip| !ip.is_empty())
}

pub fn uptime_since(started_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    match started_at {
        Some(ts) => format_uptime(now - ts),
        None => UNKNOWN_UPTIME.to_string(),
    }
}
