use std::collections::{HashMap, HashSet};

use k8s_openapi::api::discovery::v1::EndpointSlice;

use crate::types::{EndpointTarget, RunningPod};

/// Join EndpointSlice addresses with running pods by IP, producing one
/// target per (pod, port). UDP/SCTP ports are skipped since versions are
/// fetched over HTTP. Duplicates from overlapping services collapse.
pub fn filter_endpoints_by_running_pods(
    running: &[RunningPod],
    slices: &[EndpointSlice],
) -> Vec<EndpointTarget> {
    let by_ip: HashMap<&str, &RunningPod> = running
        .iter()
        .filter_map(|p| p.ip.as_deref().map(|ip| (ip, p)))
        .collect();

    let mut seen = HashSet::new();
    let mut targets = Vec::new();

    for slice in slices {
        let ports: Vec<i32> = slice
            .ports
            .as_ref()
            .map(|ports| {
                ports
                    .iter()
                    .filter(|p| p.protocol.as_deref().map(|proto| proto == "TCP").unwrap_or(true))
                    .filter_map(|p| p.port)
                    .collect()
            })
            .unwrap_or_default();
        if ports.is_empty() {
            continue;
        }

        for endpoint in &slice.endpoints {
            for address in &endpoint.addresses {
                let Some(pod) = by_ip.get(address.as_str()) else {
                    continue;
                };
                for port in &ports {
                    if !seen.insert((pod.name.clone(), address.clone(), *port)) {
                        continue;
                    }
                    targets.push(EndpointTarget {
                        pod: pod.name.clone(),
                        ip: address.clone(),
                        port: *port,
                        uptime: pod.uptime.clone(),
                    });
                }
            }
        }
    }

    targets
}
