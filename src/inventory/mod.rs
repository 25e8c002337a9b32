// Pure views over listed Kubernetes objects
pub mod pods;
pub mod endpoints;
pub mod base;

// Re-export commonly used items
pub use pods::{running_pods_from_list, running_pod_from, label_version};
pub use endpoints::filter_endpoints_by_running_pods;
pub use base::{pod_status_time, uptime_since, UNKNOWN_UPTIME};
