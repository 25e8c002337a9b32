use crate::types::*;

/// Slack truncates message text beyond this many characters.
pub const SLACK_TEXT_LIMIT: usize = 40_000;

pub const SERVICE_INFO_ERROR: &str = "Error retrieving service info";
pub const SERVICE_LOGS_ERROR: &str = "Error retrieving service logs";
pub const NO_RUNNING_PODS: &str = "No running pods found for the specified service.";
pub const VERSION_UNAVAILABLE: &str = "Version Unavailable";

const TRUNCATED_MARKER: &str = "[... older lines omitted ...]";
const POD_SEPARATOR: &str = "--------------------------------------------";

fn table_row(name: &str, ip: &str, uptime: &str, version: &str) -> String {
    format!("{:<35} {:<16} {:<20} {:<15}\n", name, ip, uptime, version)
}

/// `/version` answer: a fixed-width table inside a code block.
pub fn render_services_table(rows: &[ServiceVersionRow]) -> String {
    let mut out = String::from("*Kubernetes Pod Information*\n```");
    out.push_str(&table_row("Pod Name", "Pod IP", "Uptime", "Version"));
    out.push_str(&"-".repeat(110));
    out.push('\n');

    if rows.is_empty() {
        out.push_str(&table_row("No pods were found.", "", "N/A", "N/A"));
    }
    for row in rows {
        let version = row.version.as_deref().unwrap_or(VERSION_UNAVAILABLE);
        out.push_str(&table_row(&row.pod, &row.ip, &row.uptime, version));
    }

    out.push_str("```");
    out
}

fn chunk_title(chunk: &LogChunk) -> String {
    match &chunk.container {
        Some(container) => format!("{} (container: {})", chunk.pod, container),
        None => chunk.pod.clone(),
    }
}

/// `/logs` answer. Chunks are expected to be censored already.
pub fn render_service_logs(service: &str, chunks: &[LogChunk]) -> String {
    render_service_logs_with_limit(service, chunks, SLACK_TEXT_LIMIT)
}

pub fn render_service_logs_with_limit(service: &str, chunks: &[LogChunk], limit: usize) -> String {
    if chunks.is_empty() {
        return NO_RUNNING_PODS.to_string();
    }

    let header = format!("*Service Logs for {}. Sensitive data will be censored*\n```", service);
    let mut body = String::new();
    for chunk in chunks {
        body.push_str(&format!(
            "\n---- Logs from Pod: {} ----\n{}\n{}\n",
            chunk_title(chunk),
            chunk.text.trim_end_matches('\n'),
            POD_SEPARATOR
        ));
    }
    let footer = "```";

    let fixed = header.chars().count() + footer.chars().count();
    let budget = limit.saturating_sub(fixed);
    let body = truncate_keep_tail(&body, budget);

    format!("{}{}{}", header, body, footer)
}

/// Drop whole lines from the front of `text` until it fits in `max_chars`,
/// prefixing a marker when anything was dropped.
pub fn truncate_keep_tail(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let marker = format!("\n{}\n", TRUNCATED_MARKER);
    let budget = max_chars.saturating_sub(marker.chars().count());

    let mut kept: Vec<&str> = Vec::new();
    let mut used = 0;
    for line in text.split_inclusive('\n').rev() {
        let len = line.chars().count();
        if used + len > budget {
            break;
        }
        used += len;
        kept.push(line);
    }
    kept.reverse();

    let mut out = marker;
    out.push_str(&kept.concat());
    out
}

pub fn version_help(label_selector_key: &str) -> String {
    format!(
        "*Service Version Command Usage:*\n\
         Usage: `/version [--help] namespace=\"NAMESPACE_NAME\" service=\"SERVICE_NAME\"`\n\n\
         Parameters:\n\
         - `namespace (optional):` The namespace where the service is located. If not specified, all namespaces will be searched. Example: namespace=\"default\"\n\
         - `service (optional):` The name of the service, matched by Kubernetes label `{key}`. Example: service=\"my-service\"\n\n\
         Examples:\n\
         - `service=my-service`: Get version information about the service `my-service`.\n\
         - `service=my-service namespace=web`: Get version information about `my-service` in the `web` namespace.\n\
         - `--help`: Display this help message.",
        key = label_selector_key
    )
}

pub fn logs_help(label_selector_key: &str, default_lines: i64, max_lines: i64) -> String {
    format!(
        "*Service Logs Command Usage:*\n\
         Usage: `/logs [--help] namespace=\"NAMESPACE_NAME\" service=\"SERVICE_NAME\" lines=\"NUMBER_OF_LINES\"`\n\n\
         Parameters:\n\
         - `namespace (optional):` The namespace where the service is located. If not specified, all namespaces will be searched. Example: namespace=\"default\"\n\
         - `service (required):` The name of the service, matched by Kubernetes label `{key}`. Example: service=\"my-service\"\n\
         - `lines (optional):` The number of log lines to retrieve per pod (default {default}, at most {max}). Example: lines=\"10\"\n\n\
         Examples:\n\
         - `service=my-service`: Get logs of the service `my-service`.\n\
         - `service=my-service namespace=web`: Get logs of `my-service` in the `web` namespace.\n\
         - `service=my-service lines=\"20\"`: Get the last 20 lines of logs for `my-service`.\n\n\
         Sensitive data (credentials and personal data) is censored before the logs are posted.",
        key = label_selector_key,
        default = default_lines,
        max = max_lines
    )
}
