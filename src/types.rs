use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSource {
    /// Ask each pod endpoint over HTTP.
    Http,
    /// Read the version from a pod label (or annotation).
    Label,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub slack_bot_token: String,
    pub slack_app_token: String,
    pub log_level: String,
    pub label_selector_key: String,
    pub version_url: String,
    pub version_source: VersionSource,
    pub version_label_key: String,
    pub version_timeout_secs: u64,
    pub default_log_lines: i64,
    pub max_log_lines: i64,
    pub trufflehog_bin: String,
    pub trufflehog_timeout_secs: u64,
    pub presidio_analyzer_url: Option<String>,
    pub pii_entities: Vec<String>,
    pub pii_language: String,
    pub pii_score_threshold: f64,
    pub redaction_token: String,
    pub response_in_channel: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunningPod {
    pub name: String,
    pub namespace: String,
    pub ip: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub containers: Vec<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub uptime: String,
}

/// A running pod joined with one of the ports its EndpointSlice exposes.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointTarget {
    pub pod: String,
    pub ip: String,
    pub port: i32,
    pub uptime: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceVersionRow {
    pub pod: String,
    pub ip: String,
    pub uptime: String,
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogChunk {
    pub pod: String,
    pub namespace: String,
    /// Set only when the pod runs more than one container.
    pub container: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RedactionKind {
    /// Credential found by the secret scanner, tagged with its detector.
    Secret(String),
    /// Personal data, tagged with the entity type (e.g. `EMAIL_ADDRESS`).
    Pii(String),
}

impl std::fmt::Display for RedactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RedactionKind::Secret(d) => write!(f, "secret:{}", d),
            RedactionKind::Pii(e) => write!(f, "pii:{}", e),
        }
    }
}

/// A byte range of the original text and what replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedactionResult {
    pub start: usize,
    pub end: usize,
    pub kind: RedactionKind,
    pub replacement: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CensoredText {
    pub text: String,
    pub redactions: Vec<RedactionResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    #[default]
    Ephemeral,
    InChannel,
}

/// Body posted to a slash command's `response_url`.
#[derive(Debug, Clone, Serialize)]
pub struct SlackPayload {
    pub response_type: ResponseType,
    pub text: String,
}
