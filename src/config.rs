use anyhow::{anyhow, bail, Context, Result};
use std::collections::HashMap;
use crate::types::{Config, VersionSource};

pub const DEFAULT_LABEL_SELECTOR_KEY: &str = "app.kubernetes.io/name";
pub const DEFAULT_VERSION_URL: &str = "/version";
pub const DEFAULT_VERSION_LABEL_KEY: &str = "app.kubernetes.io/version";
pub const DEFAULT_REDACTION_TOKEN: &str = "******";
pub const DEFAULT_PII_ENTITIES: &[&str] = &[
    "CREDIT_CARD",
    "CRYPTO",
    "EMAIL_ADDRESS",
    "IBAN_CODE",
    "PHONE_NUMBER",
    "MEDICAL_LICENSE",
];

/// Trait for abstracting environment variable access
pub trait EnvironmentProvider {
    fn get_var(&self, key: &str) -> Option<String>;
}

/// Production implementation using std::env
pub struct SystemEnvironment;

impl EnvironmentProvider for SystemEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Mock implementation for testing
#[derive(Debug, Default)]
pub struct MockEnvironment {
    vars: HashMap<String, String>,
}

impl MockEnvironment {
    pub fn new() -> Self {
        Self {
            vars: HashMap::new(),
        }
    }

    pub fn set_var<K, V>(&mut self, key: K, value: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn with_var<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.set_var(key, value);
        self
    }
}

impl EnvironmentProvider for MockEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn load_config() -> Result<Config> {
    load_config_with_env(&SystemEnvironment)
}

pub fn load_config_with_env<E: EnvironmentProvider>(env: &E) -> Result<Config> {
    let slack_bot_token = required_token(env, "SLACK_BOT_TOKEN", "xoxb-")?;
    let slack_app_token = required_token(env, "SLACK_APP_TOKEN", "xapp-")?;

    let log_level = non_empty(env, "LOG_LEVEL").unwrap_or_else(|| "INFO".to_string());

    let label_selector_key = non_empty(env, "APPLICATION_LABEL_SELECTOR_KEY")
        .unwrap_or_else(|| DEFAULT_LABEL_SELECTOR_KEY.to_string());

    let mut version_url = non_empty(env, "APPLICATION_VERSION_URL")
        .unwrap_or_else(|| DEFAULT_VERSION_URL.to_string());
    if !version_url.starts_with('/') {
        version_url.insert(0, '/');
    }

    let version_source = match non_empty(env, "VERSION_SOURCE")
        .map(|v| v.to_ascii_lowercase())
        .as_deref()
    {
        None | Some("http") => VersionSource::Http,
        Some("label") => VersionSource::Label,
        Some(other) => bail!("Invalid VERSION_SOURCE '{}': expected 'http' or 'label'", other),
    };

    let version_label_key = non_empty(env, "VERSION_LABEL_KEY")
        .unwrap_or_else(|| DEFAULT_VERSION_LABEL_KEY.to_string());

    let version_timeout_secs: u64 = env.get_var("VERSION_TIMEOUT_SECS")
        .unwrap_or_else(|| "3".to_string())
        .parse()
        .unwrap_or(3);
    if version_timeout_secs == 0 {
        bail!("VERSION_TIMEOUT_SECS must be positive");
    }

    let default_log_lines: i64 = env.get_var("DEFAULT_LOG_LINES")
        .unwrap_or_else(|| "10".to_string())
        .parse()
        .context("Invalid DEFAULT_LOG_LINES")?;
    let max_log_lines: i64 = env.get_var("MAX_LOG_LINES")
        .unwrap_or_else(|| "1000".to_string())
        .parse()
        .context("Invalid MAX_LOG_LINES")?;
    if default_log_lines <= 0 || max_log_lines <= 0 {
        bail!("DEFAULT_LOG_LINES and MAX_LOG_LINES must be positive");
    }
    if default_log_lines > max_log_lines {
        bail!("DEFAULT_LOG_LINES ({}) exceeds MAX_LOG_LINES ({})", default_log_lines, max_log_lines);
    }

    let trufflehog_bin = non_empty(env, "TRUFFLEHOG_BIN").unwrap_or_else(|| "trufflehog".to_string());
    let trufflehog_timeout_secs: u64 = env.get_var("TRUFFLEHOG_TIMEOUT_SECS")
        .unwrap_or_else(|| "60".to_string())
        .parse()
        .unwrap_or(60);
    if trufflehog_timeout_secs == 0 {
        bail!("TRUFFLEHOG_TIMEOUT_SECS must be positive");
    }

    let presidio_analyzer_url = non_empty(env, "PRESIDIO_ANALYZER_URL")
        .map(|u| u.trim_end_matches('/').to_string());

    let pii_entities: Vec<String> = match env.get_var("PII_ENTITIES") {
        Some(list) => list
            .split(',')
            .map(|s| s.trim().to_ascii_uppercase())
            .filter(|s| !s.is_empty())
            .collect(),
        None => DEFAULT_PII_ENTITIES.iter().map(|s| s.to_string()).collect(),
    };
    if pii_entities.is_empty() {
        return Err(anyhow!("PII_ENTITIES must name at least one entity"));
    }

    let pii_language = non_empty(env, "PII_LANGUAGE").unwrap_or_else(|| "en".to_string());

    let pii_score_threshold: f64 = env.get_var("PII_SCORE_THRESHOLD")
        .unwrap_or_else(|| "0.0".to_string())
        .parse()
        .context("Invalid PII_SCORE_THRESHOLD")?;

    let redaction_token = env.get_var("REDACTION_TOKEN")
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_REDACTION_TOKEN.to_string());

    let response_in_channel = env.get_var("SLACK_RESPONSE_IN_CHANNEL")
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "True"))
        .unwrap_or(false);

    Ok(Config {
        slack_bot_token,
        slack_app_token,
        log_level,
        label_selector_key,
        version_url,
        version_source,
        version_label_key,
        version_timeout_secs,
        default_log_lines,
        max_log_lines,
        trufflehog_bin,
        trufflehog_timeout_secs,
        presidio_analyzer_url,
        pii_entities,
        pii_language,
        pii_score_threshold,
        redaction_token,
        response_in_channel,
    })
}

fn non_empty<E: EnvironmentProvider>(env: &E, key: &str) -> Option<String> {
    env.get_var(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required_token<E: EnvironmentProvider>(env: &E, key: &str, prefix: &str) -> Result<String> {
    let token = non_empty(env, key)
        .ok_or_else(|| anyhow!("Missing {} in environment variables", key))?;
    if !token.starts_with(prefix) {
        bail!("{} must start with '{}'", key, prefix);
    }
    Ok(token)
}
