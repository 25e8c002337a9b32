use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::Duration;
use regex::Regex;

use crate::error::InputError;

// key=value, where value may be wrapped in straight or Slack "smart" quotes
static KEY_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(\w+)=(?:"([^"]*)"|“([^”]*)”|'([^']*)'|(\S+))"#).expect("valid key=value regex")
});

/// Arguments typed after a slash command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandArgs {
    values: BTreeMap<String, String>,
    pub help: bool,
}

impl CommandArgs {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str()).filter(|s| !s.is_empty())
    }

    pub fn namespace(&self) -> Option<&str> {
        self.get("namespace")
    }

    pub fn service(&self) -> Option<&str> {
        self.get("service")
    }

    pub fn lines(&self) -> Option<&str> {
        self.get("lines")
    }
}

/// Parse `key=value` pairs and the `--help` flag out of free-form command text.
/// Later occurrences of a key win.
pub fn parse_user_input(input: &str) -> CommandArgs {
    let mut values = BTreeMap::new();
    for caps in KEY_VALUE.captures_iter(input) {
        let key = caps[1].to_string();
        let value = (2..=5)
            .find_map(|i| caps.get(i))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
        values.insert(key, value);
    }
    CommandArgs {
        values,
        help: input.contains("--help"),
    }
}

/// `key=value` selector for a service name, or an empty selector (match all).
pub fn construct_label_selector(key: &str, service: Option<&str>) -> Result<String, InputError> {
    match service.map(str::trim) {
        Some(value) if !value.is_empty() => {
            validate_label_value(value)?;
            Ok(format!("{}={}", key, value))
        }
        _ => Ok(String::new()),
    }
}

/// A service name must stay a single label value; selector syntax in it
/// would widen or change the query.
pub fn validate_label_value(value: &str) -> Result<(), InputError> {
    if value.chars().any(|c| c.is_whitespace() || matches!(c, ',' | '=' | '!')) {
        return Err(InputError::InvalidService(value.to_string()));
    }
    Ok(())
}

pub fn parse_log_lines(raw: Option<&str>, default: i64, max: i64) -> Result<i64, InputError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().parse::<i64>() {
        Ok(n) if n > 0 => Ok(n.min(max)),
        _ => Err(InputError::InvalidLines(raw.to_string())),
    }
}

/// Render an uptime as `H:MM:SS`, prefixed with `N day(s), ` past 24h.
pub fn format_uptime(uptime: Duration) -> String {
    let total = uptime.num_seconds().max(0);
    let days = total / 86_400;
    let rem = total % 86_400;
    let clock = format!("{}:{:02}:{:02}", rem / 3600, (rem % 3600) / 60, rem % 60);
    match days {
        0 => clock,
        1 => format!("1 day, {}", clock),
        n => format!("{} days, {}", n, clock),
    }
}
