pub mod commands;
pub mod socket;

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, error};

use crate::types::{ResponseType, SlackPayload};

pub use commands::{BotCommand, SlashCommandHandler, SlashCommandPayload};
pub use socket::SocketModeClient;

pub const SLACK_API_BASE: &str = "https://slack.com/api";

pub fn build_slack_payload(text: impl Into<String>, response_type: ResponseType) -> SlackPayload {
    SlackPayload {
        response_type,
        text: text.into(),
    }
}

/// Post a command answer to its `response_url`.
pub async fn send_response(client: &reqwest::Client, response_url: &str, payload: &SlackPayload) -> Result<()> {
    let res = client
        .post(response_url)
        .json(payload)
        .send()
        .await
        .context("Failed to send Slack response")?;
    if !res.status().is_success() {
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        error!("Slack response_url failed: {} - {}", status, body);
        return Err(anyhow!("Slack response_url returned non-success status"));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    team: Option<String>,
}

/// The two Web API methods Socket Mode needs.
#[derive(Debug, Clone)]
pub struct SlackApi {
    client: reqwest::Client,
    base_url: String,
}

impl SlackApi {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, SLACK_API_BASE)
    }

    pub fn with_base_url(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn call(&self, method: &str, token: &str) -> Result<ApiResponse> {
        let url = format!("{}/{}", self.base_url, method);
        let res = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .send()
            .await
            .with_context(|| format!("Failed to call {}", method))?;
        if !res.status().is_success() {
            bail!("{} returned HTTP {}", method, res.status());
        }
        let body: ApiResponse = res
            .json()
            .await
            .with_context(|| format!("Failed to decode {} response", method))?;
        if !body.ok {
            bail!("{} failed: {}", method, body.error.as_deref().unwrap_or("unknown"));
        }
        Ok(body)
    }

    /// Validate the bot token; returns the bot user id.
    pub async fn auth_test(&self, bot_token: &str) -> Result<String> {
        let body = self.call("auth.test", bot_token).await?;
        debug!("auth.test ok for team {:?}", body.team);
        body.user_id.ok_or_else(|| anyhow!("auth.test response has no user_id"))
    }

    /// Ask for a fresh Socket Mode WebSocket URL.
    pub async fn open_connection(&self, app_token: &str) -> Result<String> {
        let body = self.call("apps.connections.open", app_token).await?;
        body.url.ok_or_else(|| anyhow!("apps.connections.open response has no url"))
    }
}
