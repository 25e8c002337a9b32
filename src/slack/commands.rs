//! Slash command payloads and routing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A slash command as delivered inside a Socket Mode `slash_commands`
/// envelope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlashCommandPayload {
    #[serde(default)]
    pub team_id: String,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub channel_name: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    /// The command (e.g. "/version").
    pub command: String,
    /// Text after the command.
    #[serde(default)]
    pub text: String,
    /// URL for delayed responses.
    #[serde(default)]
    pub response_url: String,
    #[serde(default)]
    pub trigger_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Version,
    Logs,
    Unknown(String),
}

impl BotCommand {
    pub fn parse(command: &str) -> Self {
        match command.trim().trim_start_matches('/').to_lowercase().as_str() {
            "version" => BotCommand::Version,
            "logs" => BotCommand::Logs,
            _ => BotCommand::Unknown(command.trim().to_string()),
        }
    }
}

/// Turns a slash command into the text posted back to Slack.
#[async_trait]
pub trait SlashCommandHandler: Send + Sync {
    async fn handle(&self, command: &SlashCommandPayload) -> String;
}
