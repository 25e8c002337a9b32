//! Slack Socket Mode client.
//!
//! Opens a WebSocket through `apps.connections.open`, acknowledges every
//! envelope as soon as it arrives and hands slash commands to a
//! [`SlashCommandHandler`] on their own task. The answer is posted to the
//! command's `response_url`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::stream::SplitStream;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::types::ResponseType;
use super::commands::{SlashCommandHandler, SlashCommandPayload};
use super::{build_slack_payload, send_response, SlackApi};

type WsConnection = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Delay between reconnection attempts after an error.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);
/// Ping interval for WebSocket keep-alive.
const PING_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Deserialize)]
pub struct SocketModeEnvelope {
    /// Absent on `hello` and `disconnect`.
    #[serde(default)]
    pub envelope_id: Option<String>,
    #[serde(rename = "type")]
    pub envelope_type: String,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SocketModeAck {
    pub envelope_id: String,
}

/// What the read loop should do with one envelope.
#[derive(Debug)]
pub enum EnvelopeAction {
    Command(SlashCommandPayload),
    Hello,
    Disconnect(String),
    Ignore,
}

/// Decode one Socket Mode frame into its acknowledgement (if it needs one)
/// and the follow-up action.
pub fn parse_envelope(text: &str) -> Result<(Option<SocketModeAck>, EnvelopeAction)> {
    let envelope: SocketModeEnvelope =
        serde_json::from_str(text).context("Failed to parse Socket Mode envelope")?;
    let ack = envelope
        .envelope_id
        .clone()
        .map(|envelope_id| SocketModeAck { envelope_id });

    let action = match envelope.envelope_type.as_str() {
        "slash_commands" => match envelope.payload {
            Some(payload) => match serde_json::from_value::<SlashCommandPayload>(payload) {
                Ok(command) => EnvelopeAction::Command(command),
                Err(e) => {
                    warn!("Malformed slash command payload: {}", e);
                    EnvelopeAction::Ignore
                }
            },
            None => EnvelopeAction::Ignore,
        },
        "hello" => EnvelopeAction::Hello,
        "disconnect" => EnvelopeAction::Disconnect(envelope.reason.unwrap_or_else(|| "unknown".to_string())),
        other => {
            debug!("Ignoring envelope type: {}", other);
            EnvelopeAction::Ignore
        }
    };
    Ok((ack, action))
}

#[derive(Debug, PartialEq, Eq)]
enum ConnectionEnd {
    Shutdown,
    Reconnect,
}

pub struct SocketModeClient {
    api: SlackApi,
    http: reqwest::Client,
    bot_token: String,
    app_token: String,
    response_type: ResponseType,
    handler: Arc<dyn SlashCommandHandler>,
    shutdown_tx: broadcast::Sender<()>,
}

impl SocketModeClient {
    pub fn new(
        http: reqwest::Client,
        bot_token: String,
        app_token: String,
        response_type: ResponseType,
        handler: Arc<dyn SlashCommandHandler>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            api: SlackApi::new(http.clone()),
            http,
            bot_token,
            app_token,
            response_type,
            handler,
            shutdown_tx,
        }
    }

    /// Handle that stops [`run`](Self::run) when sent to.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Authenticate, then keep a Socket Mode connection open until shutdown.
    pub async fn run(&self) -> Result<()> {
        let bot_user = self.api.auth_test(&self.bot_token).await.context("Slack authentication failed")?;
        info!("Authenticated as bot user: {}", bot_user);

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        loop {
            let result = match self.api.open_connection(&self.app_token).await {
                Ok(url) => self.connect_and_run(&url, &mut shutdown_rx).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(ConnectionEnd::Shutdown) => {
                    info!("Socket Mode client stopped");
                    return Ok(());
                }
                Ok(ConnectionEnd::Reconnect) => {
                    info!("Reconnecting to Socket Mode");
                }
                Err(e) => {
                    error!("Socket Mode connection error: {:#}", e);
                    info!("Reconnecting in {:?}...", RECONNECT_DELAY);
                    tokio::select! {
                        _ = shutdown_rx.recv() => return Ok(()),
                        _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                    }
                }
            }
        }
    }

    async fn connect_and_run(&self, ws_url: &str, shutdown_rx: &mut broadcast::Receiver<()>) -> Result<ConnectionEnd> {
        let (ws_stream, _) = connect_async(ws_url).await.context("Failed to open Socket Mode WebSocket")?;
        let (mut write, read) = ws_stream.split();

        let (msg_tx, mut msg_rx) = mpsc::channel::<WsMessage>(100);

        let write_task = tokio::spawn(async move {
            while let Some(msg) = msg_rx.recv().await {
                if let Err(e) = write.send(msg).await {
                    error!("Failed to send WebSocket message: {}", e);
                    break;
                }
            }
        });

        let ping_tx = msg_tx.clone();
        let ping_task = tokio::spawn(async move {
            let mut interval = interval(PING_INTERVAL);
            loop {
                interval.tick().await;
                if ping_tx.send(WsMessage::Ping(vec![])).await.is_err() {
                    break;
                }
            }
        });

        let result = self.process_messages(read, msg_tx, shutdown_rx).await;

        ping_task.abort();
        write_task.abort();
        result
    }

    async fn process_messages(
        &self,
        mut read: SplitStream<WsConnection>,
        msg_tx: mpsc::Sender<WsMessage>,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> Result<ConnectionEnd> {
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Received shutdown signal");
                    let _ = msg_tx.send(WsMessage::Close(None)).await;
                    return Ok(ConnectionEnd::Shutdown);
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(WsMessage::Text(text))) => {
                            if let Some(end) = self.handle_socket_message(&text, &msg_tx).await {
                                return Ok(end);
                            }
                        }
                        Some(Ok(WsMessage::Ping(data))) => {
                            let _ = msg_tx.send(WsMessage::Pong(data)).await;
                        }
                        Some(Ok(WsMessage::Close(_))) | None => {
                            info!("WebSocket closed by server");
                            return Ok(ConnectionEnd::Reconnect);
                        }
                        Some(Err(e)) => return Err(e).context("WebSocket read failed"),
                        Some(Ok(_)) => {}
                    }
                }
            }
        }
    }

    /// Returns `Some` when the connection has to end, e.g. on a Slack
    /// `disconnect` request.
    async fn handle_socket_message(&self, text: &str, msg_tx: &mpsc::Sender<WsMessage>) -> Option<ConnectionEnd> {
        let (ack, action) = match parse_envelope(text) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("{:#}", e);
                return None;
            }
        };

        // Slack retries envelopes that are not acknowledged within 3 seconds
        if let Some(ack) = ack {
            match serde_json::to_string(&ack) {
                Ok(json) => {
                    let _ = msg_tx.send(WsMessage::Text(json)).await;
                }
                Err(e) => error!("Failed to encode envelope ack: {}", e),
            }
        }

        match action {
            EnvelopeAction::Command(command) => {
                self.dispatch(command);
                None
            }
            EnvelopeAction::Hello => {
                info!("Socket Mode connection established");
                None
            }
            EnvelopeAction::Disconnect(reason) => {
                info!("Slack requested disconnect: {}", reason);
                Some(ConnectionEnd::Reconnect)
            }
            EnvelopeAction::Ignore => None,
        }
    }

    fn dispatch(&self, command: SlashCommandPayload) {
        info!("Received {} from {}: {}", command.command, command.user_name, command.text);
        let handler = self.handler.clone();
        let http = self.http.clone();
        let response_type = self.response_type;

        tokio::spawn(async move {
            let text = handler.handle(&command).await;
            let payload = build_slack_payload(text, response_type);
            if let Err(e) = send_response(&http, &command.response_url, &payload).await {
                error!("Failed to answer {}: {:#}", command.command, e);
            }
        });
    }
}
