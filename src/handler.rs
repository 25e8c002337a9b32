use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{error, info, warn};

use crate::censor::CensorPipeline;
use crate::collector::ServiceCollector;
use crate::error::{CensorError, InputError};
use crate::parsing::{parse_log_lines, parse_user_input, validate_label_value};
use crate::report::{
    logs_help, render_service_logs, render_services_table, version_help, SERVICE_INFO_ERROR, SERVICE_LOGS_ERROR,
};
use crate::slack::{BotCommand, SlashCommandHandler, SlashCommandPayload};
use crate::types::{Config, LogChunk};

/// Chunks censored at the same time. Every TruffleHog pass is its own
/// process, so a service with many pods must not start one per pod at once.
pub const MAX_CONCURRENT_SCANS: usize = 4;

/// Answers `/version` and `/logs`.
pub struct CommandHandler {
    config: Arc<Config>,
    collector: ServiceCollector,
    censor: CensorPipeline,
}

impl CommandHandler {
    pub fn new(config: Arc<Config>, collector: ServiceCollector, censor: CensorPipeline) -> Self {
        Self {
            config,
            collector,
            censor,
        }
    }

    pub async fn version(&self, text: &str) -> String {
        let args = parse_user_input(text);
        if args.help {
            return version_help(&self.config.label_selector_key);
        }
        if let Some(Err(e)) = args.service().map(validate_label_value) {
            return e.to_string();
        }

        match self.collector.services_info(args.service(), args.namespace()).await {
            Ok(rows) => {
                info!("Service info: {} rows", rows.len());
                render_services_table(&rows)
            }
            Err(e) => {
                error!("{}: {:#}", SERVICE_INFO_ERROR, e);
                SERVICE_INFO_ERROR.to_string()
            }
        }
    }

    pub async fn logs(&self, text: &str) -> String {
        let args = parse_user_input(text);
        if args.help {
            return logs_help(
                &self.config.label_selector_key,
                self.config.default_log_lines,
                self.config.max_log_lines,
            );
        }

        let Some(service) = args.service() else {
            return InputError::MissingService.to_string();
        };
        if let Err(e) = validate_label_value(service) {
            return e.to_string();
        }
        let lines = match parse_log_lines(args.lines(), self.config.default_log_lines, self.config.max_log_lines) {
            Ok(lines) => lines,
            Err(e) => return e.to_string(),
        };

        let chunks = match self.collector.service_logs(service, args.namespace(), lines).await {
            Ok(chunks) => chunks,
            Err(e) => {
                error!("{}: {:#}", SERVICE_LOGS_ERROR, e);
                return SERVICE_LOGS_ERROR.to_string();
            }
        };

        match self.censor_chunks(chunks).await {
            Ok(censored) => render_service_logs(service, &censored),
            Err(e) => {
                error!("{}: censoring failed, withholding logs: {}", SERVICE_LOGS_ERROR, e);
                SERVICE_LOGS_ERROR.to_string()
            }
        }
    }

    /// Censor every chunk, at most [`MAX_CONCURRENT_SCANS`] at a time and in
    /// order; one failure withholds all of them.
    async fn censor_chunks(&self, chunks: Vec<LogChunk>) -> Result<Vec<LogChunk>, CensorError> {
        stream::iter(chunks)
            .map(|chunk| async move {
                let censored = self.censor.censor(&chunk.text).await?;
                Ok::<_, CensorError>(LogChunk {
                    text: censored.text,
                    ..chunk
                })
            })
            .buffered(MAX_CONCURRENT_SCANS)
            .try_collect()
            .await
    }
}

#[async_trait]
impl SlashCommandHandler for CommandHandler {
    async fn handle(&self, command: &SlashCommandPayload) -> String {
        match BotCommand::parse(&command.command) {
            BotCommand::Version => self.version(&command.text).await,
            BotCommand::Logs => self.logs(&command.text).await,
            BotCommand::Unknown(name) => {
                warn!("Unsupported command {}", name);
                format!("Unknown command `{}`. Supported commands: `/version`, `/logs`.", name)
            }
        }
    }
}
