use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};

use kube_version_bot::censor::CensorPipeline;
use kube_version_bot::collector::ServiceCollector;
use kube_version_bot::config::load_config;
use kube_version_bot::handler::CommandHandler;
use kube_version_bot::kubernetes::{connect, KubeCluster};
use kube_version_bot::slack::SocketModeClient;
use kube_version_bot::types::ResponseType;
use kube_version_bot::version::VersionStrategy;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Arc::new(load_config()?);
    init_tracing(&cfg.log_level);
    info!(
        "label selector key = {}, version source = {:?}",
        cfg.label_selector_key, cfg.version_source
    );

    let client = connect().await?;
    let cluster = Arc::new(KubeCluster::new(client));
    let versions = VersionStrategy::from_config(&cfg)?;
    let collector = ServiceCollector::new(cluster, cfg.clone(), versions);
    let censor = CensorPipeline::from_config(&cfg)?;
    let handler = Arc::new(CommandHandler::new(cfg.clone(), collector, censor));

    let response_type = if cfg.response_in_channel {
        ResponseType::InChannel
    } else {
        ResponseType::Ephemeral
    };
    let bot = SocketModeClient::new(
        reqwest::Client::new(),
        cfg.slack_bot_token.clone(),
        cfg.slack_app_token.clone(),
        response_type,
        handler,
    );

    let shutdown = bot.shutdown_handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, shutting down");
                let _ = shutdown.send(());
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    bot.run().await
}

/// `RUST_LOG` wins; otherwise `LOG_LEVEL` (Python-style names accepted).
fn init_tracing(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(env_filter_directive(log_level)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

fn env_filter_directive(log_level: &str) -> &'static str {
    match log_level.to_ascii_uppercase().as_str() {
        "TRACE" => "trace",
        "DEBUG" => "debug",
        "WARN" | "WARNING" => "warn",
        "ERROR" | "CRITICAL" | "FATAL" => "error",
        _ => "info",
    }
}
