// Public modules
pub mod types;
pub mod error;
pub mod config;
pub mod parsing;
pub mod inventory;
pub mod kubernetes;
pub mod version;
pub mod collector;
pub mod censor;
pub mod report;
pub mod slack;
pub mod handler;

// Re-export commonly used items
pub use types::*;
pub use error::{CensorError, InputError};
pub use config::{load_config, load_config_with_env, EnvironmentProvider, SystemEnvironment, MockEnvironment};
pub use parsing::{parse_user_input, construct_label_selector, validate_label_value, parse_log_lines, format_uptime, CommandArgs};
pub use kubernetes::{ClusterApi, KubeCluster};
pub use version::{VersionStrategy, HttpVersionFetcher};
pub use collector::ServiceCollector;
pub use censor::{Censor, CensorPipeline, Finding, PatternCensor, PresidioCensor, TruffleHogCensor};
pub use report::{render_services_table, render_service_logs};
pub use slack::{build_slack_payload, send_response, SocketModeClient};
pub use handler::CommandHandler;
