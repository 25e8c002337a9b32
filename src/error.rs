use thiserror::Error;

/// Failure of a sensitive-data scanning stage.
///
/// Any of these aborts the whole censoring pass: text is never released
/// half-scanned.
#[derive(Error, Debug)]
pub enum CensorError {
    #[error("{scanner} is not available: {reason}")]
    Unavailable { scanner: &'static str, reason: String },

    #[error("{scanner} scan failed: {reason}")]
    ScanFailed { scanner: &'static str, reason: String },

    #[error("{scanner} scan timed out after {secs}s")]
    Timeout { scanner: &'static str, secs: u64 },

    #[error("{scanner} returned malformed output: {reason}")]
    MalformedOutput { scanner: &'static str, reason: String },

    #[error("temporary file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Problems with the arguments a user typed after a slash command.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum InputError {
    #[error("Error: 'service' is required when retrieving logs. Use --help to get the bot manual")]
    MissingService,

    #[error("Error: 'lines' must be a positive integer, got '{0}'. Use --help to get the bot manual")]
    InvalidLines(String),

    #[error("Error: 'service' must be a plain label value without spaces, ',', '=' or '!', got '{0}'. Use --help to get the bot manual")]
    InvalidService(String),
}
