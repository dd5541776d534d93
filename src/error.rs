use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("Command `{command} {}` failed: {message}", args.join(" "))]
    Command {
        command: String,
        args: Vec<String>,
        message: String,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Pool not found: {0}")]
    PoolNotFound(String),

    #[error("Pool '{0}' has no current statistics, refresh it first")]
    NotRefreshed(String),
}

impl ExporterError {
    pub fn command(command: &str, args: &[&str], message: impl Into<String>) -> Self {
        ExporterError::Command {
            command: command.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExporterError>;
