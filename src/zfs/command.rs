use crate::error::{ExporterError, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Abstraction for command execution to enable testing without real commands
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `command` with `args` and return its standard output
    async fn execute(&self, command: &str, args: &[&str]) -> Result<String>;
}

/// Runs commands on the local host
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandExecutor;

#[async_trait]
impl CommandExecutor for SystemCommandExecutor {
    async fn execute(&self, command: &str, args: &[&str]) -> Result<String> {
        debug!("Running {} {}", command, args.join(" "));

        let output = Command::new(command)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ExporterError::command(command, args, e.to_string()))?;

        if output.status.success() {
            String::from_utf8(output.stdout)
                .map_err(|e| ExporterError::command(command, args, e.to_string()))
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(ExporterError::command(
                command,
                args,
                format!("{} ({})", stderr.trim(), output.status),
            ))
        }
    }
}
