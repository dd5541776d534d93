use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub collection: CollectionConfig,
    #[serde(default)]
    pub zpool: ZpoolConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    #[serde(default = "default_telemetry_path")]
    pub telemetry_path: String,
}

/// When pool state is queried.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum CollectionMode {
    /// Background loop refreshes a cached snapshot every interval
    #[default]
    Polling,
    /// Every scrape queries the pools synchronously
    OnDemand,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CollectionConfig {
    #[serde(default)]
    pub mode: CollectionMode,
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ZpoolConfig {
    /// Path or name of the `zpool` binary
    #[serde(default = "default_zpool_command")]
    pub command: String,
}

fn default_listen_address() -> String {
    ":9254".to_string()
}

fn default_telemetry_path() -> String {
    "/metrics".to_string()
}

fn default_interval() -> u64 {
    1
}

fn default_zpool_command() -> String {
    "zpool".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            telemetry_path: default_telemetry_path(),
        }
    }
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            mode: CollectionMode::default(),
            interval_seconds: default_interval(),
        }
    }
}

impl Default for ZpoolConfig {
    fn default() -> Self {
        Self {
            command: default_zpool_command(),
        }
    }
}

impl ServerConfig {
    /// Socket address to bind. A bare `:port` binds every interface.
    pub fn bind_address(&self) -> String {
        if self.listen_address.starts_with(':') {
            format!("0.0.0.0{}", self.listen_address)
        } else {
            self.listen_address.clone()
        }
    }
}

impl Config {
    /// Read the file at `path` (optional) and `ZPOOL_EXPORTER__*` variables.
    /// The result is not validated, command line overrides may still apply.
    pub fn load(path: &str) -> Result<Self> {
        // Load environment variables from .env if present
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("ZPOOL_EXPORTER").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Check the settings once every override has been applied
    pub fn validate(&self) -> Result<()> {
        if self.collection.interval_seconds == 0 {
            anyhow::bail!("collection.interval_seconds must be greater than zero");
        }
        if !self.server.telemetry_path.starts_with('/') {
            anyhow::bail!(
                "server.telemetry_path must start with '/': {}",
                self.server.telemetry_path
            );
        }
        if self.server.telemetry_path == "/" {
            anyhow::bail!("server.telemetry_path cannot be the index path '/'");
        }
        Ok(())
    }
}
