use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use zpool_exporter::{
    config::{CollectionMode, Config},
    server,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/Default.toml")]
    config: String,

    /// Address on which to expose metrics and web interface
    #[arg(long = "web.listen-address", env = "ZPOOL_EXPORTER_LISTEN_ADDRESS")]
    listen_address: Option<String>,

    /// Path under which to expose metrics
    #[arg(long = "web.telemetry-path", env = "ZPOOL_EXPORTER_TELEMETRY_PATH")]
    telemetry_path: Option<String>,

    /// Poll in the background or collect on every scrape
    #[arg(long = "collection.mode", value_enum)]
    mode: Option<CollectionMode>,

    /// Seconds between background collection passes
    #[arg(long = "collection.interval-seconds")]
    interval_seconds: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ZFS Pool Exporter v{}", env!("CARGO_PKG_VERSION"));

    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration
    let mut config = Config::load(&args.config)?;

    // Override with CLI arguments if provided
    if let Some(listen_address) = args.listen_address {
        config.server.listen_address = listen_address;
    }
    if let Some(telemetry_path) = args.telemetry_path {
        config.server.telemetry_path = telemetry_path;
    }
    if let Some(mode) = args.mode {
        config.collection.mode = mode;
    }
    if let Some(interval_seconds) = args.interval_seconds {
        config.collection.interval_seconds = interval_seconds;
    }
    config.validate()?;

    info!("Configuration loaded successfully");
    info!(
        "Collection mode: {:?} (interval {}s)",
        config.collection.mode, config.collection.interval_seconds
    );

    // Start the metrics server
    if let Err(e) = server::start(config).await {
        error!("Server error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
