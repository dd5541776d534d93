//! HTTP Server and Metrics Collection
//!
//! This module implements the Prometheus exporter HTTP server and schedules the
//! collection passes.
//!
//! # Endpoints
//!
//! - `GET /` - HTML landing page linking to the metrics path
//! - `GET <telemetry path>` - Prometheus metrics in text format (default `/metrics`)
//!
//! # Collection Modes
//!
//! - **Polling** (default): a background task enumerates the pools once, then
//!   runs a pass every `interval_seconds` and publishes the result. Scrapes read
//!   the published snapshot and may lag by up to one interval. If pool
//!   enumeration fails the task logs the error and stops; the endpoint keeps
//!   serving an empty snapshot.
//! - **On demand**: pools are enumerated before the listener is bound and a
//!   failure aborts startup. Every scrape runs a pass before rendering.

use crate::collectors::ZpoolCollector;
use crate::config::{CollectionMode, Config};
use crate::metrics::MetricsCollector;
use crate::zfs::{PoolSource, ZpoolCli};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    metrics: MetricsCollector,
    telemetry_path: String,
    /// Present in on-demand mode only
    on_demand: Option<Arc<ZpoolCollector>>,
}

impl AppState {
    /// State for a server whose snapshot is published by a background loop
    pub fn polling(metrics: MetricsCollector, telemetry_path: impl Into<String>) -> Self {
        Self {
            metrics,
            telemetry_path: telemetry_path.into(),
            on_demand: None,
        }
    }

    /// State for a server that collects on every scrape
    pub fn on_demand(
        metrics: MetricsCollector,
        telemetry_path: impl Into<String>,
        collector: Arc<ZpoolCollector>,
    ) -> Self {
        Self {
            metrics,
            telemetry_path: telemetry_path.into(),
            on_demand: Some(collector),
        }
    }
}

pub async fn start(config: Config) -> anyhow::Result<()> {
    let source: Arc<dyn PoolSource> = Arc::new(ZpoolCli::new(config.zpool.command.clone()));
    run(config, source).await
}

/// Serve metrics for the pools of `source`
pub async fn run(config: Config, source: Arc<dyn PoolSource>) -> anyhow::Result<()> {
    let metrics = MetricsCollector::new()?;
    let telemetry_path = config.server.telemetry_path.clone();

    let state = match config.collection.mode {
        CollectionMode::Polling => {
            let interval_seconds = config.collection.interval_seconds;
            let loop_metrics = metrics.clone();
            tokio::spawn(async move {
                collect_metrics_loop(source, loop_metrics, interval_seconds).await;
            });
            AppState::polling(metrics, telemetry_path)
        }
        CollectionMode::OnDemand => {
            let collector = ZpoolCollector::init(source).await?;
            AppState::on_demand(metrics, telemetry_path, Arc::new(collector))
        }
    };

    let app = router(state);

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Metrics server listening on {}", addr);
    info!(
        "Metrics available at http://{}{}",
        addr, config.server.telemetry_path
    );

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the router serving the index page and the telemetry path
pub fn router(state: AppState) -> Router {
    let telemetry_path = state.telemetry_path.clone();
    Router::new()
        .route("/", get(root_handler))
        .route(&telemetry_path, get(metrics_handler))
        .with_state(state)
}

/// Enumerate pools once, then collect and publish every `interval_seconds`
pub async fn collect_metrics_loop(
    source: Arc<dyn PoolSource>,
    metrics: MetricsCollector,
    interval_seconds: u64,
) {
    let collector = match ZpoolCollector::init(source).await {
        Ok(collector) => collector,
        Err(e) => {
            error!("Error opening pools, polling stopped: {}", e);
            return;
        }
    };

    let mut ticker = interval(Duration::from_secs(interval_seconds));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        metrics.publish(collector.collect().await);
    }
}

/// Landing page linking to `telemetry_path`
pub fn index_page(telemetry_path: &str) -> String {
    format!(
        r#"<html>
<head><title>ZFS Exporter</title></head>
<body>
<h1>ZFS Exporter</h1>
<p><a href="{}">Metrics</a></p>
</body>
</html>"#,
        telemetry_path
    )
}

async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    Html(index_page(&state.telemetry_path))
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    if let Some(collector) = &state.on_demand {
        state.metrics.publish(collector.collect().await);
    }

    match state.metrics.render() {
        Ok(metrics) => metrics.into_response(),
        Err(e) => {
            error!("Failed to render metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error rendering metrics: {}", e),
            )
                .into_response()
        }
    }
}
