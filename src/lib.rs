//! ZFS Pool Prometheus Exporter
//!
//! Exposes the health and I/O statistics of the ZFS pools imported on the local
//! host as Prometheus metrics.
//!
//! # Overview
//!
//! Every pool owns a tree of vdevs (root → mirrors/raidz groups → disks). The
//! exporter walks that tree and flattens it into metrics labeled by pool, vdev
//! type and vdev name. Failures are isolated per pool and counted in
//! `zfs_zpool_collecterrors`, so one broken pool never hides the others.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐   zpool list/status   ┌──────────────┐
//! │  OpenZFS    │ ◄───────────────────  │   Exporter   │
//! │   (zpool)   │        JSON           │              │
//! └─────────────┘                       │  ┌────────┐  │      HTTP      ┌────────────┐
//!                                       │  │Collect │  │ ◄────────────► │ Prometheus │
//!                                       │  └────────┘  │   /metrics     └────────────┘
//!                                       │  ┌────────┐  │
//!                                       │  │Metrics │  │
//!                                       │  └────────┘  │
//!                                       └──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`zfs`] - resource model, tree walk and the pool query adapter
//! - [`collectors`] - metric extraction and collection passes
//! - [`metrics`] - metric schema and Prometheus registry
//! - [`server`] - HTTP server and collection scheduling
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//!
//! # Quick Start
//!
//! ```no_run
//! use zpool_exporter::{config::Config, server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/Default.toml")?;
//!     config.validate()?;
//!     server::start(config).await?;
//!     Ok(())
//! }
//! ```

pub mod collectors;
pub mod config;
pub mod error;
pub mod metrics;
pub mod server;
pub mod zfs;
