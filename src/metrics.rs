//! Prometheus Metrics Definitions
//!
//! This module defines the metric schema exposed by the exporter and the registry
//! that serves it.
//!
//! # Metric Families
//!
//! ## Pool Metrics (labels: `poolname`)
//! - `zfs_zpool_poolstate` - pool state enum, -1 when the query failed
//! - `zfs_zpool_poolstatus` - pool status enum, -1 when the query failed
//! - `zfs_zpool_collecterrors` - cumulative collection errors for the pool
//!
//! ## VDev Metrics (labels: `poolname`, `vdevtype`, `vdevname`)
//! - `zfs_zpool_vdevstate`, `zfs_zpool_allocated_bytes`, `zfs_zpool_space_bytes`,
//!   `zfs_zpool_fragmentation_percent`
//! - `zfs_zpool_errors_total` (+ `errortype`: read, write, checksum)
//! - `zfs_zpool_vdevops_total`, `zfs_zpool_vdevbytes_total` (+ `vdevoptype`)
//!
//! # Snapshots
//!
//! Collectors produce plain [`Sample`] values. [`MetricsCollector::publish`] swaps
//! the whole set in at once and the registry turns the latest set into metric
//! families whenever it is gathered, so a scrape never sees half of a pass and
//! vdevs that disappeared stop being exported.

use crate::zfs::{PoolState, PoolStatus, VdevState};
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{CounterVec, Encoder, GaugeVec, Opts, Registry, TextEncoder};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::error;

pub const POOL_LABELS: &[&str] = &["poolname"];
pub const VDEV_LABELS: &[&str] = &["poolname", "vdevtype", "vdevname"];
pub const VDEV_ERROR_LABELS: &[&str] = &["poolname", "vdevtype", "vdevname", "errortype"];
pub const VDEV_OP_LABELS: &[&str] = &["poolname", "vdevtype", "vdevname", "vdevoptype"];

/// Prometheus metric type of a family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Gauge,
    Counter,
}

/// Every metric family the exporter knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZpoolMetric {
    PoolState,
    PoolStatus,
    CollectErrors,
    VdevState,
    VdevAllocated,
    VdevSpace,
    VdevFragmentation,
    VdevErrors,
    VdevOps,
    VdevBytes,
}

fn enum_list<T: Copy>(values: &[T], name: fn(T) -> &'static str) -> String {
    values.iter().map(|v| name(*v)).collect::<Vec<_>>().join(", ")
}

impl ZpoolMetric {
    pub const ALL: [ZpoolMetric; 10] = [
        ZpoolMetric::PoolState,
        ZpoolMetric::PoolStatus,
        ZpoolMetric::CollectErrors,
        ZpoolMetric::VdevState,
        ZpoolMetric::VdevAllocated,
        ZpoolMetric::VdevSpace,
        ZpoolMetric::VdevFragmentation,
        ZpoolMetric::VdevErrors,
        ZpoolMetric::VdevOps,
        ZpoolMetric::VdevBytes,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ZpoolMetric::PoolState => "zfs_zpool_poolstate",
            ZpoolMetric::PoolStatus => "zfs_zpool_poolstatus",
            ZpoolMetric::CollectErrors => "zfs_zpool_collecterrors",
            ZpoolMetric::VdevState => "zfs_zpool_vdevstate",
            ZpoolMetric::VdevAllocated => "zfs_zpool_allocated_bytes",
            ZpoolMetric::VdevSpace => "zfs_zpool_space_bytes",
            ZpoolMetric::VdevFragmentation => "zfs_zpool_fragmentation_percent",
            ZpoolMetric::VdevErrors => "zfs_zpool_errors_total",
            ZpoolMetric::VdevOps => "zfs_zpool_vdevops_total",
            ZpoolMetric::VdevBytes => "zfs_zpool_vdevbytes_total",
        }
    }

    /// Help text. Enum-valued gauges list their values in code order.
    pub fn help(self) -> String {
        match self {
            ZpoolMetric::PoolState => format!(
                "pool state enum (-1 if unavailable): {}",
                enum_list(&PoolState::ALL, PoolState::name)
            ),
            ZpoolMetric::PoolStatus => format!(
                "pool status enum (-1 if unavailable): {}",
                enum_list(&PoolStatus::ALL, PoolStatus::name)
            ),
            ZpoolMetric::CollectErrors => "errors harvesting ZFS metrics".to_string(),
            ZpoolMetric::VdevState => format!(
                "vdev state: {}.",
                enum_list(&VdevState::ALL, VdevState::name)
            ),
            ZpoolMetric::VdevAllocated => "number of bytes allocated (usage)".to_string(),
            ZpoolMetric::VdevSpace => "size of the vdev in bytes (total capacity).".to_string(),
            ZpoolMetric::VdevFragmentation => "device fragmentation percentage".to_string(),
            ZpoolMetric::VdevErrors => "number of errors seen".to_string(),
            ZpoolMetric::VdevOps => "number of operations performed.".to_string(),
            ZpoolMetric::VdevBytes => "number of bytes handled".to_string(),
        }
    }

    pub fn kind(self) -> MetricKind {
        match self {
            ZpoolMetric::CollectErrors
            | ZpoolMetric::VdevErrors
            | ZpoolMetric::VdevOps
            | ZpoolMetric::VdevBytes => MetricKind::Counter,
            _ => MetricKind::Gauge,
        }
    }

    pub fn label_names(self) -> &'static [&'static str] {
        match self {
            ZpoolMetric::PoolState | ZpoolMetric::PoolStatus | ZpoolMetric::CollectErrors => {
                POOL_LABELS
            }
            ZpoolMetric::VdevErrors => VDEV_ERROR_LABELS,
            ZpoolMetric::VdevOps | ZpoolMetric::VdevBytes => VDEV_OP_LABELS,
            _ => VDEV_LABELS,
        }
    }
}

/// One observation: a metric family, its label values (in `label_names` order)
/// and a value.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub metric: ZpoolMetric,
    pub labels: Vec<String>,
    pub value: f64,
}

impl Sample {
    pub fn new(metric: ZpoolMetric, labels: Vec<String>, value: f64) -> Self {
        debug_assert_eq!(labels.len(), metric.label_names().len());
        Self {
            metric,
            labels,
            value,
        }
    }

    /// Value of the label called `name`
    pub fn label(&self, name: &str) -> Option<&str> {
        self.metric
            .label_names()
            .iter()
            .position(|label| *label == name)
            .and_then(|idx| self.labels.get(idx))
            .map(String::as_str)
    }
}

enum SeriesVec {
    Gauge(GaugeVec),
    Counter(CounterVec),
}

impl SeriesVec {
    fn new(metric: ZpoolMetric) -> prometheus::Result<Self> {
        let opts = Opts::new(metric.name(), metric.help());
        match metric.kind() {
            MetricKind::Gauge => GaugeVec::new(opts, metric.label_names()).map(SeriesVec::Gauge),
            MetricKind::Counter => {
                CounterVec::new(opts, metric.label_names()).map(SeriesVec::Counter)
            }
        }
    }

    fn observe(&self, labels: &[&str], value: f64) -> prometheus::Result<()> {
        match self {
            SeriesVec::Gauge(vec) => vec.get_metric_with_label_values(labels)?.set(value),
            SeriesVec::Counter(vec) => vec.get_metric_with_label_values(labels)?.inc_by(value),
        }
        Ok(())
    }

    fn desc(&self) -> Vec<&Desc> {
        match self {
            SeriesVec::Gauge(vec) => vec.desc(),
            SeriesVec::Counter(vec) => vec.desc(),
        }
    }

    fn collect(&self) -> Vec<MetricFamily> {
        match self {
            SeriesVec::Gauge(vec) => vec.collect(),
            SeriesVec::Counter(vec) => vec.collect(),
        }
    }
}

/// Turn a snapshot into metric families. Families without samples are left out.
fn build_families(samples: &[Sample]) -> prometheus::Result<Vec<MetricFamily>> {
    let mut families = Vec::new();
    for metric in ZpoolMetric::ALL {
        let mut series = samples.iter().filter(|s| s.metric == metric).peekable();
        if series.peek().is_none() {
            continue;
        }

        let vec = SeriesVec::new(metric)?;
        for sample in series {
            let labels: Vec<&str> = sample.labels.iter().map(String::as_str).collect();
            vec.observe(&labels, sample.value)?;
        }
        families.extend(vec.collect());
    }
    Ok(families)
}

/// Registry collector that exports the most recently published snapshot
struct SnapshotCollector {
    descriptors: Vec<SeriesVec>,
    snapshot: Arc<RwLock<Vec<Sample>>>,
}

impl Collector for SnapshotCollector {
    fn desc(&self) -> Vec<&Desc> {
        self.descriptors.iter().flat_map(SeriesVec::desc).collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let samples = self.snapshot.read().unwrap_or_else(PoisonError::into_inner);
        match build_families(&samples) {
            Ok(families) => families,
            Err(e) => {
                error!("Failed to build metric families: {}", e);
                Vec::new()
            }
        }
    }
}

/// Metrics registry for the exporter
#[derive(Clone)]
pub struct MetricsCollector {
    registry: Arc<Registry>,
    snapshot: Arc<RwLock<Vec<Sample>>>,
}

impl MetricsCollector {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();
        let snapshot = Arc::new(RwLock::new(Vec::new()));

        let descriptors = ZpoolMetric::ALL
            .into_iter()
            .map(SeriesVec::new)
            .collect::<prometheus::Result<Vec<_>>>()?;

        registry.register(Box::new(SnapshotCollector {
            descriptors,
            snapshot: snapshot.clone(),
        }))?;

        Ok(Self {
            registry: Arc::new(registry),
            snapshot,
        })
    }

    /// Replace the exported samples with the result of a collection pass
    pub fn publish(&self, samples: Vec<Sample>) {
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = samples;
    }

    /// Samples currently exported
    pub fn snapshot(&self) -> Vec<Sample> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Render metrics in Prometheus text format
    pub fn render(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
