//! VDev Metrics Extractor
//!
//! Maps one node of a device tree to its samples.
//!
//! # Metrics Produced
//! - `zfs_zpool_vdevstate`, `zfs_zpool_allocated_bytes`, `zfs_zpool_space_bytes`,
//!   `zfs_zpool_fragmentation_percent` - one row each
//!   - Labels: poolname, vdevtype, vdevname
//! - `zfs_zpool_errors_total` - one row per error kind (read, write, checksum)
//!   - Labels: poolname, vdevtype, vdevname, errortype
//! - `zfs_zpool_vdevops_total`, `zfs_zpool_vdevbytes_total` - one row per
//!   operation type (Null, Read, Write, Free, Claim, IoCtl), zeros included
//!   - Labels: poolname, vdevtype, vdevname, vdevoptype

use crate::metrics::{Sample, ZpoolMetric};
use crate::zfs::{Vdev, ZioType};

/// Samples emitted for every vdev
pub const SAMPLES_PER_VDEV: usize = 4 + 3 + 2 * ZioType::COUNT;

fn labels(pool: &str, vdev: &Vdev, extra: Option<&str>) -> Vec<String> {
    let mut labels = vec![
        pool.to_string(),
        vdev.vdev_type.as_str().to_string(),
        vdev.name.clone(),
    ];
    labels.extend(extra.map(str::to_string));
    labels
}

/// Extract the samples describing `vdev`, which belongs to `pool`
pub fn vdev_samples(pool: &str, vdev: &Vdev) -> Vec<Sample> {
    let stats = &vdev.stats;
    let mut samples = Vec::with_capacity(SAMPLES_PER_VDEV);

    let gauges = [
        (ZpoolMetric::VdevState, stats.state.code() as f64),
        (ZpoolMetric::VdevAllocated, stats.alloc as f64),
        (ZpoolMetric::VdevSpace, stats.space as f64),
        (ZpoolMetric::VdevFragmentation, stats.fragmentation as f64),
    ];
    for (metric, value) in gauges {
        samples.push(Sample::new(metric, labels(pool, vdev, None), value));
    }

    let errors = [
        ("read", stats.read_errors),
        ("write", stats.write_errors),
        ("checksum", stats.checksum_errors),
    ];
    for (kind, count) in errors {
        samples.push(Sample::new(
            ZpoolMetric::VdevErrors,
            labels(pool, vdev, Some(kind)),
            count as f64,
        ));
    }

    for op in ZioType::ALL {
        samples.push(Sample::new(
            ZpoolMetric::VdevOps,
            labels(pool, vdev, Some(op.label())),
            stats.ops[op.index()] as f64,
        ));
    }
    for op in ZioType::ALL {
        samples.push(Sample::new(
            ZpoolMetric::VdevBytes,
            labels(pool, vdev, Some(op.label())),
            stats.bytes[op.index()] as f64,
        ));
    }

    samples
}
