//! Pool Metrics Collector
//!
//! Collects one pool per call: state, status, the cumulative collection error
//! counter and, through the tree walk, every vdev of the pool.
//!
//! # Metrics Produced
//! - `zfs_zpool_poolstate` - pool state code, -1 when the query failed
//!   - Labels: poolname
//! - `zfs_zpool_poolstatus` - pool status code, -1 when the query failed
//!   - Labels: poolname
//! - `zfs_zpool_collecterrors` - errors seen while collecting this pool
//!   - Labels: poolname
//! - all vdev metrics, see [`super::vdev`]
//!
//! # Failure Handling
//!
//! Every failed query adds one to the pool's error counter and is logged.
//! A failed stats refresh or state/status query does not stop the pool's
//! collection. A failed tree query skips the vdev metrics of the pool for
//! this pass; vdev values are never made up.

use super::vdev::vdev_samples;
use super::PoolErrorCounts;
use crate::metrics::{Sample, ZpoolMetric};
use crate::zfs::{PoolHandle, PoolSource, PoolState, PoolStatus};
use tracing::{debug, warn};

/// Value exported in place of a state or status code that could not be read
pub const QUERY_FAILED: f64 = -1.0;

/// State and status samples of a pool. `None` is exported as [`QUERY_FAILED`].
pub fn pool_samples(
    pool: &str,
    state: Option<PoolState>,
    status: Option<PoolStatus>,
) -> [Sample; 2] {
    [
        Sample::new(
            ZpoolMetric::PoolState,
            vec![pool.to_string()],
            state.map_or(QUERY_FAILED, |s| s.code() as f64),
        ),
        Sample::new(
            ZpoolMetric::PoolStatus,
            vec![pool.to_string()],
            status.map_or(QUERY_FAILED, |s| s.code() as f64),
        ),
    ]
}

pub fn collect_errors_sample(pool: &str, errors: u64) -> Sample {
    Sample::new(
        ZpoolMetric::CollectErrors,
        vec![pool.to_string()],
        errors as f64,
    )
}

/// Collects the samples of one pool into `samples`
pub async fn collect_pool_metrics(
    source: &dyn PoolSource,
    pool: &PoolHandle,
    errors: &mut PoolErrorCounts,
    samples: &mut Vec<Sample>,
) {
    let name = pool.name();
    errors.register(name);

    if let Err(e) = source.refresh_stats(pool).await {
        warn!("Unable to refresh stats for pool '{}': {}", name, e);
        errors.record(name);
    }

    let state = match source.state(pool).await {
        Ok(state) => Some(state),
        Err(e) => {
            warn!("Error getting state of pool '{}': {}", name, e);
            errors.record(name);
            None
        }
    };

    let status = match source.status(pool).await {
        Ok(status) => Some(status),
        Err(e) => {
            warn!("Error getting status of pool '{}': {}", name, e);
            errors.record(name);
            None
        }
    };

    samples.extend(pool_samples(name, state, status));

    let tree = match source.device_tree(pool).await {
        Ok(tree) => Some(tree),
        Err(e) => {
            warn!("Unable to read vdev tree for pool '{}': {}", name, e);
            errors.record(name);
            None
        }
    };

    samples.push(collect_errors_sample(name, errors.get(name)));

    if let Some(tree) = tree {
        tree.walk(|vdev| samples.extend(vdev_samples(name, vdev)));
        debug!(
            "Collected pool '{}' ({} vdevs, {} errors so far)",
            name,
            tree.node_count(),
            errors.get(name)
        );
    }
}
