//! Metrics Collectors
//!
//! This module turns the pools reported by a [`PoolSource`] into flat, labeled
//! [`Sample`]s.
//!
//! # Architecture
//!
//! - [`pool`] - per-pool extraction and failure accounting
//! - [`vdev`] - per-vdev extraction, driven by the tree walk
//! - [`ZpoolCollector`] - runs a collection pass over every pool
//!
//! # Error Handling
//!
//! Query failures never abort a pass. They are logged, replaced by a sentinel or
//! a skipped tree, and counted in [`PoolErrorCounts`], which lives as long as the
//! collector does. A failing pool never hides the other pools.

use crate::error::Result;
use crate::metrics::Sample;
use crate::zfs::{PoolHandle, PoolSource};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub mod pool;
pub mod vdev;

pub use pool::collect_pool_metrics;
pub use vdev::vdev_samples;

/// Collection errors per pool name. Entries are never removed or reset.
#[derive(Debug, Default, Clone)]
pub struct PoolErrorCounts {
    counts: HashMap<String, u64>,
}

impl PoolErrorCounts {
    /// Make sure `pool` has a counter, starting at zero
    pub fn register(&mut self, pool: &str) {
        if !self.counts.contains_key(pool) {
            self.counts.insert(pool.to_string(), 0);
        }
    }

    /// Count one failed query for `pool`
    pub fn record(&mut self, pool: &str) {
        *self.counts.entry(pool.to_string()).or_insert(0) += 1;
    }

    pub fn get(&self, pool: &str) -> u64 {
        self.counts.get(pool).copied().unwrap_or(0)
    }

    pub fn contains(&self, pool: &str) -> bool {
        self.counts.contains_key(pool)
    }
}

/// Runs collection passes over the pools found at startup.
///
/// The error counters sit behind an async mutex that is held for a whole pass,
/// so concurrent callers of [`collect`](Self::collect) run one after another.
pub struct ZpoolCollector {
    source: Arc<dyn PoolSource>,
    pools: Vec<PoolHandle>,
    errors: Mutex<PoolErrorCounts>,
}

impl ZpoolCollector {
    /// Enumerate the pools once. The pool list is fixed for the collector's lifetime.
    pub async fn init(source: Arc<dyn PoolSource>) -> Result<Self> {
        let pools = source.list_pools().await?;

        let mut errors = PoolErrorCounts::default();
        for pool in &pools {
            errors.register(pool.name());
        }

        info!(
            "Found {} pools: [{}]",
            pools.len(),
            pools
                .iter()
                .map(PoolHandle::name)
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Self {
            source,
            pools,
            errors: Mutex::new(errors),
        })
    }

    pub fn pools(&self) -> &[PoolHandle] {
        &self.pools
    }

    /// Run one collection pass, pools in enumeration order
    pub async fn collect(&self) -> Vec<Sample> {
        let mut errors = self.errors.lock().await;
        let mut samples = Vec::new();

        for pool in &self.pools {
            collect_pool_metrics(self.source.as_ref(), pool, &mut errors, &mut samples).await;
        }

        debug!(
            "Collection pass finished: {} pools, {} samples",
            self.pools.len(),
            samples.len()
        );
        samples
    }

    /// Cumulative collection errors of `pool`
    pub async fn error_count(&self, pool: &str) -> u64 {
        self.errors.lock().await.get(pool)
    }
}
