//! Shared test doubles: an in-memory pool source and vdev tree builders.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Mutex;
use zpool_exporter::error::{ExporterError, Result};
use zpool_exporter::zfs::{
    DeviceTree, PoolHandle, PoolSource, PoolState, PoolStatus, Vdev, VdevState, VdevStats,
    VdevType,
};

#[derive(Debug, Clone)]
pub struct FakePool {
    pub name: String,
    pub state: PoolState,
    pub status: PoolStatus,
    pub tree: DeviceTree,
    pub fail_refresh: bool,
    pub fail_state: bool,
    pub fail_status: bool,
    pub fail_tree: bool,
}

impl FakePool {
    pub fn healthy(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: PoolState::Active,
            status: PoolStatus::Ok,
            tree: mirror_tree(name),
            fail_refresh: false,
            fail_state: false,
            fail_status: false,
            fail_tree: false,
        }
    }

    pub fn with_tree(mut self, tree: DeviceTree) -> Self {
        self.tree = tree;
        self
    }
}

/// In-memory [`PoolSource`] whose failures can be switched per pool
pub struct FakeSource {
    pools: Mutex<Vec<FakePool>>,
    fail_list: bool,
}

impl FakeSource {
    pub fn new(pools: Vec<FakePool>) -> Self {
        Self {
            pools: Mutex::new(pools),
            fail_list: false,
        }
    }

    pub fn failing_list() -> Self {
        Self {
            pools: Mutex::new(Vec::new()),
            fail_list: true,
        }
    }

    /// Change the behavior of `pool` for the following queries
    pub fn update(&self, pool: &str, change: impl FnOnce(&mut FakePool)) {
        let mut pools = self.pools.lock().unwrap();
        let entry = pools.iter_mut().find(|p| p.name == pool).unwrap();
        change(entry);
    }

    fn lookup(&self, pool: &PoolHandle) -> Result<FakePool> {
        self.pools
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.name == pool.name())
            .cloned()
            .ok_or_else(|| ExporterError::PoolNotFound(pool.name().to_string()))
    }
}

fn injected(what: &str, pool: &str) -> ExporterError {
    ExporterError::command("zpool", &[what, pool], "injected failure")
}

#[async_trait]
impl PoolSource for FakeSource {
    async fn list_pools(&self) -> Result<Vec<PoolHandle>> {
        if self.fail_list {
            return Err(ExporterError::command("zpool", &["list"], "no pools available"));
        }
        Ok(self
            .pools
            .lock()
            .unwrap()
            .iter()
            .map(|p| PoolHandle::new(p.name.clone()))
            .collect())
    }

    async fn refresh_stats(&self, pool: &PoolHandle) -> Result<()> {
        let fake = self.lookup(pool)?;
        if fake.fail_refresh {
            return Err(injected("refresh", pool.name()));
        }
        Ok(())
    }

    async fn state(&self, pool: &PoolHandle) -> Result<PoolState> {
        let fake = self.lookup(pool)?;
        if fake.fail_state {
            return Err(injected("state", pool.name()));
        }
        Ok(fake.state)
    }

    async fn status(&self, pool: &PoolHandle) -> Result<PoolStatus> {
        let fake = self.lookup(pool)?;
        if fake.fail_status {
            return Err(injected("status", pool.name()));
        }
        Ok(fake.status)
    }

    async fn device_tree(&self, pool: &PoolHandle) -> Result<DeviceTree> {
        let fake = self.lookup(pool)?;
        if fake.fail_tree {
            return Err(injected("tree", pool.name()));
        }
        Ok(fake.tree)
    }
}

pub fn disk(name: &str, seed: u64) -> Vdev {
    Vdev::new(name, VdevType::Disk).with_stats(VdevStats {
        state: VdevState::Healthy,
        alloc: 1_000 * seed,
        space: 10_000 * seed,
        fragmentation: seed % 100,
        read_errors: seed,
        write_errors: seed + 1,
        checksum_errors: seed + 2,
        ops: [0, 10 * seed, 20 * seed, 3, 0, 1],
        bytes: [0, 4096 * seed, 8192 * seed, 0, 0, 0],
    })
}

/// root → mirror-0 → {sda, sdb}
pub fn mirror_tree(pool: &str) -> DeviceTree {
    let mirror = Vdev::new("mirror-0", VdevType::Mirror)
        .with_stats(VdevStats {
            state: VdevState::Healthy,
            alloc: 2_000,
            space: 20_000,
            ..VdevStats::default()
        })
        .with_child(disk("sda", 1))
        .with_child(disk("sdb", 2));

    DeviceTree::new(
        Vdev::new(pool, VdevType::Root)
            .with_stats(VdevStats {
                state: VdevState::Healthy,
                ..VdevStats::default()
            })
            .with_child(mirror),
    )
}
