//! Resource Query Adapter
//!
//! [`PoolSource`] is the boundary to the facility that knows about pools. The
//! collectors only ever talk to this trait, which lets tests drive them with
//! in-memory pools and lets the binary plug in [`ZpoolCli`](super::ZpoolCli).
//!
//! No timeout is applied to any call. A hung query blocks the pass that issued it.

use super::types::{DeviceTree, PoolHandle, PoolState, PoolStatus};
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait PoolSource: Send + Sync {
    /// Enumerate the currently imported pools
    async fn list_pools(&self) -> Result<Vec<PoolHandle>>;

    /// Bring the pool's statistics up to date. A failure leaves the handle usable.
    async fn refresh_stats(&self, pool: &PoolHandle) -> Result<()>;

    async fn state(&self, pool: &PoolHandle) -> Result<PoolState>;

    async fn status(&self, pool: &PoolHandle) -> Result<PoolStatus>;

    async fn device_tree(&self, pool: &PoolHandle) -> Result<DeviceTree>;
}
