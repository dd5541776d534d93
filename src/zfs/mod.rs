pub mod command;
pub mod source;
pub mod tree;
pub mod types;
pub mod zpool;

pub use command::{CommandExecutor, SystemCommandExecutor};
pub use source::PoolSource;
pub use types::{
    DeviceTree, PoolHandle, PoolState, PoolStatus, Vdev, VdevState, VdevStats, VdevType, ZioType,
};
pub use zpool::ZpoolCli;
