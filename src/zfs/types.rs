//! ZFS Resource Model
//!
//! Rust representations of the objects the pool-management facility hands back:
//! pool handles, the health and condition enumerations, and the vdev tree.
//!
//! # Enumerations
//!
//! The numeric codes of [`PoolState`], [`PoolStatus`] and [`VdevState`] follow the
//! declaration order of the native libzfs enums (`pool_state_t`, `zpool_status_t`,
//! `vdev_state_t`). Dashboards built against those codes keep working, so the
//! ordering must never change.

/// Handle to one pool returned by [`PoolSource::list_pools`](super::PoolSource::list_pools).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PoolHandle {
    name: String,
}

impl PoolHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Stable identity of the pool, taken from its name property
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Pool state (`pool_state_t`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    Active = 0,
    Exported,
    Destroyed,
    Spare,
    L2Cache,
    Uninitialized,
    Unavail,
    PotentiallyActive,
}

impl PoolState {
    pub const ALL: [PoolState; 8] = [
        PoolState::Active,
        PoolState::Exported,
        PoolState::Destroyed,
        PoolState::Spare,
        PoolState::L2Cache,
        PoolState::Uninitialized,
        PoolState::Unavail,
        PoolState::PotentiallyActive,
    ];

    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn name(self) -> &'static str {
        match self {
            PoolState::Active => "Active",
            PoolState::Exported => "Exported",
            PoolState::Destroyed => "Destroyed",
            PoolState::Spare => "Spare",
            PoolState::L2Cache => "L2cache",
            PoolState::Uninitialized => "uninitialized",
            PoolState::Unavail => "unavail",
            PoolState::PotentiallyActive => "potentiallyactive",
        }
    }
}

/// Pool condition (`zpool_status_t`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolStatus {
    CorruptCache = 0,
    MissingDevR,
    MissingDevNr,
    CorruptLabelR,
    CorruptLabelNr,
    BadGuidSum,
    CorruptPool,
    CorruptData,
    FailingDev,
    VersionNewer,
    HostidMismatch,
    IoFailureWait,
    IoFailureContinue,
    BadLog,
    Errata,
    UnsupFeatRead,
    UnsupFeatWrite,
    FaultedDevR,
    FaultedDevNr,
    VersionOlder,
    FeatDisabled,
    Resilvering,
    OfflineDev,
    RemovedDev,
    Ok,
}

impl PoolStatus {
    pub const ALL: [PoolStatus; 25] = [
        PoolStatus::CorruptCache,
        PoolStatus::MissingDevR,
        PoolStatus::MissingDevNr,
        PoolStatus::CorruptLabelR,
        PoolStatus::CorruptLabelNr,
        PoolStatus::BadGuidSum,
        PoolStatus::CorruptPool,
        PoolStatus::CorruptData,
        PoolStatus::FailingDev,
        PoolStatus::VersionNewer,
        PoolStatus::HostidMismatch,
        PoolStatus::IoFailureWait,
        PoolStatus::IoFailureContinue,
        PoolStatus::BadLog,
        PoolStatus::Errata,
        PoolStatus::UnsupFeatRead,
        PoolStatus::UnsupFeatWrite,
        PoolStatus::FaultedDevR,
        PoolStatus::FaultedDevNr,
        PoolStatus::VersionOlder,
        PoolStatus::FeatDisabled,
        PoolStatus::Resilvering,
        PoolStatus::OfflineDev,
        PoolStatus::RemovedDev,
        PoolStatus::Ok,
    ];

    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn name(self) -> &'static str {
        match self {
            PoolStatus::CorruptCache => "CorruptCache",
            PoolStatus::MissingDevR => "MissingDevR",
            PoolStatus::MissingDevNr => "MissingDevNr",
            PoolStatus::CorruptLabelR => "CorruptLabelR",
            PoolStatus::CorruptLabelNr => "CorruptLabelNr",
            PoolStatus::BadGuidSum => "BadGUIDSum",
            PoolStatus::CorruptPool => "CorruptPool",
            PoolStatus::CorruptData => "CorruptData",
            PoolStatus::FailingDev => "FailingDev",
            PoolStatus::VersionNewer => "VersionNewer",
            PoolStatus::HostidMismatch => "HostidMismatch",
            PoolStatus::IoFailureWait => "IoFailureWait",
            PoolStatus::IoFailureContinue => "IoFailureContinue",
            PoolStatus::BadLog => "BadLog",
            PoolStatus::Errata => "Errata",
            PoolStatus::UnsupFeatRead => "UnsupFeatRead",
            PoolStatus::UnsupFeatWrite => "UnsupFeatWrite",
            PoolStatus::FaultedDevR => "FaultedDevR",
            PoolStatus::FaultedDevNr => "FaultedDevNr",
            PoolStatus::VersionOlder => "VersionOlder",
            PoolStatus::FeatDisabled => "FeatDisabled",
            PoolStatus::Resilvering => "Resilvering",
            PoolStatus::OfflineDev => "OfflineDev",
            PoolStatus::RemovedDev => "RemovedDev",
            PoolStatus::Ok => "Ok",
        }
    }
}

/// Device health (`vdev_state_t`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VdevState {
    #[default]
    Unknown = 0,
    Closed,
    Offline,
    Removed,
    CantOpen,
    Faulted,
    Degraded,
    Healthy,
}

impl VdevState {
    pub const ALL: [VdevState; 8] = [
        VdevState::Unknown,
        VdevState::Closed,
        VdevState::Offline,
        VdevState::Removed,
        VdevState::CantOpen,
        VdevState::Faulted,
        VdevState::Degraded,
        VdevState::Healthy,
    ];

    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn name(self) -> &'static str {
        match self {
            VdevState::Unknown => "Unknown",
            VdevState::Closed => "Closed",
            VdevState::Offline => "Offline",
            VdevState::Removed => "Removed",
            VdevState::CantOpen => "CantOpen",
            VdevState::Faulted => "Faulted",
            VdevState::Degraded => "Degraded",
            VdevState::Healthy => "Healthy",
        }
    }

    /// Parse the health string printed by `zpool status`
    pub fn from_health(health: &str) -> Self {
        match health.to_ascii_uppercase().as_str() {
            "ONLINE" => VdevState::Healthy,
            "DEGRADED" => VdevState::Degraded,
            "FAULTED" => VdevState::Faulted,
            "UNAVAIL" => VdevState::CantOpen,
            "REMOVED" => VdevState::Removed,
            "OFFLINE" => VdevState::Offline,
            "CLOSED" => VdevState::Closed,
            _ => VdevState::Unknown,
        }
    }
}

/// Role of a vdev inside the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VdevType {
    Root,
    Mirror,
    Replacing,
    Raidz,
    Draid,
    Disk,
    File,
    Missing,
    Hole,
    Spare,
    Log,
    L2Cache,
    Other(String),
}

impl VdevType {
    pub fn as_str(&self) -> &str {
        match self {
            VdevType::Root => "root",
            VdevType::Mirror => "mirror",
            VdevType::Replacing => "replacing",
            VdevType::Raidz => "raidz",
            VdevType::Draid => "draid",
            VdevType::Disk => "disk",
            VdevType::File => "file",
            VdevType::Missing => "missing",
            VdevType::Hole => "hole",
            VdevType::Spare => "spare",
            VdevType::Log => "log",
            VdevType::L2Cache => "l2cache",
            VdevType::Other(other) => other,
        }
    }
}

impl From<&str> for VdevType {
    fn from(value: &str) -> Self {
        match value {
            "root" => VdevType::Root,
            "mirror" => VdevType::Mirror,
            "replacing" => VdevType::Replacing,
            "raidz" => VdevType::Raidz,
            "draid" => VdevType::Draid,
            "disk" => VdevType::Disk,
            "file" => VdevType::File,
            "missing" => VdevType::Missing,
            "hole" => VdevType::Hole,
            "spare" => VdevType::Spare,
            "log" => VdevType::Log,
            "l2cache" => VdevType::L2Cache,
            other => VdevType::Other(other.to_string()),
        }
    }
}

/// I/O operation category (`zio_type_t`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZioType {
    Null = 0,
    Read,
    Write,
    Free,
    Claim,
    Ioctl,
}

impl ZioType {
    pub const COUNT: usize = 6;

    pub const ALL: [ZioType; ZioType::COUNT] = [
        ZioType::Null,
        ZioType::Read,
        ZioType::Write,
        ZioType::Free,
        ZioType::Claim,
        ZioType::Ioctl,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Value of the `vdevoptype` label
    pub fn label(self) -> &'static str {
        match self {
            ZioType::Null => "Null",
            ZioType::Read => "Read",
            ZioType::Write => "Write",
            ZioType::Free => "Free",
            ZioType::Claim => "Claim",
            ZioType::Ioctl => "IoCtl",
        }
    }
}

/// Statistics of a single vdev
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VdevStats {
    pub state: VdevState,
    /// Allocated bytes
    pub alloc: u64,
    /// Total capacity in bytes
    pub space: u64,
    /// Free space fragmentation, 0-100
    pub fragmentation: u64,
    pub read_errors: u64,
    pub write_errors: u64,
    pub checksum_errors: u64,
    /// Operation counts indexed by [`ZioType::index`]
    pub ops: [u64; ZioType::COUNT],
    /// Byte counts indexed by [`ZioType::index`]
    pub bytes: [u64; ZioType::COUNT],
}

/// A node of a pool's device tree. Children are owned exclusively by their parent.
#[derive(Debug, Clone, PartialEq)]
pub struct Vdev {
    pub name: String,
    pub vdev_type: VdevType,
    pub stats: VdevStats,
    pub children: Vec<Vdev>,
}

impl Vdev {
    pub fn new(name: impl Into<String>, vdev_type: VdevType) -> Self {
        Self {
            name: name.into(),
            vdev_type,
            stats: VdevStats::default(),
            children: Vec::new(),
        }
    }

    pub fn with_stats(mut self, stats: VdevStats) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_child(mut self, child: Vdev) -> Self {
        self.children.push(child);
        self
    }
}

/// Device hierarchy of one pool. `root` is `None` for a pool without devices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceTree {
    pub root: Option<Vdev>,
}

impl DeviceTree {
    pub fn new(root: Vdev) -> Self {
        Self { root: Some(root) }
    }

    pub fn empty() -> Self {
        Self { root: None }
    }
}
