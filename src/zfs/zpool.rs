//! `zpool` Command Line Adapter
//!
//! Implements [`PoolSource`] on top of the `zpool` utility shipped with OpenZFS.
//!
//! # Commands
//!
//! - `zpool list -H -o name` → pool enumeration
//! - `zpool status -j --json-int -p <pool>` → vdev tree, health and error counters
//! - `zpool get -Hp -o name,property,value <props> <pool> all-vdevs` →
//!   fragmentation and cumulative per-type operation and byte counters
//!
//! `refresh_stats` runs `zpool status`, merges the vdev properties into the
//! parsed tree and caches it per pool; the state, status and tree queries answer
//! from that cache. When `zpool status` fails the cache entry is dropped, so a
//! pool that stopped answering reports no devices instead of its last known ones.
//! When only the property query fails the fresh tree is cached without counters
//! and the refresh still reports the error.
//!
//! # JSON Layout
//!
//! ```text
//! { "pools": { "tank": { "name": "tank", "state": "ONLINE",
//!     "vdevs":   { "tank": { "vdev_type": "root", ..., "vdevs": { ... } } },
//!     "logs":    { ... }, "l2cache": { ... }, "spares": { ... } } } }
//! ```
//!
//! Child maps are read in document order (`serde_json/preserve_order`).
//! OpenZFS has no vdev property for ioctl operations, so the `IoCtl` series
//! stays zero.

use super::command::{CommandExecutor, SystemCommandExecutor};
use super::source::PoolSource;
use super::types::{
    DeviceTree, PoolHandle, PoolState, PoolStatus, Vdev, VdevState, VdevStats, VdevType,
    ZioType,
};
use crate::error::{ExporterError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

#[derive(Debug, Deserialize)]
struct StatusDocument {
    #[serde(default)]
    pools: HashMap<String, PoolEntry>,
}

#[derive(Debug, Deserialize)]
struct PoolEntry {
    #[serde(default)]
    vdevs: Map<String, Value>,
    #[serde(default)]
    logs: Map<String, Value>,
    #[serde(default)]
    l2cache: Map<String, Value>,
    #[serde(default)]
    spares: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct VdevEntry {
    name: String,
    #[serde(default)]
    vdev_type: Option<String>,
    #[serde(default)]
    state: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    alloc_space: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    total_space: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    read_errors: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    write_errors: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    checksum_errors: u64,
    #[serde(default)]
    vdevs: Map<String, Value>,
}

/// Accepts `12`, `"12"` and `"12%"`; `"-"` (not applicable) reads as zero.
fn lenient_u64<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Int(n) => Ok(n),
        Raw::Text(text) => parse_number(&text).map_err(serde::de::Error::custom),
    }
}

fn parse_number(text: &str) -> std::result::Result<u64, std::num::ParseIntError> {
    let text = text.trim().trim_end_matches('%');
    if text.is_empty() || text == "-" {
        return Ok(0);
    }
    text.parse()
}

impl VdevEntry {
    fn into_vdev(self, type_override: Option<VdevType>) -> Result<Vdev> {
        let vdev_type = type_override.unwrap_or_else(|| {
            self.vdev_type
                .as_deref()
                .map(VdevType::from)
                .unwrap_or(VdevType::Disk)
        });

        let stats = VdevStats {
            state: VdevState::from_health(&self.state),
            alloc: self.alloc_space,
            space: self.total_space,
            read_errors: self.read_errors,
            write_errors: self.write_errors,
            checksum_errors: self.checksum_errors,
            ..VdevStats::default()
        };

        Ok(Vdev {
            name: self.name,
            vdev_type,
            stats,
            children: parse_children(self.vdevs, None)?,
        })
    }
}

fn parse_children(map: Map<String, Value>, type_override: Option<VdevType>) -> Result<Vec<Vdev>> {
    map.into_iter()
        .map(|(_, value)| {
            let entry: VdevEntry = serde_json::from_value(value)?;
            entry.into_vdev(type_override.clone())
        })
        .collect()
}

/// Parse `zpool status -j` output and build the device tree of `pool`.
///
/// Top-level members of the `logs`, `l2cache` and `spares` sections are attached
/// under the root and tagged with the section's role.
pub fn parse_status(json: &str, pool: &str) -> Result<DeviceTree> {
    let mut document: StatusDocument = serde_json::from_str(json)?;
    let entry = document
        .pools
        .remove(pool)
        .ok_or_else(|| ExporterError::PoolNotFound(pool.to_string()))?;

    let mut roots = parse_children(entry.vdevs, None)?.into_iter();
    let Some(mut root) = roots.next() else {
        return Ok(DeviceTree::empty());
    };
    root.children.extend(roots);
    root.children
        .extend(parse_children(entry.logs, Some(VdevType::Log))?);
    root.children
        .extend(parse_children(entry.l2cache, Some(VdevType::L2Cache))?);
    root.children
        .extend(parse_children(entry.spares, Some(VdevType::Spare))?);

    Ok(DeviceTree::new(root))
}

/// Parse `zpool list -H -o name` output
pub fn parse_pool_list(output: &str) -> Vec<PoolHandle> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PoolHandle::new)
        .collect()
}

/// Vdev properties requested from `zpool get`
pub const VDEV_PROPERTIES: &str = "fragmentation,\
null_ops,read_ops,write_ops,free_ops,claim_ops,\
null_bytes,read_bytes,write_bytes,free_bytes,claim_bytes";

/// Names `zpool get ... all-vdevs` uses for the root vdev
const ROOT_VDEV_NAMES: [&str; 2] = ["root-0", "root"];

fn counter_slot(prefix: &str) -> Option<usize> {
    let op = match prefix {
        "null" => ZioType::Null,
        "read" => ZioType::Read,
        "write" => ZioType::Write,
        "free" => ZioType::Free,
        "claim" => ZioType::Claim,
        _ => return None,
    };
    Some(op.index())
}

/// Properties of one vdev as reported by `zpool get`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VdevProperties {
    pub fragmentation: u64,
    pub ops: [u64; ZioType::COUNT],
    pub bytes: [u64; ZioType::COUNT],
}

impl VdevProperties {
    fn apply(&self, stats: &mut VdevStats) {
        stats.fragmentation = self.fragmentation;
        stats.ops = self.ops;
        stats.bytes = self.bytes;
    }
}

/// Parse `zpool get -Hp -o name,property,value` output, keyed by vdev name.
///
/// Unknown properties are ignored; a value that is not a number fails the parse.
pub fn parse_vdev_properties(output: &str) -> Result<HashMap<String, VdevProperties>> {
    let mut vdevs: HashMap<String, VdevProperties> = HashMap::new();

    for line in output.lines().filter(|line| !line.trim().is_empty()) {
        let fields: Vec<&str> = line.split('\t').collect();
        let [name, property, value] = fields[..] else {
            return Err(ExporterError::Parse(format!(
                "expected name, property and value: '{}'",
                line
            )));
        };
        let value = parse_number(value).map_err(|e| {
            ExporterError::Parse(format!("{} of {}: '{}' ({})", property, name, value, e))
        })?;

        let entry = vdevs.entry(name.to_string()).or_default();
        if property == "fragmentation" {
            entry.fragmentation = value;
        } else if let Some((prefix, kind)) = property.rsplit_once('_') {
            let slot = counter_slot(prefix);
            match (slot, kind) {
                (Some(slot), "ops") => entry.ops[slot] = value,
                (Some(slot), "bytes") => entry.bytes[slot] = value,
                _ => {}
            }
        }
    }

    Ok(vdevs)
}

fn merge_vdev(vdev: &mut Vdev, properties: &HashMap<String, VdevProperties>) -> usize {
    let mut merged = 0;
    if let Some(found) = properties.get(&vdev.name) {
        found.apply(&mut vdev.stats);
        merged += 1;
    }
    for child in &mut vdev.children {
        merged += merge_vdev(child, properties);
    }
    merged
}

/// Copy fragmentation and I/O counters into the matching vdevs of `tree`.
///
/// Vdevs are matched by name; the root also answers to `root-0` and `root`.
/// Vdevs missing from `properties` keep their values.
/// Returns the number of vdevs that were updated.
pub fn merge_vdev_properties(
    tree: &mut DeviceTree,
    properties: &HashMap<String, VdevProperties>,
) -> usize {
    let Some(root) = tree.root.as_mut() else {
        return 0;
    };

    let root_properties = properties
        .get(&root.name)
        .or_else(|| ROOT_VDEV_NAMES.iter().find_map(|name| properties.get(*name)));

    let mut merged = 0;
    if let Some(found) = root_properties {
        found.apply(&mut root.stats);
        merged += 1;
    }
    for child in &mut root.children {
        merged += merge_vdev(child, properties);
    }
    merged
}

/// Classify a pool's condition from the health of its devices.
///
/// `zpool status` reports the condition only as prose, so this approximates the
/// `zpool_status_t` code from the worst device state found in the tree.
pub fn derive_status(tree: &DeviceTree) -> PoolStatus {
    let Some(root) = tree.root.as_ref() else {
        return PoolStatus::Ok;
    };
    if matches!(root.stats.state, VdevState::Faulted | VdevState::CantOpen) {
        return PoolStatus::FaultedDevNr;
    }

    let mut missing_group = false;
    let (mut faulted, mut missing, mut removed, mut offline) = (false, false, false, false);
    for child in &root.children {
        child.walk(&mut |vdev: &Vdev| match vdev.stats.state {
            VdevState::Faulted => faulted = true,
            // An unopenable group takes its data with it
            VdevState::CantOpen if !vdev.children.is_empty() => missing_group = true,
            VdevState::CantOpen => missing = true,
            VdevState::Removed => removed = true,
            VdevState::Offline => offline = true,
            _ => {}
        });
    }

    if missing_group {
        PoolStatus::MissingDevNr
    } else if faulted {
        PoolStatus::FaultedDevR
    } else if missing {
        PoolStatus::MissingDevR
    } else if removed {
        PoolStatus::RemovedDev
    } else if offline {
        PoolStatus::OfflineDev
    } else {
        PoolStatus::Ok
    }
}

/// [`PoolSource`] backed by the `zpool` command
pub struct ZpoolCli<E = SystemCommandExecutor> {
    executor: E,
    command: String,
    trees: Mutex<HashMap<String, DeviceTree>>,
}

impl ZpoolCli<SystemCommandExecutor> {
    pub fn new(command: impl Into<String>) -> Self {
        Self::with_executor(command, SystemCommandExecutor)
    }
}

impl<E: CommandExecutor> ZpoolCli<E> {
    pub fn with_executor(command: impl Into<String>, executor: E) -> Self {
        Self {
            executor,
            command: command.into(),
            trees: Mutex::new(HashMap::new()),
        }
    }

    async fn fetch_tree(&self, pool: &PoolHandle) -> Result<DeviceTree> {
        let output = self
            .executor
            .execute(
                &self.command,
                &["status", "-j", "--json-int", "-p", pool.name()],
            )
            .await?;
        parse_status(&output, pool.name())
    }

    /// Merge fragmentation and I/O counters into `tree`. On failure the tree is
    /// returned unchanged along with the error.
    async fn with_vdev_properties(
        &self,
        pool: &PoolHandle,
        mut tree: DeviceTree,
    ) -> (DeviceTree, Result<()>) {
        let output = self
            .executor
            .execute(
                &self.command,
                &[
                    "get",
                    "-Hp",
                    "-o",
                    "name,property,value",
                    VDEV_PROPERTIES,
                    pool.name(),
                    "all-vdevs",
                ],
            )
            .await;

        match output.and_then(|output| parse_vdev_properties(&output)) {
            Ok(properties) => {
                let merged = merge_vdev_properties(&mut tree, &properties);
                debug!(
                    "Merged properties of {} vdevs into pool '{}'",
                    merged,
                    pool.name()
                );
                (tree, Ok(()))
            }
            Err(e) => (tree, Err(e)),
        }
    }

    fn forget(&self, pool: &PoolHandle) {
        self.trees
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(pool.name());
    }

    fn cached_tree(&self, pool: &PoolHandle) -> Result<DeviceTree> {
        self.trees
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(pool.name())
            .cloned()
            .ok_or_else(|| ExporterError::NotRefreshed(pool.name().to_string()))
    }
}

#[async_trait]
impl<E: CommandExecutor> PoolSource for ZpoolCli<E> {
    async fn list_pools(&self) -> Result<Vec<PoolHandle>> {
        let output = self
            .executor
            .execute(&self.command, &["list", "-H", "-o", "name"])
            .await?;
        Ok(parse_pool_list(&output))
    }

    async fn refresh_stats(&self, pool: &PoolHandle) -> Result<()> {
        let tree = match self.fetch_tree(pool).await {
            Ok(tree) => tree,
            Err(e) => {
                // Never answer for a pool from a tree it no longer reports
                self.forget(pool);
                return Err(e);
            }
        };
        let (tree, counters) = self.with_vdev_properties(pool, tree).await;

        debug!(
            "Refreshed pool '{}' ({} vdevs)",
            pool.name(),
            tree.node_count()
        );
        self.trees
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(pool.name().to_string(), tree);
        counters
    }

    async fn state(&self, pool: &PoolHandle) -> Result<PoolState> {
        // Only imported pools show up in `zpool status`
        self.cached_tree(pool).map(|_| PoolState::Active)
    }

    async fn status(&self, pool: &PoolHandle) -> Result<PoolStatus> {
        self.cached_tree(pool).map(|tree| derive_status(&tree))
    }

    async fn device_tree(&self, pool: &PoolHandle) -> Result<DeviceTree> {
        self.cached_tree(pool)
    }
}
