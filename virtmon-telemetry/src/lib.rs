//! # virtmon Telemetry
//!
//! Host statistics for the exporter: uptime, CPU time by mode, memory
//! totals, kernel block device counters, network device counters and the
//! node identity.
//!
//! Kernel files are read from configurable proc and sys roots so tests can
//! point the collector at a fixture directory. Every fetch is independent; a
//! failure of one does not affect the others.

pub mod cpu;
pub mod disk;
pub mod error;
pub mod memory;
pub mod network;
pub mod system;

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use sysinfo::Networks;
use tracing::{debug, warn};

pub use cpu::{CpuStat, CpuTimes};
pub use disk::DiskStats;
pub use error::{Result, TelemetryError};
pub use memory::MemoryInfo;
pub use network::NetworkStats;
pub use system::NodeIdentity;

/// Default location of the proc filesystem.
pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// Default location of the sys filesystem.
pub const DEFAULT_SYS_ROOT: &str = "/sys";

/// Collector for host statistics.
///
/// Holds the network interface list between scrapes so sysinfo can refresh
/// counters in place; everything else is read fresh on every call.
pub struct TelemetryCollector {
    proc_root: PathBuf,
    sys_root: PathBuf,
    networks: Mutex<Networks>,
    identity: NodeIdentity,
}

impl TelemetryCollector {
    /// Create a collector reading kernel files under `proc_root`.
    pub fn new(proc_root: impl Into<PathBuf>) -> Self {
        let proc_root = proc_root.into();
        let identity = system::collect_node_identity();
        debug!(
            proc_root = %proc_root.display(),
            hostname = %identity.hostname,
            "TelemetryCollector initialized"
        );
        Self {
            proc_root,
            sys_root: PathBuf::from(DEFAULT_SYS_ROOT),
            networks: Mutex::new(Networks::new_with_refreshed_list()),
            identity,
        }
    }

    /// Read interface flags under `sys_root` instead of `/sys`.
    pub fn with_sys_root(mut self, sys_root: impl Into<PathBuf>) -> Self {
        self.sys_root = sys_root.into();
        self
    }

    /// The proc root this collector reads from.
    pub fn proc_root(&self) -> &Path {
        &self.proc_root
    }

    /// Hostname and kernel version.
    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    /// Seconds since boot.
    pub fn uptime(&self) -> Result<f64> {
        system::read_uptime(&self.proc_root)
    }

    /// Cumulative CPU time by mode and logical core count.
    pub fn cpu(&self) -> Result<CpuStat> {
        cpu::read_cpu_stat(&self.proc_root)
    }

    /// Memory totals.
    pub fn memory(&self) -> Result<MemoryInfo> {
        memory::read_memory_info(&self.proc_root)
    }

    /// Counters of every whole block device.
    pub fn disks(&self) -> Result<Vec<DiskStats>> {
        disk::read_disk_stats(&self.proc_root)
    }

    /// Counters, link state and addresses of every network interface,
    /// refreshed on each call.
    pub fn networks(&self) -> Result<Vec<NetworkStats>> {
        let addresses = local_ip_address::list_afinet_netifas().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to list interface addresses");
            Vec::new()
        });
        let mut networks = self.networks.lock().map_err(|_| TelemetryError::Poisoned)?;
        // Pick up interfaces created since the last scrape (e.g. new vnetN)
        networks.refresh_list();
        Ok(network::collect_network_stats(&networks, &self.sys_root, &addresses))
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new(DEFAULT_PROC_ROOT)
    }
}
