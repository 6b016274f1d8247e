//! Connection session abstraction.
//!
//! A [`Connector`] opens one [`Session`] per scrape. The session and every
//! handle it hands out release their underlying hypervisor resource when
//! dropped, so release happens exactly once on every exit path, including
//! early returns and unwinding.
//!
//! The hypervisor API is blocking, so these traits are synchronous; callers
//! in async contexts run a whole cycle on a blocking thread.

use crate::error::Result;
use crate::types::*;

/// Opens sessions against a hypervisor management endpoint.
pub trait Connector: Send + Sync {
    /// Open a new session for the given connection URI.
    fn open(&self, uri: &str) -> Result<Box<dyn Session>>;

    /// Short backend name for logs (e.g. "libvirt", "mock").
    fn name(&self) -> &'static str;
}

/// One open management connection. Closed on drop.
pub trait Session {
    /// Versions of hypervisor, daemon and client library.
    fn versions(&self) -> Result<VersionInfo>;

    /// Bulk statistics for every domain, running and shut-off.
    fn all_domain_stats(&self) -> Result<Vec<DomainStatsRecord>>;

    /// Handles to every active storage pool.
    fn active_storage_pools(&self) -> Result<Vec<Box<dyn StoragePoolHandle>>>;
}

/// One record of the bulk statistics call. Owns its domain handle.
pub struct DomainStatsRecord {
    pub domain: Box<dyn DomainHandle>,
    pub stats: DomainStats,
}

impl std::fmt::Debug for DomainStatsRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainStatsRecord")
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

/// A referenced domain. Released on drop.
pub trait DomainHandle {
    /// Current domain name.
    fn name(&self) -> Result<String>;

    /// Stable domain UUID in canonical string form.
    fn uuid(&self) -> Result<String>;

    /// Configuration descriptor (XML).
    fn xml_desc(&self) -> Result<String>;

    /// State, memory, vCPU count and CPU time.
    fn info(&self) -> Result<DomainInfo>;

    /// Per-vCPU state, time and host CPU for up to `max` vCPUs.
    ///
    /// Fails with `OperationInvalid` for domains that are not running.
    fn vcpus(&self, max: u32) -> Result<Vec<VcpuInfo>>;

    /// Balloon driver memory statistics as `(tag, value)` pairs.
    fn memory_stats(&self) -> Result<Vec<MemoryStat>>;

    /// Block I/O throttling parameters of one device.
    fn block_io_tune(&self, device: &str) -> Result<BlockIoTune>;
}

/// A referenced storage pool. Released on drop.
pub trait StoragePoolHandle {
    /// Re-read the pool's live state from its backend.
    fn refresh(&self) -> Result<()>;

    fn name(&self) -> Result<String>;

    fn info(&self) -> Result<PoolInfo>;
}
