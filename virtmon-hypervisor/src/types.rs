//! Type definitions for hypervisor statistics and identifiers.
//!
//! Every field that the hypervisor may or may not populate is an `Option`.
//! `None` means the hypervisor did not report the value; it is never a
//! stand-in for zero.

use serde::Serialize;
use std::fmt;

// =============================================================================
// VERSIONS
// =============================================================================

/// A three-component version decoded from libvirt's packed integer form
/// (`major * 1_000_000 + minor * 1_000 + patch`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    /// Decode a packed version number.
    pub fn from_packed(v: u64) -> Self {
        Self {
            major: (v / 1_000_000 % 1000) as u32,
            minor: (v / 1000 % 1000) as u32,
            patch: (v % 1000) as u32,
        }
    }

    /// Encode back to the packed form.
    pub fn to_packed(self) -> u64 {
        u64::from(self.major) * 1_000_000 + u64::from(self.minor) * 1000 + u64::from(self.patch)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Versions of the virtualization components behind a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VersionInfo {
    /// Hypervisor driver (e.g. QEMU)
    pub hypervisor: Version,
    /// Management daemon (libvirtd) the connection talks to
    pub daemon: Version,
    /// Client library linked into this process
    pub library: Version,
}

// =============================================================================
// TYPED PARAMETERS
// =============================================================================

/// Value of one typed parameter as returned by bulk calls.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Int(i32),
    UInt(u32),
    LLong(i64),
    ULLong(u64),
    Double(f64),
    Boolean(bool),
    String(String),
}

impl ParamValue {
    /// Numeric view as an unsigned 64-bit value. Negative or non-numeric
    /// values yield `None`.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Self::Int(v) => u64::try_from(v).ok(),
            Self::UInt(v) => Some(u64::from(v)),
            Self::LLong(v) => u64::try_from(v).ok(),
            Self::ULLong(v) => Some(v),
            Self::Double(v) if v >= 0.0 => Some(v as u64),
            Self::Boolean(v) => Some(u64::from(v)),
            _ => None,
        }
    }

    /// Numeric view as a signed 64-bit value.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Int(v) => Some(i64::from(v)),
            Self::UInt(v) => Some(i64::from(v)),
            Self::LLong(v) => Some(v),
            Self::ULLong(v) => i64::try_from(v).ok(),
            Self::Boolean(v) => Some(i64::from(v)),
            _ => None,
        }
    }

    /// String view.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

/// A `key -> value` typed parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedParam {
    pub field: String,
    pub value: ParamValue,
}

impl TypedParam {
    pub fn new(field: impl Into<String>, value: ParamValue) -> Self {
        Self {
            field: field.into(),
            value,
        }
    }
}

// =============================================================================
// BULK DOMAIN STATISTICS
// =============================================================================

/// Statistics of one domain returned by the bulk statistics call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomainStats {
    /// Per-vCPU entries, indexed by position in the bulk array
    pub vcpus: Vec<VcpuStats>,
    /// Block devices
    pub blocks: Vec<BlockStats>,
    /// Network interfaces
    pub nets: Vec<NetStats>,
}

/// Bulk per-vCPU statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VcpuStats {
    pub state: Option<i64>,
    /// CPU time in nanoseconds
    pub time: Option<u64>,
    /// Scheduler wait time in nanoseconds
    pub wait: Option<u64>,
    /// Steal (queued but not running) time in nanoseconds
    pub delay: Option<u64>,
}

/// Bulk block device statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockStats {
    /// Target device name (e.g. `vda`)
    pub name: String,
    /// Source path; omitted for network sources and empty drives
    pub path: Option<String>,
    pub rd_reqs: Option<u64>,
    pub rd_bytes: Option<u64>,
    /// Read time in nanoseconds
    pub rd_times: Option<u64>,
    pub wr_reqs: Option<u64>,
    pub wr_bytes: Option<u64>,
    /// Write time in nanoseconds
    pub wr_times: Option<u64>,
    pub fl_reqs: Option<u64>,
    /// Flush time in nanoseconds
    pub fl_times: Option<u64>,
    pub allocation: Option<u64>,
    pub capacity: Option<u64>,
    pub physical: Option<u64>,
}

impl BlockStats {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Bulk network interface statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetStats {
    /// Target device name (e.g. `vnet0`)
    pub name: String,
    pub rx_bytes: Option<u64>,
    pub rx_pkts: Option<u64>,
    pub rx_errs: Option<u64>,
    pub rx_drop: Option<u64>,
    pub tx_bytes: Option<u64>,
    pub tx_pkts: Option<u64>,
    pub tx_errs: Option<u64>,
    pub tx_drop: Option<u64>,
}

impl NetStats {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

// =============================================================================
// PER-DOMAIN CALLS
// =============================================================================

/// Result of the domain info call. All fields are always populated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DomainInfo {
    /// Raw domain state (0 = no state .. 7 = pm-suspended)
    pub state: u32,
    pub max_mem_kib: u64,
    pub memory_kib: u64,
    pub nr_virt_cpu: u32,
    /// Total CPU time in nanoseconds
    pub cpu_time_ns: u64,
}

/// One entry of the per-vCPU info call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VcpuInfo {
    /// vCPU number as reported by the hypervisor
    pub number: u32,
    /// 0 = offline, 1 = running, 2 = blocked
    pub state: i32,
    pub cpu_time_ns: u64,
    /// Host CPU the vCPU runs on, or a negative state value
    pub cpu: i32,
}

/// One `(tag, value)` pair of the memory statistics call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStat {
    pub tag: u32,
    pub value: u64,
}

impl MemoryStat {
    pub fn new(tag: u32, value: u64) -> Self {
        Self { tag, value }
    }
}

/// Block I/O throttling limits of one device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockIoTune {
    pub total_bytes_sec: Option<u64>,
    pub read_bytes_sec: Option<u64>,
    pub write_bytes_sec: Option<u64>,
    pub total_iops_sec: Option<u64>,
    pub read_iops_sec: Option<u64>,
    pub write_iops_sec: Option<u64>,
    pub total_bytes_sec_max: Option<u64>,
    pub read_bytes_sec_max: Option<u64>,
    pub write_bytes_sec_max: Option<u64>,
    pub total_iops_sec_max: Option<u64>,
    pub read_iops_sec_max: Option<u64>,
    pub write_iops_sec_max: Option<u64>,
    pub total_bytes_sec_max_length: Option<u64>,
    pub read_bytes_sec_max_length: Option<u64>,
    pub write_bytes_sec_max_length: Option<u64>,
    pub total_iops_sec_max_length: Option<u64>,
    pub read_iops_sec_max_length: Option<u64>,
    pub write_iops_sec_max_length: Option<u64>,
    pub size_iops_sec: Option<u64>,
}

// =============================================================================
// STORAGE POOLS
// =============================================================================

/// Capacity figures of a storage pool, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolInfo {
    pub state: u32,
    pub capacity: u64,
    pub allocation: u64,
    pub available: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_decoding() {
        let v = Version::from_packed(8_002_000);
        assert_eq!(v, Version { major: 8, minor: 2, patch: 0 });
        assert_eq!(v.to_string(), "8.2.0");

        let v = Version::from_packed(6_000_000_123);
        assert_eq!(v, Version { major: 0, minor: 0, patch: 123 });
    }

    #[test]
    fn test_version_round_trip() {
        for packed in [0u64, 1, 999, 1_000, 4_002_001, 10_000_000, 999_999_999] {
            assert_eq!(Version::from_packed(packed).to_packed(), packed);
        }

        // Stride across the whole three-component domain.
        let mut packed = 0u64;
        while packed <= 999_999_999 {
            let v = Version::from_packed(packed);
            assert_eq!(v.major as u64, packed / 1_000_000 % 1000);
            assert_eq!(v.minor as u64, packed / 1000 % 1000);
            assert_eq!(v.patch as u64, packed % 1000);
            assert_eq!(v.to_packed(), packed);
            packed += 7_919_777;
        }
    }

    #[test]
    fn test_param_value_views() {
        assert_eq!(ParamValue::ULLong(5).as_u64(), Some(5));
        assert_eq!(ParamValue::Int(-1).as_u64(), None);
        assert_eq!(ParamValue::Int(-1).as_i64(), Some(-1));
        assert_eq!(ParamValue::String("x".into()).as_u64(), None);
        assert_eq!(ParamValue::String("x".into()).as_str(), Some("x"));
    }
}
