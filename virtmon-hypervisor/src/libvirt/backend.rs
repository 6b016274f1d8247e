//! Libvirt backend implementation.

use std::ffi::{CStr, CString};
use std::os::raw::{c_int, c_uint};
use std::ptr;
use tracing::{debug, instrument, warn};
use virt::connect::Connect;
use virt::domain::Domain;
use virt::error::{Error as VirtError, ErrorNumber};
use virt::storage_pool::StoragePool;
use virt::sys;

use crate::error::{HypervisorError, Result};
use crate::session::*;
use crate::types::*;

/// Statistics groups requested from the bulk call.
const DOMAIN_STATS: c_uint = sys::VIR_DOMAIN_STATS_STATE
    | sys::VIR_DOMAIN_STATS_CPU_TOTAL
    | sys::VIR_DOMAIN_STATS_INTERFACE
    | sys::VIR_DOMAIN_STATS_BALLOON
    | sys::VIR_DOMAIN_STATS_BLOCK
    | sys::VIR_DOMAIN_STATS_PERF
    | sys::VIR_DOMAIN_STATS_VCPU;

/// Include both running and shut-off domains.
const DOMAIN_STATS_FLAGS: c_uint = sys::VIR_CONNECT_GET_ALL_DOMAINS_STATS_RUNNING
    | sys::VIR_CONNECT_GET_ALL_DOMAINS_STATS_SHUTOFF;

/// Map a libvirt error to the classification the collector works with.
fn classify(err: VirtError) -> HypervisorError {
    match err.code() {
        ErrorNumber::OperationInvalid => HypervisorError::OperationInvalid(err.to_string()),
        ErrorNumber::OperationUnsupported | ErrorNumber::NoSupport => {
            HypervisorError::OperationUnsupported(err.to_string())
        }
        _ => HypervisorError::QueryFailed(err.to_string()),
    }
}

/// Classify the thread's last libvirt error after a raw call failed.
fn last_error() -> HypervisorError {
    classify(VirtError::last_error())
}

// =============================================================================
// CONNECTOR
// =============================================================================

/// Opens libvirt connections.
///
/// Common URIs:
/// - `qemu:///system` - System-wide QEMU/KVM
/// - `qemu+ssh://user@host/system` - Remote via SSH
#[derive(Debug, Default, Clone, Copy)]
pub struct LibvirtConnector;

impl LibvirtConnector {
    pub fn new() -> Self {
        Self
    }
}

impl Connector for LibvirtConnector {
    #[instrument(skip(self))]
    fn open(&self, uri: &str) -> Result<Box<dyn Session>> {
        debug!(uri = %uri, "Connecting to libvirt");

        let conn = Connect::open(Some(uri))
            .map_err(|e| HypervisorError::ConnectionFailed(e.to_string()))?;

        Ok(Box::new(LibvirtSession { conn }))
    }

    fn name(&self) -> &'static str {
        "libvirt"
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// An open libvirt connection, closed on drop.
struct LibvirtSession {
    conn: Connect,
}

impl Drop for LibvirtSession {
    fn drop(&mut self) {
        if let Err(e) = self.conn.close() {
            warn!(error = %e, "Failed to close libvirt connection");
        }
    }
}

impl Session for LibvirtSession {
    fn versions(&self) -> Result<VersionInfo> {
        let hypervisor = self
            .conn
            .get_hyp_version()
            .map_err(|e| HypervisorError::QueryFailed(e.to_string()))?;
        let daemon = self
            .conn
            .get_lib_version()
            .map_err(|e| HypervisorError::QueryFailed(e.to_string()))?;

        let library =
            Connect::get_version().map_err(|e| HypervisorError::QueryFailed(e.to_string()))?;

        Ok(VersionInfo {
            hypervisor: Version::from_packed(u64::from(hypervisor)),
            daemon: Version::from_packed(u64::from(daemon)),
            library: Version::from_packed(u64::from(library)),
        })
    }

    #[instrument(skip(self))]
    fn all_domain_stats(&self) -> Result<Vec<DomainStatsRecord>> {
        let mut records: *mut sys::virDomainStatsRecordPtr = ptr::null_mut();

        // SAFETY: the connection pointer is valid for the lifetime of self,
        // and `records` is freed by the guard below.
        let count = unsafe {
            sys::virConnectGetAllDomainStats(
                self.conn.as_ptr(),
                DOMAIN_STATS,
                &mut records,
                DOMAIN_STATS_FLAGS,
            )
        };
        if count < 0 {
            return Err(HypervisorError::QueryFailed(VirtError::last_error().to_string()));
        }
        let _list = StatsListGuard(records);

        let mut out = Vec::with_capacity(count as usize);
        for i in 0..count as usize {
            // SAFETY: libvirt returned `count` valid record pointers.
            let record = unsafe { &**records.add(i) };

            // Take our own reference; the list free drops libvirt's.
            // SAFETY: record.dom is a valid domain pointer while the list lives.
            if unsafe { sys::virDomainRef(record.dom) } < 0 {
                return Err(HypervisorError::QueryFailed(VirtError::last_error().to_string()));
            }
            // SAFETY: we own the reference taken above.
            let domain = unsafe { Domain::from_ptr(record.dom) };

            // SAFETY: params points to nparams typed parameters.
            let params = unsafe { read_typed_params(record.params, record.nparams) };

            out.push(DomainStatsRecord {
                domain: Box::new(LibvirtDomain { domain }),
                stats: DomainStats::from_params(&params),
            });
        }

        debug!(domains = out.len(), "Fetched bulk domain statistics");
        Ok(out)
    }

    fn active_storage_pools(&self) -> Result<Vec<Box<dyn StoragePoolHandle>>> {
        let pools = self
            .conn
            .list_all_storage_pools(sys::VIR_CONNECT_LIST_STORAGE_POOLS_ACTIVE)
            .map_err(|e| HypervisorError::QueryFailed(e.to_string()))?;

        Ok(pools
            .into_iter()
            .map(|pool| Box::new(LibvirtPool { pool }) as Box<dyn StoragePoolHandle>)
            .collect())
    }
}

/// Frees the bulk statistics list, including libvirt's domain references.
struct StatsListGuard(*mut sys::virDomainStatsRecordPtr);

impl Drop for StatsListGuard {
    fn drop(&mut self) {
        if !self.0.is_null() {
            // SAFETY: the pointer came from virConnectGetAllDomainStats.
            unsafe { sys::virDomainStatsRecordListFree(self.0) };
        }
    }
}

/// Copy a C typed-parameter array into owned values.
///
/// # Safety
/// `params` must point to `nparams` initialized typed parameters.
unsafe fn read_typed_params(params: sys::virTypedParameterPtr, nparams: c_int) -> Vec<TypedParam> {
    if params.is_null() || nparams <= 0 {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(nparams as usize);
    for i in 0..nparams as usize {
        let p = &*params.add(i);
        let field = CStr::from_ptr(p.field.as_ptr()).to_string_lossy().into_owned();
        let value = match p.type_ as c_uint {
            sys::VIR_TYPED_PARAM_INT => ParamValue::Int(p.value.i),
            sys::VIR_TYPED_PARAM_UINT => ParamValue::UInt(p.value.ui),
            sys::VIR_TYPED_PARAM_LLONG => ParamValue::LLong(p.value.l),
            sys::VIR_TYPED_PARAM_ULLONG => ParamValue::ULLong(p.value.ul),
            sys::VIR_TYPED_PARAM_DOUBLE => ParamValue::Double(p.value.d),
            sys::VIR_TYPED_PARAM_BOOLEAN => ParamValue::Boolean(p.value.b != 0),
            sys::VIR_TYPED_PARAM_STRING => {
                if p.value.s.is_null() {
                    continue;
                }
                ParamValue::String(CStr::from_ptr(p.value.s).to_string_lossy().into_owned())
            }
            other => {
                debug!(field = %field, kind = other, "Skipping typed parameter of unknown type");
                continue;
            }
        };
        out.push(TypedParam { field, value });
    }
    out
}

// =============================================================================
// DOMAIN HANDLE
// =============================================================================

/// A referenced domain; the `Domain` drop releases the reference.
struct LibvirtDomain {
    domain: Domain,
}

impl DomainHandle for LibvirtDomain {
    fn name(&self) -> Result<String> {
        self.domain.get_name().map_err(classify)
    }

    fn uuid(&self) -> Result<String> {
        self.domain.get_uuid_string().map_err(classify)
    }

    fn xml_desc(&self) -> Result<String> {
        self.domain.get_xml_desc(0).map_err(classify)
    }

    fn info(&self) -> Result<DomainInfo> {
        let info = self.domain.get_info().map_err(classify)?;
        Ok(DomainInfo {
            state: info.state as u32,
            max_mem_kib: info.max_mem,
            memory_kib: info.memory,
            nr_virt_cpu: info.nr_virt_cpu,
            cpu_time_ns: info.cpu_time,
        })
    }

    fn vcpus(&self, max: u32) -> Result<Vec<VcpuInfo>> {
        if max == 0 {
            return Ok(Vec::new());
        }

        let mut raw: Vec<sys::virVcpuInfo> = Vec::with_capacity(max as usize);
        // SAFETY: the buffer has room for `max` entries; no CPU maps requested.
        let n = unsafe {
            sys::virDomainGetVcpus(
                self.domain.as_ptr(),
                raw.as_mut_ptr(),
                max as c_int,
                ptr::null_mut(),
                0,
            )
        };
        if n < 0 {
            return Err(last_error());
        }
        // SAFETY: libvirt initialized the first `n` entries.
        unsafe { raw.set_len(n as usize) };

        Ok(raw
            .into_iter()
            .map(|v| VcpuInfo {
                number: v.number,
                state: v.state,
                cpu_time_ns: v.cpuTime,
                cpu: v.cpu,
            })
            .collect())
    }

    fn memory_stats(&self) -> Result<Vec<MemoryStat>> {
        let stats = self.domain.memory_stats(0).map_err(classify)?;
        Ok(stats
            .into_iter()
            .map(|s| MemoryStat::new(s.tag as u32, s.val))
            .collect())
    }

    fn block_io_tune(&self, device: &str) -> Result<BlockIoTune> {
        let disk = CString::new(device)
            .map_err(|e| HypervisorError::Internal(format!("invalid device name: {}", e)))?;
        let dom = self.domain.as_ptr();

        // First call reports how many parameters the driver has.
        let mut nparams: c_int = 0;
        // SAFETY: null params with nparams = 0 is the documented size query.
        let ret = unsafe {
            sys::virDomainGetBlockIoTune(dom, disk.as_ptr(), ptr::null_mut(), &mut nparams, 0)
        };
        if ret < 0 {
            return Err(last_error());
        }
        if nparams <= 0 {
            return Ok(BlockIoTune::default());
        }

        let mut params: Vec<sys::virTypedParameter> = Vec::with_capacity(nparams as usize);
        // SAFETY: the buffer has room for `nparams` entries.
        let ret = unsafe {
            sys::virDomainGetBlockIoTune(dom, disk.as_ptr(), params.as_mut_ptr(), &mut nparams, 0)
        };
        if ret < 0 {
            return Err(last_error());
        }

        // SAFETY: libvirt filled `nparams` entries; clearing frees their strings.
        let decoded = unsafe {
            let decoded = read_typed_params(params.as_mut_ptr(), nparams);
            sys::virTypedParamsClear(params.as_mut_ptr(), nparams);
            decoded
        };
        Ok(BlockIoTune::from_params(&decoded))
    }
}

// =============================================================================
// STORAGE POOL HANDLE
// =============================================================================

struct LibvirtPool {
    pool: StoragePool,
}

impl StoragePoolHandle for LibvirtPool {
    fn refresh(&self) -> Result<()> {
        self.pool.refresh(0).map(|_| ()).map_err(classify)
    }

    fn name(&self) -> Result<String> {
        self.pool.get_name().map_err(classify)
    }

    fn info(&self) -> Result<PoolInfo> {
        let info = self.pool.get_info().map_err(classify)?;
        Ok(PoolInfo {
            state: info.state as u32,
            capacity: info.capacity,
            allocation: info.allocation,
            available: info.available,
        })
    }
}
