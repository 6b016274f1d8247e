//! Mock hypervisor backend for testing and development.
//!
//! Serves canned domains and storage pools from memory. Any call can be
//! made to fail with a chosen [`HypervisorError`], and every session, domain
//! and pool handle is counted on acquisition and on release so tests can
//! check that nothing leaks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{HypervisorError, Result};
use crate::session::*;
use crate::types::*;

// =============================================================================
// HANDLE ACCOUNTING
// =============================================================================

/// Acquisition and release counts for one kind of handle.
#[derive(Debug, Default)]
pub struct HandleCounters {
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl HandleCounters {
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Handles acquired but not yet released.
    pub fn outstanding(&self) -> usize {
        self.acquired().saturating_sub(self.released())
    }
}

/// Increments `acquired` on creation and `released` on drop.
struct Tracked(Arc<HandleCounters>);

impl Tracked {
    fn new(counters: &Arc<HandleCounters>) -> Self {
        counters.acquired.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counters))
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.0.released.fetch_add(1, Ordering::SeqCst);
    }
}

// =============================================================================
// CANNED ENTITIES
// =============================================================================

/// A canned domain.
#[derive(Debug, Clone)]
pub struct MockDomain {
    pub name: String,
    pub uuid: String,
    pub xml: String,
    pub stats: DomainStats,
    info: Result<DomainInfo>,
    vcpus: Result<Vec<VcpuInfo>>,
    memory: Result<Vec<MemoryStat>>,
    io_tune: HashMap<String, Result<BlockIoTune>>,
    delay: Duration,
}

impl MockDomain {
    /// Create a domain with an empty descriptor and no statistics.
    pub fn new(name: &str, uuid: &str) -> Self {
        Self {
            name: name.to_string(),
            uuid: uuid.to_string(),
            xml: format!("<domain type='kvm'><name>{}</name><uuid>{}</uuid></domain>", name, uuid),
            stats: DomainStats::default(),
            info: Ok(DomainInfo::default()),
            vcpus: Ok(Vec::new()),
            memory: Ok(Vec::new()),
            io_tune: HashMap::new(),
            delay: Duration::ZERO,
        }
    }

    pub fn with_xml(mut self, xml: impl Into<String>) -> Self {
        self.xml = xml.into();
        self
    }

    pub fn with_stats(mut self, stats: DomainStats) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_info(mut self, info: DomainInfo) -> Self {
        self.info = Ok(info);
        self
    }

    pub fn with_info_error(mut self, err: HypervisorError) -> Self {
        self.info = Err(err);
        self
    }

    pub fn with_vcpus(mut self, vcpus: Vec<VcpuInfo>) -> Self {
        self.vcpus = Ok(vcpus);
        self
    }

    pub fn with_vcpus_error(mut self, err: HypervisorError) -> Self {
        self.vcpus = Err(err);
        self
    }

    pub fn with_memory_stats(mut self, stats: Vec<MemoryStat>) -> Self {
        self.memory = Ok(stats);
        self
    }

    pub fn with_memory_error(mut self, err: HypervisorError) -> Self {
        self.memory = Err(err);
        self
    }

    /// Throttle parameters for one device. Devices without an entry
    /// answer with an empty parameter set.
    pub fn with_io_tune(mut self, device: &str, tune: BlockIoTune) -> Self {
        self.io_tune.insert(device.to_string(), Ok(tune));
        self
    }

    pub fn with_io_tune_error(mut self, device: &str, err: HypervisorError) -> Self {
        self.io_tune.insert(device.to_string(), Err(err));
        self
    }

    /// Make the info call block for `delay`, to exercise scrape deadlines.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// A canned storage pool.
#[derive(Debug, Clone)]
pub struct MockPool {
    pub name: String,
    info: Result<PoolInfo>,
    refresh: Result<()>,
}

impl MockPool {
    pub fn new(name: &str, info: PoolInfo) -> Self {
        Self {
            name: name.to_string(),
            info: Ok(info),
            refresh: Ok(()),
        }
    }

    pub fn with_refresh_error(mut self, err: HypervisorError) -> Self {
        self.refresh = Err(err);
        self
    }

    pub fn with_info_error(mut self, err: HypervisorError) -> Self {
        self.info = Err(err);
        self
    }
}

// =============================================================================
// CONNECTOR
// =============================================================================

#[derive(Debug, Default)]
struct MockState {
    versions: VersionInfo,
    domains: Vec<MockDomain>,
    pools: Vec<MockPool>,
    open_error: Option<HypervisorError>,
    versions_error: Option<HypervisorError>,
    stats_error: Option<HypervisorError>,
    pools_error: Option<HypervisorError>,
}

/// Mock connector serving canned data.
///
/// Useful for:
/// - Unit and integration testing of the collector
/// - Running the exporter without libvirt installed (`--dev`)
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    state: Arc<MockState>,
    sessions: Arc<HandleCounters>,
    domains: Arc<HandleCounters>,
    pools: Arc<HandleCounters>,
}

/// Builder for [`MockConnector`].
#[derive(Debug, Default)]
pub struct MockConnectorBuilder {
    state: MockState,
}

impl MockConnectorBuilder {
    pub fn versions(mut self, versions: VersionInfo) -> Self {
        self.state.versions = versions;
        self
    }

    pub fn domain(mut self, domain: MockDomain) -> Self {
        self.state.domains.push(domain);
        self
    }

    pub fn pool(mut self, pool: MockPool) -> Self {
        self.state.pools.push(pool);
        self
    }

    pub fn open_error(mut self, err: HypervisorError) -> Self {
        self.state.open_error = Some(err);
        self
    }

    pub fn versions_error(mut self, err: HypervisorError) -> Self {
        self.state.versions_error = Some(err);
        self
    }

    pub fn stats_error(mut self, err: HypervisorError) -> Self {
        self.state.stats_error = Some(err);
        self
    }

    pub fn pools_error(mut self, err: HypervisorError) -> Self {
        self.state.pools_error = Some(err);
        self
    }

    pub fn build(self) -> MockConnector {
        MockConnector {
            state: Arc::new(self.state),
            ..Default::default()
        }
    }
}

impl MockConnector {
    /// Start building a mock connector.
    pub fn builder() -> MockConnectorBuilder {
        MockConnectorBuilder::default()
    }

    /// Session open/close counts.
    pub fn sessions(&self) -> &HandleCounters {
        &self.sessions
    }

    /// Domain handle counts.
    pub fn domain_handles(&self) -> &HandleCounters {
        &self.domains
    }

    /// Storage pool handle counts.
    pub fn pool_handles(&self) -> &HandleCounters {
        &self.pools
    }

    /// A small host with two cloud instances, one shut-off domain and two
    /// storage pools, used by the exporter's development mode.
    pub fn demo() -> Self {
        info!("Creating mock hypervisor connector with demo data");
        MockConnector::builder()
            .versions(VersionInfo {
                hypervisor: Version::from_packed(8_002_000),
                daemon: Version::from_packed(10_000_000),
                library: Version::from_packed(10_000_000),
            })
            .domain(demo_instance("instance-00000001", "1b4e28ba-2fa1-11d2-883f-0016d3cca427", "web-01", 0))
            .domain(demo_instance("instance-00000002", "6fa459ea-ee8a-3ca4-894e-db77e160355e", "db-01", 1))
            .domain(
                MockDomain::new("build-agent", "0b3c8d6e-5f1a-4d3e-9a2b-7c6d5e4f3a21")
                    .with_info(DomainInfo {
                        state: 5,
                        max_mem_kib: 4 * 1024 * 1024,
                        memory_kib: 4 * 1024 * 1024,
                        nr_virt_cpu: 2,
                        cpu_time_ns: 0,
                    })
                    .with_vcpus_error(HypervisorError::OperationInvalid(
                        "domain is not running".to_string(),
                    ))
                    .with_memory_error(HypervisorError::OperationInvalid(
                        "domain is not running".to_string(),
                    )),
            )
            .pool(MockPool::new(
                "default",
                PoolInfo {
                    state: 2,
                    capacity: 500 * GIB,
                    allocation: 120 * GIB,
                    available: 380 * GIB,
                },
            ))
            .pool(MockPool::new(
                "images",
                PoolInfo {
                    state: 2,
                    capacity: 2048 * GIB,
                    allocation: 900 * GIB,
                    available: 1148 * GIB,
                },
            ))
            .build()
    }
}

const GIB: u64 = 1024 * 1024 * 1024;

fn demo_instance(name: &str, uuid: &str, display: &str, seed: u64) -> MockDomain {
    let xml = format!(
        r#"<domain type='kvm'>
  <name>{name}</name>
  <uuid>{uuid}</uuid>
  <metadata>
    <nova:instance xmlns:nova="http://openstack.org/xmlns/libvirt/nova/1.1">
      <nova:name>{display}</nova:name>
      <nova:flavor name="m1.medium"/>
      <nova:owner>
        <nova:user uuid="5f0c0b9d">demo</nova:user>
        <nova:project uuid="c2a51e6a">demo-project</nova:project>
      </nova:owner>
      <nova:root type="image" uuid="9e1c3f7a"/>
    </nova:instance>
  </metadata>
  <devices>
    <disk type='file' device='disk'>
      <driver name='qemu' type='qcow2' cache='none' discard='unmap'/>
      <source file='/var/lib/libvirt/images/{uuid}.qcow2'/>
      <target dev='vda' bus='virtio'/>
      <serial>{uuid}</serial>
    </disk>
    <disk type='file' device='cdrom'>
      <target dev='hda' bus='ide'/>
    </disk>
    <interface type='bridge'>
      <source bridge='br0'/>
      <target dev='vnet{seed}'/>
    </interface>
  </devices>
</domain>"#
    );

    let base = (seed + 1) * 1_000_000;
    let stats = DomainStats {
        vcpus: (0..2)
            .map(|i| VcpuStats {
                state: Some(1),
                time: Some(base * 1000 + i * 7),
                wait: Some(base / 10),
                delay: Some(base / 100),
            })
            .collect(),
        blocks: vec![
            BlockStats {
                path: Some(format!("/var/lib/libvirt/images/{uuid}.qcow2")),
                rd_reqs: Some(base / 512),
                rd_bytes: Some(base * 4),
                rd_times: Some(base * 30),
                wr_reqs: Some(base / 1024),
                wr_bytes: Some(base * 2),
                wr_times: Some(base * 50),
                fl_reqs: Some(base / 4096),
                fl_times: Some(base * 5),
                allocation: Some(8 * GIB),
                capacity: Some(20 * GIB),
                physical: Some(8 * GIB),
                ..BlockStats::new("vda")
            },
            BlockStats::new("hda"),
        ],
        nets: vec![NetStats {
            rx_bytes: Some(base * 3),
            rx_pkts: Some(base / 100),
            rx_errs: Some(0),
            rx_drop: Some(0),
            tx_bytes: Some(base),
            tx_pkts: Some(base / 200),
            tx_errs: Some(0),
            tx_drop: Some(0),
            ..NetStats::new(format!("vnet{seed}"))
        }],
    };

    MockDomain::new(name, uuid)
        .with_xml(xml)
        .with_stats(stats)
        .with_info(DomainInfo {
            state: 1,
            max_mem_kib: 4 * 1024 * 1024,
            memory_kib: 4 * 1024 * 1024,
            nr_virt_cpu: 2,
            cpu_time_ns: base * 2000,
        })
        .with_vcpus(
            (0..2)
                .map(|i| VcpuInfo {
                    number: i,
                    state: 1,
                    cpu_time_ns: base * 1000 + u64::from(i) * 7,
                    cpu: i as i32,
                })
                .collect(),
        )
        .with_memory_stats(vec![
            MemoryStat::new(2, 12 + seed),
            MemoryStat::new(3, 40_000 + seed),
            MemoryStat::new(4, 2 * 1024 * 1024),
            MemoryStat::new(5, 4 * 1024 * 1024),
            MemoryStat::new(6, 4 * 1024 * 1024),
            MemoryStat::new(7, 1536 * 1024),
            MemoryStat::new(8, 2560 * 1024),
            MemoryStat::new(10, 256 * 1024),
        ])
        .with_io_tune(
            "vda",
            BlockIoTune {
                total_bytes_sec: Some(200 * 1024 * 1024),
                total_iops_sec: Some(5000),
                ..Default::default()
            },
        )
}

impl Connector for MockConnector {
    fn open(&self, uri: &str) -> Result<Box<dyn Session>> {
        if let Some(err) = &self.state.open_error {
            return Err(err.clone());
        }
        debug!(uri = %uri, "Opening mock session");
        Ok(Box::new(MockSession {
            state: Arc::clone(&self.state),
            domains: Arc::clone(&self.domains),
            pools: Arc::clone(&self.pools),
            _tracked: Tracked::new(&self.sessions),
        }))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

// =============================================================================
// SESSION AND HANDLES
// =============================================================================

struct MockSession {
    state: Arc<MockState>,
    domains: Arc<HandleCounters>,
    pools: Arc<HandleCounters>,
    _tracked: Tracked,
}

impl Session for MockSession {
    fn versions(&self) -> Result<VersionInfo> {
        match &self.state.versions_error {
            Some(err) => Err(err.clone()),
            None => Ok(self.state.versions),
        }
    }

    fn all_domain_stats(&self) -> Result<Vec<DomainStatsRecord>> {
        if let Some(err) = &self.state.stats_error {
            return Err(err.clone());
        }
        Ok(self
            .state
            .domains
            .iter()
            .map(|d| DomainStatsRecord {
                stats: d.stats.clone(),
                domain: Box::new(MockDomainHandle {
                    domain: d.clone(),
                    _tracked: Tracked::new(&self.domains),
                }),
            })
            .collect())
    }

    fn active_storage_pools(&self) -> Result<Vec<Box<dyn StoragePoolHandle>>> {
        if let Some(err) = &self.state.pools_error {
            return Err(err.clone());
        }
        Ok(self
            .state
            .pools
            .iter()
            .map(|p| {
                Box::new(MockPoolHandle {
                    pool: p.clone(),
                    _tracked: Tracked::new(&self.pools),
                }) as Box<dyn StoragePoolHandle>
            })
            .collect())
    }
}

struct MockDomainHandle {
    domain: MockDomain,
    _tracked: Tracked,
}

impl DomainHandle for MockDomainHandle {
    fn name(&self) -> Result<String> {
        Ok(self.domain.name.clone())
    }

    fn uuid(&self) -> Result<String> {
        Ok(self.domain.uuid.clone())
    }

    fn xml_desc(&self) -> Result<String> {
        Ok(self.domain.xml.clone())
    }

    fn info(&self) -> Result<DomainInfo> {
        if !self.domain.delay.is_zero() {
            std::thread::sleep(self.domain.delay);
        }
        self.domain.info.clone()
    }

    fn vcpus(&self, max: u32) -> Result<Vec<VcpuInfo>> {
        let vcpus = self.domain.vcpus.clone()?;
        Ok(vcpus.into_iter().take(max as usize).collect())
    }

    fn memory_stats(&self) -> Result<Vec<MemoryStat>> {
        self.domain.memory.clone()
    }

    fn block_io_tune(&self, device: &str) -> Result<BlockIoTune> {
        match self.domain.io_tune.get(device) {
            Some(result) => result.clone(),
            None => Ok(BlockIoTune::default()),
        }
    }
}

struct MockPoolHandle {
    pool: MockPool,
    _tracked: Tracked,
}

impl StoragePoolHandle for MockPoolHandle {
    fn refresh(&self) -> Result<()> {
        self.pool.refresh.clone()
    }

    fn name(&self) -> Result<String> {
        Ok(self.pool.name.clone())
    }

    fn info(&self) -> Result<PoolInfo> {
        self.pool.info.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_released_on_drop() {
        let connector = MockConnector::builder()
            .domain(MockDomain::new("a", "uuid-a"))
            .domain(MockDomain::new("b", "uuid-b"))
            .pool(MockPool::new("default", PoolInfo::default()))
            .build();

        {
            let session = connector.open("test:///default").unwrap();
            let records = session.all_domain_stats().unwrap();
            let pools = session.active_storage_pools().unwrap();
            assert_eq!(records.len(), 2);
            assert_eq!(pools.len(), 1);
            assert_eq!(connector.domain_handles().outstanding(), 2);
            assert_eq!(connector.pool_handles().outstanding(), 1);
            assert_eq!(connector.sessions().outstanding(), 1);
        }

        assert_eq!(connector.domain_handles().acquired(), 2);
        assert_eq!(connector.domain_handles().released(), 2);
        assert_eq!(connector.pool_handles().released(), 1);
        assert_eq!(connector.sessions().released(), 1);
    }

    #[test]
    fn test_injected_errors() {
        let connector = MockConnector::builder()
            .open_error(HypervisorError::ConnectionFailed("refused".into()))
            .build();
        assert!(connector.open("qemu:///system").is_err());
        assert_eq!(connector.sessions().acquired(), 0);

        let domain = MockDomain::new("a", "uuid-a")
            .with_io_tune_error("vda", HypervisorError::OperationUnsupported("no".into()));
        let connector = MockConnector::builder().domain(domain).build();
        let session = connector.open("qemu:///system").unwrap();
        let records = session.all_domain_stats().unwrap();
        let handle = &records[0].domain;
        assert!(handle.block_io_tune("vda").unwrap_err().is_unsupported());
        assert_eq!(handle.block_io_tune("vdb").unwrap(), BlockIoTune::default());
    }

    #[test]
    fn test_demo_descriptors_parse() {
        let connector = MockConnector::demo();
        let session = connector.open("mock:///").unwrap();
        for record in session.all_domain_stats().unwrap() {
            let xml = record.domain.xml_desc().unwrap();
            assert!(crate::DomainDescriptor::parse(&xml).is_ok());
        }
    }
}
