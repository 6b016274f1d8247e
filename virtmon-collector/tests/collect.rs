//! End-to-end collection cycles against the mock hypervisor.

use std::sync::Arc;
use std::time::Duration;

use virtmon_collector::{CollectError, LibvirtCollector, LogOnce, Measurement, ScrapeContext};
use virtmon_hypervisor::*;

fn collector(connector: &MockConnector, log_once: Arc<LogOnce>) -> LibvirtCollector {
    LibvirtCollector::with_log_once(Arc::new(connector.clone()), "test:///default", log_once)
}

fn run(connector: &MockConnector) -> Result<Vec<Measurement>, CollectError> {
    let mut out = Vec::new();
    collector(connector, Arc::new(LogOnce::new())).collect(&ScrapeContext::new(), &mut out)?;
    Ok(out)
}

fn for_domain<'a>(out: &'a [Measurement], domain: &str) -> Vec<&'a Measurement> {
    out.iter().filter(|m| m.label("domain") == Some(domain)).collect()
}

fn disk_xml(devices: &[&str]) -> String {
    let disks: String = devices
        .iter()
        .map(|d| format!("<disk type='file'><source file='/img/{d}'/><target dev='{d}' bus='virtio'/></disk>"))
        .collect();
    format!("<domain type='kvm'><devices>{disks}</devices></domain>")
}

fn healthy(name: &str) -> MockDomain {
    MockDomain::new(name, &format!("uuid-{name}"))
        .with_xml(disk_xml(&["vda"]))
        .with_info(DomainInfo {
            state: 1,
            max_mem_kib: 1024,
            memory_kib: 1024,
            nr_virt_cpu: 1,
            cpu_time_ns: 1_000_000_000,
        })
        .with_stats(DomainStats {
            vcpus: vec![VcpuStats {
                wait: Some(1),
                delay: Some(2),
                ..Default::default()
            }],
            blocks: vec![BlockStats {
                rd_bytes: Some(512),
                ..BlockStats::new("vda")
            }],
            nets: Vec::new(),
        })
        .with_vcpus(vec![VcpuInfo {
            number: 0,
            state: 1,
            cpu_time_ns: 1,
            cpu: 0,
        }])
        .with_memory_stats(vec![MemoryStat::new(5, 100), MemoryStat::new(8, 25)])
}

#[test]
fn test_absent_fields_produce_no_measurements() {
    let domain = MockDomain::new("vm", "uuid-vm")
        .with_xml(disk_xml(&["vda"]))
        .with_stats(DomainStats {
            blocks: vec![BlockStats::new("vda")],
            nets: vec![NetStats::new("vnet0")],
            ..Default::default()
        });
    let connector = MockConnector::builder().domain(domain).build();
    let out = run(&connector).unwrap();

    assert!(out.iter().all(|m| !m.name.starts_with("libvirt_domain_block_stats")));
    assert!(out.iter().all(|m| !m.name.starts_with("libvirt_domain_interface_stats")));
    assert!(out.iter().all(|m| !m.name.starts_with("libvirt_domain_vcpu")));
    assert!(out.iter().all(|m| m.name != "libvirt_domain_memory_stats_rss_bytes"));
}

#[test]
fn test_cdrom_slots_never_reported() {
    let domain = MockDomain::new("vm", "uuid-vm")
        .with_xml(disk_xml(&["hda", "hdc", "vda"]))
        .with_stats(DomainStats {
            blocks: ["hda", "hdc", "vda"]
                .iter()
                .map(|d| BlockStats {
                    rd_bytes: Some(1),
                    capacity: Some(2),
                    ..BlockStats::new(*d)
                })
                .collect(),
            ..Default::default()
        })
        .with_io_tune(
            "hda",
            BlockIoTune {
                total_bytes_sec: Some(1),
                ..Default::default()
            },
        );
    let connector = MockConnector::builder().domain(domain).build();
    let out = run(&connector).unwrap();

    let devices: Vec<_> = out.iter().filter_map(|m| m.label("target_device")).collect();
    assert!(!devices.is_empty());
    assert!(devices.iter().all(|d| *d == "vda"));
}

#[test]
fn test_unit_conversions() {
    let connector = MockConnector::builder().domain(healthy("vm")).build();
    let out = run(&connector).unwrap();
    let value = |name: &str| out.iter().find(|m| m.name == name).map(|m| m.value);

    assert_eq!(value("libvirt_domain_info_cpu_time_seconds_total"), Some(1.0));
    assert_eq!(value("libvirt_domain_info_memory_usage_bytes"), Some(1_048_576.0));
    assert_eq!(value("libvirt_domain_memory_stats_available_bytes"), Some(102_400.0));
    assert_eq!(value("libvirt_domain_memory_stats_used_percent"), Some(75.0));
}

#[test]
fn test_unsupported_throttle_logged_once_per_process() {
    let unsupported = || HypervisorError::OperationUnsupported("blkiotune not supported".into());
    let domain = MockDomain::new("vm", "uuid-vm")
        .with_xml(disk_xml(&["vda", "vdb"]))
        .with_stats(DomainStats {
            blocks: vec![BlockStats::new("vda"), BlockStats::new("vdb")],
            ..Default::default()
        })
        .with_io_tune_error("vda", unsupported())
        .with_io_tune_error("vdb", unsupported());
    let connector = MockConnector::builder().domain(domain).build();

    let log_once = Arc::new(LogOnce::new());
    let collector = collector(&connector, Arc::clone(&log_once));
    for _ in 0..2 {
        let mut out: Vec<Measurement> = Vec::new();
        let summary = collector.collect(&ScrapeContext::new(), &mut out).unwrap();
        assert_eq!(summary.failed_domains, 0);
        assert_eq!(
            out.iter().filter(|m| m.name == "libvirt_domain_block_meta").count(),
            2
        );
    }

    assert!(log_once.contains("blkiotune_unsupported"));
    // Four failures, one log line
    assert_eq!(log_once.suppressed(), 3);
}

#[test]
fn test_invalid_throttle_keeps_device() {
    let domain = healthy("vm").with_io_tune_error(
        "vda",
        HypervisorError::OperationInvalid("domain is not running".into()),
    );
    let connector = MockConnector::builder().domain(domain).build();
    let out = run(&connector).unwrap();

    assert_eq!(
        out.iter()
            .filter(|m| m.name == "libvirt_domain_block_stats_read_bytes_total")
            .count(),
        1
    );
    assert!(out.iter().all(|m| !m.name.contains("_limit_")));
}

#[test]
fn test_failing_domain_does_not_affect_others() {
    let baseline = run(&MockConnector::builder().domain(healthy("good")).build()).unwrap();

    let broken = healthy("bad").with_xml("<domain><devices><disk></devices></domain>");
    let connector = MockConnector::builder()
        .domain(broken)
        .domain(healthy("good"))
        .build();
    let mut out = Vec::new();
    let summary = collector(&connector, Arc::new(LogOnce::new()))
        .collect(&ScrapeContext::new(), &mut out)
        .unwrap();

    assert_eq!(summary.domains, 1);
    assert_eq!(summary.failed_domains, 1);
    assert!(for_domain(&out, "bad").is_empty());
    assert_eq!(for_domain(&out, "good"), for_domain(&baseline, "good"));
}

#[test]
fn test_info_failure_isolated() {
    let connector = MockConnector::builder()
        .domain(healthy("a").with_info_error(HypervisorError::QueryFailed("rpc".into())))
        .domain(healthy("b"))
        .build();
    let out = run(&connector).unwrap();
    assert!(for_domain(&out, "a").is_empty());
    assert!(!for_domain(&out, "b").is_empty());
}

#[test]
fn test_vcpu_without_bulk_half() {
    let domain = MockDomain::new("vm", "uuid-vm")
        .with_info(DomainInfo {
            nr_virt_cpu: 4,
            ..Default::default()
        })
        .with_stats(DomainStats {
            vcpus: vec![VcpuStats::default(); 3],
            ..Default::default()
        })
        .with_vcpus(vec![VcpuInfo {
            number: 3,
            state: 1,
            cpu_time_ns: 0,
            cpu: 2,
        }]);
    let connector = MockConnector::builder().domain(domain).build();
    let out = run(&connector).unwrap();

    let vcpu3: Vec<_> = out
        .iter()
        .filter(|m| m.label("vcpu") == Some("3"))
        .map(|m| m.name)
        .collect();
    assert_eq!(vcpu3.len(), 3);
    assert!(vcpu3.iter().all(|n| !n.contains("wait") && !n.contains("delay")));
}

#[test]
fn test_handles_released_exactly_once() {
    let connector = MockConnector::builder()
        .domain(healthy("a"))
        .domain(healthy("b").with_info_error(HypervisorError::QueryFailed("rpc".into())))
        .domain(healthy("c"))
        .pool(MockPool::new("default", PoolInfo::default()))
        .pool(
            MockPool::new("bad", PoolInfo::default())
                .with_info_error(HypervisorError::QueryFailed("rpc".into())),
        )
        .build();
    run(&connector).unwrap();

    assert_eq!(connector.sessions().acquired(), 1);
    assert_eq!(connector.sessions().released(), 1);
    assert_eq!(connector.domain_handles().acquired(), 3);
    assert_eq!(connector.domain_handles().released(), 3);
    assert_eq!(connector.pool_handles().acquired(), 2);
    assert_eq!(connector.pool_handles().released(), 2);
}

#[test]
fn test_pool_failure_isolated() {
    let connector = MockConnector::builder()
        .pool(
            MockPool::new("broken", PoolInfo::default())
                .with_refresh_error(HypervisorError::QueryFailed("refresh".into())),
        )
        .pool(MockPool::new(
            "default",
            PoolInfo {
                state: 2,
                capacity: 10,
                allocation: 4,
                available: 6,
            },
        ))
        .build();
    let out = run(&connector).unwrap();

    let pools: Vec<_> = out.iter().filter_map(|m| m.label("pool")).collect();
    assert_eq!(pools, vec!["default"; 3]);
}

#[test]
fn test_connection_failure_yields_nothing() {
    let connector = MockConnector::builder()
        .open_error(HypervisorError::ConnectionFailed("refused".into()))
        .domain(healthy("a"))
        .build();
    let mut out: Vec<Measurement> = Vec::new();
    let result = collector(&connector, Arc::new(LogOnce::new())).collect(&ScrapeContext::new(), &mut out);

    assert!(matches!(result, Err(CollectError::Connection(_))));
    assert!(out.is_empty());
}

#[test]
fn test_versions_failure_yields_nothing() {
    let connector = MockConnector::builder()
        .versions_error(HypervisorError::QueryFailed("version".into()))
        .domain(healthy("vm"))
        .pool(MockPool::new("default", PoolInfo::default()))
        .build();
    let mut out: Vec<Measurement> = Vec::new();
    let result = collector(&connector, Arc::new(LogOnce::new())).collect(&ScrapeContext::new(), &mut out);

    assert!(matches!(
        result,
        Err(CollectError::Fetch {
            what: "versions",
            ..
        })
    ));
    assert!(out.is_empty());
    assert_eq!(connector.sessions().acquired(), 1);
    assert_eq!(connector.sessions().released(), 1);
    assert_eq!(connector.domain_handles().acquired(), 0);
}

#[test]
fn test_bulk_fetch_failure_yields_nothing() {
    let connector = MockConnector::builder()
        .stats_error(HypervisorError::QueryFailed("bulk".into()))
        .pool(MockPool::new("default", PoolInfo::default()))
        .build();
    let mut out: Vec<Measurement> = Vec::new();
    let result = collector(&connector, Arc::new(LogOnce::new())).collect(&ScrapeContext::new(), &mut out);

    assert!(matches!(
        result,
        Err(CollectError::Fetch {
            what: "domain statistics",
            ..
        })
    ));
    assert!(out.is_empty());
    assert_eq!(connector.sessions().released(), 1);
}

#[test]
fn test_deadline_aborts_and_releases() {
    let connector = MockConnector::builder()
        .domain(healthy("slow").with_delay(Duration::from_millis(100)))
        .domain(healthy("next"))
        .domain(healthy("last"))
        .build();
    let ctx = ScrapeContext::with_timeout(Duration::from_millis(50));
    let mut out: Vec<Measurement> = Vec::new();
    let result = collector(&connector, Arc::new(LogOnce::new())).collect(&ctx, &mut out);

    assert!(matches!(result, Err(CollectError::DeadlineExceeded)));
    assert!(out.is_empty());
    assert_eq!(connector.domain_handles().acquired(), 3);
    assert_eq!(connector.domain_handles().outstanding(), 0);
    assert_eq!(connector.sessions().outstanding(), 0);
}

#[test]
fn test_cancelled_before_start() {
    let connector = MockConnector::builder().domain(healthy("a")).build();
    let ctx = ScrapeContext::new();
    ctx.cancel();
    let mut out: Vec<Measurement> = Vec::new();
    let result = collector(&connector, Arc::new(LogOnce::new())).collect(&ctx, &mut out);

    assert!(matches!(result, Err(CollectError::Cancelled)));
    assert_eq!(connector.sessions().acquired(), 0);
}
