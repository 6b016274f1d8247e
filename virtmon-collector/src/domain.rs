//! Per-domain reconciliation.
//!
//! Joins one bulk statistics record with the domain's descriptor, its info
//! and per-vCPU calls, per-device throttle parameters and memory statistics,
//! and turns the result into measurements.

use std::collections::BTreeMap;
use tracing::{debug, warn};
use virtmon_hypervisor::{
    DomainDescriptor, DomainHandle, DomainInfo, DomainStats, DomainStatsRecord, VcpuInfo,
};

use crate::catalog::*;
use crate::error::DomainError;
use crate::fields::{emit_fields, Unit, BLOCK_FIELDS, NET_FIELDS, THROTTLE_FIELDS};
use crate::measurement::Measurement;
use crate::memory::MemoryStats;
use crate::once::{LogOnce, BLKIOTUNE_UNSUPPORTED};

/// Legacy IDE CD-ROM slots, never reported.
const SKIPPED_BLOCK_DEVICES: [&str; 2] = ["hda", "hdc"];

/// Collect every measurement of one domain into `out`.
///
/// On error `out` may hold a partial set; callers discard it.
pub fn collect_domain(
    record: &DomainStatsRecord,
    log_once: &LogOnce,
    out: &mut Vec<Measurement>,
) -> Result<(), DomainError> {
    let handle = record.domain.as_ref();
    let name = handle.name().map_err(DomainError::Identity)?;
    let uuid = handle.uuid().map_err(DomainError::Identity)?;

    let descriptor = handle
        .xml_desc()
        .and_then(|xml| DomainDescriptor::parse(&xml))
        .map_err(|source| DomainError::Descriptor {
            domain: name.clone(),
            source,
        })?;

    let info = handle.info().map_err(|source| DomainError::Info {
        domain: name.clone(),
        source,
    })?;

    emit_info(&name, &uuid, &descriptor, &info, out);
    emit_vcpus(handle, &name, &info, &record.stats, out)?;
    emit_blocks(handle, &name, &descriptor, &record.stats, log_once, out)?;
    emit_interfaces(&name, &descriptor, &record.stats, out);
    emit_memory(handle, &name, out);

    debug!(
        domain = %name,
        vcpus = record.stats.vcpus.len(),
        blocks = record.stats.blocks.len(),
        nets = record.stats.nets.len(),
        "Domain collected"
    );
    Ok(())
}

fn emit_info(
    name: &str,
    uuid: &str,
    descriptor: &DomainDescriptor,
    info: &DomainInfo,
    out: &mut Vec<Measurement>,
) {
    let m = &descriptor.metadata;
    out.push(DOMAIN_META.measure(
        [
            name,
            uuid,
            &m.instance_name,
            &m.flavor,
            &m.user_name,
            &m.user_uuid,
            &m.project_name,
            &m.project_uuid,
            &m.root_type,
            &m.root_uuid,
        ],
        1.0,
    ));
    out.push(DOMAIN_MAX_MEMORY.measure([name], Unit::KibToBytes.apply(info.max_mem_kib)));
    out.push(DOMAIN_MEMORY_USAGE.measure([name], Unit::KibToBytes.apply(info.memory_kib)));
    out.push(DOMAIN_VIRTUAL_CPUS.measure([name], f64::from(info.nr_virt_cpu)));
    out.push(DOMAIN_CPU_TIME.measure([name], Unit::NanosToSeconds.apply(info.cpu_time_ns)));
    out.push(DOMAIN_STATE.measure([name], f64::from(info.state)));
}

// =============================================================================
// VCPU
// =============================================================================

/// Both halves of one vCPU's data.
#[derive(Debug, Default)]
struct VcpuRow {
    info: Option<VcpuInfo>,
    wait: Option<u64>,
    delay: Option<u64>,
}

fn emit_vcpus(
    handle: &dyn DomainHandle,
    name: &str,
    info: &DomainInfo,
    stats: &DomainStats,
    out: &mut Vec<Measurement>,
) -> Result<(), DomainError> {
    let mut rows: BTreeMap<u32, VcpuRow> = BTreeMap::new();

    match handle.vcpus(info.nr_virt_cpu) {
        Ok(vcpus) => {
            for vcpu in vcpus {
                rows.entry(vcpu.number).or_default().info = Some(vcpu);
            }
        }
        Err(e) if e.is_invalid() => {
            debug!(domain = %name, error = %e, "Per-vCPU info unavailable");
        }
        Err(source) => {
            return Err(DomainError::Vcpus {
                domain: name.to_string(),
                source,
            })
        }
    }

    // The bulk array is indexed by position, not by reported vCPU number
    for (index, vcpu) in stats.vcpus.iter().enumerate() {
        let row = rows.entry(index as u32).or_default();
        row.wait = vcpu.wait;
        row.delay = vcpu.delay;
    }

    for (index, row) in rows {
        let index = index.to_string();
        let labels = [name, index.as_str()];
        if let Some(vcpu) = row.info {
            out.push(VCPU_STATE.measure(labels, f64::from(vcpu.state)));
            out.push(VCPU_TIME.measure(labels, Unit::NanosToSeconds.apply(vcpu.cpu_time_ns)));
            out.push(VCPU_CPU.measure(labels, f64::from(vcpu.cpu)));
        }
        if let Some(wait) = row.wait {
            out.push(VCPU_WAIT.measure(labels, Unit::NanosToSeconds.apply(wait)));
        }
        if let Some(delay) = row.delay {
            out.push(VCPU_DELAY.measure(labels, Unit::NanosToSeconds.apply(delay)));
        }
    }
    Ok(())
}

// =============================================================================
// BLOCK DEVICES
// =============================================================================

fn emit_blocks(
    handle: &dyn DomainHandle,
    name: &str,
    descriptor: &DomainDescriptor,
    stats: &DomainStats,
    log_once: &LogOnce,
    out: &mut Vec<Measurement>,
) -> Result<(), DomainError> {
    for block in &stats.blocks {
        let device = block.name.as_str();
        if SKIPPED_BLOCK_DEVICES.contains(&device) {
            continue;
        }

        match descriptor.disk(device) {
            Some(disk) => {
                let source = block.path.as_deref().unwrap_or(&disk.source_name);
                out.push(BLOCK_META.measure(
                    [
                        name,
                        device,
                        source,
                        &disk.serial,
                        &disk.bus,
                        &disk.disk_type,
                        &disk.driver_type,
                        &disk.cache,
                        &disk.discard,
                    ],
                    1.0,
                ));
            }
            None => {
                warn!(domain = %name, device = %device, "Block device missing from descriptor, skipping metadata");
            }
        }

        emit_fields(&BLOCK_FIELDS, block, [name, device], out);

        match handle.block_io_tune(device) {
            Ok(tune) => emit_fields(&THROTTLE_FIELDS, &tune, [name, device], out),
            Err(e) if e.is_invalid() => {
                warn!(domain = %name, device = %device, error = %e, "Invalid operation GetBlockIoTune");
            }
            Err(e) if e.is_unsupported() => {
                if log_once.first(BLKIOTUNE_UNSUPPORTED) {
                    warn!(error = %e, "Unsupported operation GetBlockIoTune");
                }
            }
            Err(source) => {
                return Err(DomainError::Throttle {
                    domain: name.to_string(),
                    device: device.to_string(),
                    source,
                })
            }
        }
    }
    Ok(())
}

// =============================================================================
// NETWORK INTERFACES
// =============================================================================

fn emit_interfaces(
    name: &str,
    descriptor: &DomainDescriptor,
    stats: &DomainStats,
    out: &mut Vec<Measurement>,
) {
    for net in &stats.nets {
        let device = net.name.as_str();
        match descriptor.interface(device) {
            Some(iface) if !iface.source_bridge.is_empty() || !iface.virtual_interface.is_empty() => {
                out.push(INTERFACE_META.measure(
                    [name, &iface.source_bridge, device, &iface.virtual_interface],
                    1.0,
                ));
            }
            Some(_) => {}
            None => {
                warn!(domain = %name, device = %device, "Interface missing from descriptor, skipping metadata");
            }
        }

        emit_fields(&NET_FIELDS, net, [name, device], out);
    }
}

fn emit_memory(handle: &dyn DomainHandle, name: &str, out: &mut Vec<Measurement>) {
    match handle.memory_stats() {
        Ok(stats) => MemoryStats::from_stats(&stats).emit(name, out),
        Err(e) => debug!(domain = %name, error = %e, "Memory statistics unavailable"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use virtmon_hypervisor::{
        BlockStats, Connector, HypervisorError, MockConnector, MockDomain, VcpuStats,
    };

    fn collect(domain: MockDomain) -> (Result<(), DomainError>, Vec<Measurement>) {
        let connector = MockConnector::builder().domain(domain).build();
        let session = connector.open("test:///default").unwrap();
        let records = session.all_domain_stats().unwrap();
        let mut out = Vec::new();
        let result = collect_domain(&records[0], &LogOnce::new(), &mut out);
        (result, out)
    }

    fn named<'a>(out: &'a [Measurement], metric: &str) -> Vec<&'a Measurement> {
        out.iter().filter(|m| m.name == metric).collect()
    }

    #[test]
    fn test_info_measurements() {
        let domain = MockDomain::new("vm", "uuid-1").with_info(DomainInfo {
            state: 1,
            max_mem_kib: 2048,
            memory_kib: 1024,
            nr_virt_cpu: 2,
            cpu_time_ns: 5_000_000_000,
        });
        let (result, out) = collect(domain);
        result.unwrap();

        let meta = named(&out, "libvirt_domain_info_meta");
        assert_eq!(meta.len(), 1);
        assert_eq!(meta[0].label("uuid"), Some("uuid-1"));
        assert_eq!(meta[0].label("flavor"), Some(""));

        assert_eq!(named(&out, "libvirt_domain_info_maximum_memory_bytes")[0].value, 2_097_152.0);
        assert_eq!(named(&out, "libvirt_domain_info_cpu_time_seconds_total")[0].value, 5.0);
        assert_eq!(named(&out, "libvirt_domain_info_vstate")[0].value, 1.0);
    }

    #[test]
    fn test_vcpu_halves_merge_by_index() {
        let stats = DomainStats {
            vcpus: vec![
                VcpuStats {
                    wait: Some(2_000_000_000),
                    ..Default::default()
                },
                VcpuStats {
                    delay: Some(1_000_000_000),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let domain = MockDomain::new("vm", "uuid-1")
            .with_info(DomainInfo {
                nr_virt_cpu: 4,
                ..Default::default()
            })
            .with_stats(stats)
            .with_vcpus(vec![VcpuInfo {
                number: 3,
                state: 1,
                cpu_time_ns: 7_000_000_000,
                cpu: 5,
            }]);
        let (result, out) = collect(domain);
        result.unwrap();

        let for_vcpu = |n: &str| -> Vec<&str> {
            out.iter()
                .filter(|m| m.label("vcpu") == Some(n))
                .map(|m| m.name)
                .collect()
        };
        assert_eq!(
            for_vcpu("3"),
            vec![
                "libvirt_domain_vcpu_state",
                "libvirt_domain_vcpu_time_seconds_total",
                "libvirt_domain_vcpu_cpu",
            ]
        );
        assert_eq!(for_vcpu("0"), vec!["libvirt_domain_vcpu_wait_seconds_total"]);
        assert_eq!(for_vcpu("1"), vec!["libvirt_domain_vcpu_delay_seconds_total"]);
        assert_eq!(named(&out, "libvirt_domain_vcpu_time_seconds_total")[0].value, 7.0);
    }

    #[test]
    fn test_vcpu_invalid_keeps_bulk_half() {
        let stats = DomainStats {
            vcpus: vec![VcpuStats {
                wait: Some(1),
                ..Default::default()
            }],
            ..Default::default()
        };
        let domain = MockDomain::new("vm", "uuid-1")
            .with_stats(stats)
            .with_vcpus_error(HypervisorError::OperationInvalid("not running".into()));
        let (result, out) = collect(domain);
        result.unwrap();
        assert!(named(&out, "libvirt_domain_vcpu_state").is_empty());
        assert_eq!(named(&out, "libvirt_domain_vcpu_wait_seconds_total").len(), 1);
    }

    #[test]
    fn test_vcpu_other_error_fails_domain() {
        let domain = MockDomain::new("vm", "uuid-1")
            .with_vcpus_error(HypervisorError::QueryFailed("rpc".into()));
        let (result, _) = collect(domain);
        assert!(matches!(result, Err(DomainError::Vcpus { .. })));
    }

    #[test]
    fn test_block_source_falls_back_to_descriptor() {
        let xml = r#"<domain><devices>
            <disk type='network'><source name='pool/vol'/><target dev='vda' bus='virtio'/><serial>s1</serial></disk>
            <disk type='file'><source file='/img/b.qcow2'/><target dev='vdb' bus='virtio'/></disk>
        </devices></domain>"#;
        let stats = DomainStats {
            blocks: vec![
                BlockStats::new("vda"),
                BlockStats {
                    path: Some("/live/b.qcow2".into()),
                    ..BlockStats::new("vdb")
                },
                BlockStats::new("hdc"),
                BlockStats {
                    rd_bytes: Some(10),
                    ..BlockStats::new("vdz")
                },
            ],
            ..Default::default()
        };
        let domain = MockDomain::new("vm", "uuid-1").with_xml(xml).with_stats(stats);
        let (result, out) = collect(domain);
        result.unwrap();

        let meta = named(&out, "libvirt_domain_block_meta");
        assert_eq!(meta.len(), 2);
        assert_eq!(meta[0].label("source_file"), Some("pool/vol"));
        assert_eq!(meta[0].label("serial"), Some("s1"));
        assert_eq!(meta[1].label("source_file"), Some("/live/b.qcow2"));

        assert!(out.iter().all(|m| m.label("target_device") != Some("hdc")));

        // Unmatched device keeps its counters
        let reads = named(&out, "libvirt_domain_block_stats_read_bytes_total");
        assert_eq!(reads.len(), 1);
        assert_eq!(reads[0].label("target_device"), Some("vdz"));
    }

    #[test]
    fn test_throttle_other_error_fails_domain() {
        let stats = DomainStats {
            blocks: vec![BlockStats::new("vda")],
            ..Default::default()
        };
        let domain = MockDomain::new("vm", "uuid-1")
            .with_stats(stats)
            .with_io_tune_error("vda", HypervisorError::QueryFailed("rpc".into()));
        let (result, _) = collect(domain);
        match result {
            Err(DomainError::Throttle { device, .. }) => assert_eq!(device, "vda"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_interface_meta_needs_enrichment() {
        let xml = r#"<domain><devices>
            <interface type='bridge'><source bridge='br0'/><target dev='vnet0'/></interface>
            <interface type='network'><target dev='vnet1'/></interface>
        </devices></domain>"#;
        let stats = DomainStats {
            nets: vec![
                virtmon_hypervisor::NetStats {
                    rx_bytes: Some(5),
                    ..virtmon_hypervisor::NetStats::new("vnet0")
                },
                virtmon_hypervisor::NetStats::new("vnet1"),
            ],
            ..Default::default()
        };
        let domain = MockDomain::new("vm", "uuid-1").with_xml(xml).with_stats(stats);
        let (result, out) = collect(domain);
        result.unwrap();

        let meta = named(&out, "libvirt_domain_interface_meta");
        assert_eq!(meta.len(), 1);
        assert_eq!(meta[0].label("source_bridge"), Some("br0"));
        assert_eq!(meta[0].label("virtual_interface"), Some(""));
        assert_eq!(named(&out, "libvirt_domain_interface_stats_receive_bytes_total").len(), 1);
        assert!(named(&out, "libvirt_domain_interface_stats_transmit_bytes_total").is_empty());
    }

    #[test]
    fn test_memory_failure_emits_nothing() {
        let domain = MockDomain::new("vm", "uuid-1")
            .with_memory_error(HypervisorError::OperationInvalid("not running".into()));
        let (result, out) = collect(domain);
        result.unwrap();
        assert!(out.iter().all(|m| !m.name.starts_with("libvirt_domain_memory_stats")));
    }
}
