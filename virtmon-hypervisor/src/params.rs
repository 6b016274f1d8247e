//! Decoding of flat typed-parameter lists into structured statistics.
//!
//! The bulk statistics call and the block I/O tuning call both answer with a
//! flat list of `key -> value` pairs such as `vcpu.2.wait`,
//! `block.0.rd.bytes` or `total_bytes_sec_max`. Keys that are missing from
//! the list decode to `None`.

use crate::types::{BlockIoTune, BlockStats, DomainStats, NetStats, ParamValue, TypedParam, VcpuStats};

// =============================================================================
// BULK DOMAIN STATISTICS
// =============================================================================

impl DomainStats {
    /// Decode the typed parameters of one bulk statistics record.
    ///
    /// The vCPU array is sized by `vcpu.maximum` (or the highest index seen
    /// plus one), the block and network arrays by `block.count` and
    /// `net.count` in the same way. Entries that the hypervisor did not
    /// fill stay all-`None`.
    pub fn from_params(params: &[TypedParam]) -> Self {
        let mut stats = DomainStats::default();

        let mut vcpu_len = 0usize;
        let mut block_len = 0usize;
        let mut net_len = 0usize;

        // First pass: array sizes, so indexed writes never reallocate
        for p in params {
            match p.field.as_str() {
                "vcpu.maximum" => vcpu_len = vcpu_len.max(count(&p.value)),
                "block.count" => block_len = block_len.max(count(&p.value)),
                "net.count" => net_len = net_len.max(count(&p.value)),
                field => {
                    if let Some((group, idx, _)) = split_indexed(field) {
                        match group {
                            "vcpu" => vcpu_len = vcpu_len.max(idx + 1),
                            "block" => block_len = block_len.max(idx + 1),
                            "net" => net_len = net_len.max(idx + 1),
                            _ => {}
                        }
                    }
                }
            }
        }

        stats.vcpus.resize(vcpu_len, VcpuStats::default());
        stats.blocks.resize(block_len, BlockStats::default());
        stats.nets.resize(net_len, NetStats::default());

        for p in params {
            let Some((group, idx, key)) = split_indexed(&p.field) else {
                continue;
            };
            match group {
                "vcpu" => apply_vcpu(&mut stats.vcpus[idx], key, &p.value),
                "block" => apply_block(&mut stats.blocks[idx], key, &p.value),
                "net" => apply_net(&mut stats.nets[idx], key, &p.value),
                _ => {}
            }
        }

        stats
    }
}

/// Split `group.<n>.rest` into its parts. Non-indexed keys yield `None`.
fn split_indexed(field: &str) -> Option<(&str, usize, &str)> {
    let (group, rest) = field.split_once('.')?;
    let (idx, key) = rest.split_once('.')?;
    let idx = idx.parse().ok()?;
    Some((group, idx, key))
}

fn count(value: &ParamValue) -> usize {
    value.as_u64().and_then(|v| usize::try_from(v).ok()).unwrap_or(0)
}

fn apply_vcpu(vcpu: &mut VcpuStats, key: &str, value: &ParamValue) {
    match key {
        "state" => vcpu.state = value.as_i64(),
        "time" => vcpu.time = value.as_u64(),
        "wait" => vcpu.wait = value.as_u64(),
        "delay" => vcpu.delay = value.as_u64(),
        _ => {}
    }
}

fn apply_block(block: &mut BlockStats, key: &str, value: &ParamValue) {
    let slot = match key {
        "name" => {
            if let Some(name) = value.as_str() {
                block.name = name.to_string();
            }
            return;
        }
        "path" => {
            block.path = value.as_str().map(str::to_string);
            return;
        }
        "rd.reqs" => &mut block.rd_reqs,
        "rd.bytes" => &mut block.rd_bytes,
        "rd.times" => &mut block.rd_times,
        "wr.reqs" => &mut block.wr_reqs,
        "wr.bytes" => &mut block.wr_bytes,
        "wr.times" => &mut block.wr_times,
        "fl.reqs" => &mut block.fl_reqs,
        "fl.times" => &mut block.fl_times,
        "allocation" => &mut block.allocation,
        "capacity" => &mut block.capacity,
        "physical" => &mut block.physical,
        _ => return,
    };
    *slot = value.as_u64();
}

fn apply_net(net: &mut NetStats, key: &str, value: &ParamValue) {
    let slot = match key {
        "name" => {
            if let Some(name) = value.as_str() {
                net.name = name.to_string();
            }
            return;
        }
        "rx.bytes" => &mut net.rx_bytes,
        "rx.pkts" => &mut net.rx_pkts,
        "rx.errs" => &mut net.rx_errs,
        "rx.drop" => &mut net.rx_drop,
        "tx.bytes" => &mut net.tx_bytes,
        "tx.pkts" => &mut net.tx_pkts,
        "tx.errs" => &mut net.tx_errs,
        "tx.drop" => &mut net.tx_drop,
        _ => return,
    };
    *slot = value.as_u64();
}

// =============================================================================
// BLOCK I/O TUNING
// =============================================================================

impl BlockIoTune {
    /// Decode the typed parameters returned by the block I/O tuning call.
    pub fn from_params(params: &[TypedParam]) -> Self {
        let mut tune = BlockIoTune::default();
        for p in params {
            let slot = match p.field.as_str() {
                "total_bytes_sec" => &mut tune.total_bytes_sec,
                "read_bytes_sec" => &mut tune.read_bytes_sec,
                "write_bytes_sec" => &mut tune.write_bytes_sec,
                "total_iops_sec" => &mut tune.total_iops_sec,
                "read_iops_sec" => &mut tune.read_iops_sec,
                "write_iops_sec" => &mut tune.write_iops_sec,
                "total_bytes_sec_max" => &mut tune.total_bytes_sec_max,
                "read_bytes_sec_max" => &mut tune.read_bytes_sec_max,
                "write_bytes_sec_max" => &mut tune.write_bytes_sec_max,
                "total_iops_sec_max" => &mut tune.total_iops_sec_max,
                "read_iops_sec_max" => &mut tune.read_iops_sec_max,
                "write_iops_sec_max" => &mut tune.write_iops_sec_max,
                "total_bytes_sec_max_length" => &mut tune.total_bytes_sec_max_length,
                "read_bytes_sec_max_length" => &mut tune.read_bytes_sec_max_length,
                "write_bytes_sec_max_length" => &mut tune.write_bytes_sec_max_length,
                "total_iops_sec_max_length" => &mut tune.total_iops_sec_max_length,
                "read_iops_sec_max_length" => &mut tune.read_iops_sec_max_length,
                "write_iops_sec_max_length" => &mut tune.write_iops_sec_max_length,
                "size_iops_sec" => &mut tune.size_iops_sec,
                _ => continue,
            };
            *slot = p.value.as_u64();
        }
        tune
    }
}
