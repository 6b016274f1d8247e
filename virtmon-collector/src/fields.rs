//! Presence-aware field tables.
//!
//! Each statistic group is described once as an ordered list of
//! `(metric, accessor, unit)` entries. An accessor returning `None` means the
//! hypervisor did not report the field, and nothing is emitted for it.

use virtmon_hypervisor::{BlockIoTune, BlockStats, NetStats};

use crate::catalog::*;
use crate::measurement::{Measurement, Metric};

/// Conversion applied to a raw hypervisor value before emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    None,
    NanosToSeconds,
    KibToBytes,
}

impl Unit {
    pub fn apply(self, raw: u64) -> f64 {
        match self {
            Unit::None => raw as f64,
            Unit::NanosToSeconds => raw as f64 / 1e9,
            Unit::KibToBytes => raw.saturating_mul(1024) as f64,
        }
    }
}

/// One optional field of a per-device statistic group.
pub struct Field<T> {
    pub metric: &'static Metric<2>,
    pub value: fn(&T) -> Option<u64>,
    pub unit: Unit,
}

const fn field<T>(metric: &'static Metric<2>, value: fn(&T) -> Option<u64>, unit: Unit) -> Field<T> {
    Field { metric, value, unit }
}

pub static BLOCK_FIELDS: [Field<BlockStats>; 11] = [
    field(&BLOCK_READ_BYTES, |b: &BlockStats| b.rd_bytes, Unit::None),
    field(&BLOCK_READ_REQUESTS, |b: &BlockStats| b.rd_reqs, Unit::None),
    field(&BLOCK_READ_TIME, |b: &BlockStats| b.rd_times, Unit::NanosToSeconds),
    field(&BLOCK_WRITE_BYTES, |b: &BlockStats| b.wr_bytes, Unit::None),
    field(&BLOCK_WRITE_REQUESTS, |b: &BlockStats| b.wr_reqs, Unit::None),
    field(&BLOCK_WRITE_TIME, |b: &BlockStats| b.wr_times, Unit::NanosToSeconds),
    field(&BLOCK_FLUSH_REQUESTS, |b: &BlockStats| b.fl_reqs, Unit::None),
    field(&BLOCK_FLUSH_TIME, |b: &BlockStats| b.fl_times, Unit::NanosToSeconds),
    field(&BLOCK_ALLOCATION, |b: &BlockStats| b.allocation, Unit::None),
    field(&BLOCK_CAPACITY, |b: &BlockStats| b.capacity, Unit::None),
    field(&BLOCK_PHYSICAL_SIZE, |b: &BlockStats| b.physical, Unit::None),
];

pub static NET_FIELDS: [Field<NetStats>; 8] = [
    field(&INTERFACE_RX_BYTES, |n: &NetStats| n.rx_bytes, Unit::None),
    field(&INTERFACE_RX_PACKETS, |n: &NetStats| n.rx_pkts, Unit::None),
    field(&INTERFACE_RX_ERRORS, |n: &NetStats| n.rx_errs, Unit::None),
    field(&INTERFACE_RX_DROPS, |n: &NetStats| n.rx_drop, Unit::None),
    field(&INTERFACE_TX_BYTES, |n: &NetStats| n.tx_bytes, Unit::None),
    field(&INTERFACE_TX_PACKETS, |n: &NetStats| n.tx_pkts, Unit::None),
    field(&INTERFACE_TX_ERRORS, |n: &NetStats| n.tx_errs, Unit::None),
    field(&INTERFACE_TX_DROPS, |n: &NetStats| n.tx_drop, Unit::None),
];

// Throttle values are reported as the hypervisor returns them.
pub static THROTTLE_FIELDS: [Field<BlockIoTune>; 19] = [
    field(&LIMIT_TOTAL_BYTES, |t: &BlockIoTune| t.total_bytes_sec, Unit::None),
    field(&LIMIT_READ_BYTES, |t: &BlockIoTune| t.read_bytes_sec, Unit::None),
    field(&LIMIT_WRITE_BYTES, |t: &BlockIoTune| t.write_bytes_sec, Unit::None),
    field(&LIMIT_TOTAL_REQUESTS, |t: &BlockIoTune| t.total_iops_sec, Unit::None),
    field(&LIMIT_READ_REQUESTS, |t: &BlockIoTune| t.read_iops_sec, Unit::None),
    field(&LIMIT_WRITE_REQUESTS, |t: &BlockIoTune| t.write_iops_sec, Unit::None),
    field(&LIMIT_BURST_TOTAL_BYTES, |t: &BlockIoTune| t.total_bytes_sec_max, Unit::None),
    field(&LIMIT_BURST_READ_BYTES, |t: &BlockIoTune| t.read_bytes_sec_max, Unit::None),
    field(&LIMIT_BURST_WRITE_BYTES, |t: &BlockIoTune| t.write_bytes_sec_max, Unit::None),
    field(&LIMIT_BURST_TOTAL_REQUESTS, |t: &BlockIoTune| t.total_iops_sec_max, Unit::None),
    field(&LIMIT_BURST_READ_REQUESTS, |t: &BlockIoTune| t.read_iops_sec_max, Unit::None),
    field(&LIMIT_BURST_WRITE_REQUESTS, |t: &BlockIoTune| t.write_iops_sec_max, Unit::None),
    field(&LIMIT_BURST_TOTAL_BYTES_LENGTH, |t: &BlockIoTune| t.total_bytes_sec_max_length, Unit::None),
    field(&LIMIT_BURST_READ_BYTES_LENGTH, |t: &BlockIoTune| t.read_bytes_sec_max_length, Unit::None),
    field(&LIMIT_BURST_WRITE_BYTES_LENGTH, |t: &BlockIoTune| t.write_bytes_sec_max_length, Unit::None),
    field(&LIMIT_BURST_TOTAL_REQUESTS_LENGTH, |t: &BlockIoTune| t.total_iops_sec_max_length, Unit::None),
    field(&LIMIT_BURST_READ_REQUESTS_LENGTH, |t: &BlockIoTune| t.read_iops_sec_max_length, Unit::None),
    field(&LIMIT_BURST_WRITE_REQUESTS_LENGTH, |t: &BlockIoTune| t.write_iops_sec_max_length, Unit::None),
    field(&LIMIT_SIZE_IOPS, |t: &BlockIoTune| t.size_iops_sec, Unit::None),
];

/// Emit every present field of `stats` with the given two label values.
pub fn emit_fields<T>(fields: &[Field<T>], stats: &T, labels: [&str; 2], out: &mut Vec<Measurement>) {
    for f in fields {
        if let Some(raw) = (f.value)(stats) {
            out.push(f.metric.measure(labels, f.unit.apply(raw)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_conversions() {
        assert_eq!(Unit::NanosToSeconds.apply(5_000_000_000), 5.0);
        assert_eq!(Unit::KibToBytes.apply(2048), 2_097_152.0);
        assert_eq!(Unit::None.apply(42), 42.0);
        assert_eq!(Unit::KibToBytes.apply(u64::MAX), u64::MAX as f64);
    }

    #[test]
    fn test_absent_fields_not_emitted() {
        let stats = BlockStats {
            rd_bytes: Some(0),
            wr_times: Some(3_000_000_000),
            ..BlockStats::new("vda")
        };
        let mut out = Vec::new();
        emit_fields(&BLOCK_FIELDS, &stats, ["vm", "vda"], &mut out);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].name, "libvirt_domain_block_stats_read_bytes_total");
        assert_eq!(out[0].value, 0.0);
        assert_eq!(out[1].name, "libvirt_domain_block_stats_write_time_seconds_total");
        assert_eq!(out[1].value, 3.0);
    }

    #[test]
    fn test_throttle_table_covers_every_field() {
        let tune = BlockIoTune {
            total_bytes_sec: Some(1),
            read_bytes_sec: Some(1),
            write_bytes_sec: Some(1),
            total_iops_sec: Some(1),
            read_iops_sec: Some(1),
            write_iops_sec: Some(1),
            total_bytes_sec_max: Some(1),
            read_bytes_sec_max: Some(1),
            write_bytes_sec_max: Some(1),
            total_iops_sec_max: Some(1),
            read_iops_sec_max: Some(1),
            write_iops_sec_max: Some(1),
            total_bytes_sec_max_length: Some(1),
            read_bytes_sec_max_length: Some(1),
            write_bytes_sec_max_length: Some(1),
            total_iops_sec_max_length: Some(1),
            read_iops_sec_max_length: Some(1),
            write_iops_sec_max_length: Some(1),
            size_iops_sec: Some(1),
        };
        let mut out = Vec::new();
        emit_fields(&THROTTLE_FIELDS, &tune, ["vm", "vda"], &mut out);
        assert_eq!(out.len(), 19);

        let mut names: Vec<_> = out.iter().map(|m| m.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 19);
    }
}
