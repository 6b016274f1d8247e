//! Host metrics from the telemetry collector.
//!
//! Each source is fetched independently. A failing source is logged and
//! skipped; it never affects the other host metrics or the hypervisor part
//! of the scrape.

use tracing::{debug, warn};
use virtmon_telemetry::{NetworkStats, TelemetryCollector, TelemetryError};

use crate::catalog::*;
use crate::measurement::Sink;

/// Emit every available host metric into `sink`.
pub fn collect_host(telemetry: &TelemetryCollector, sink: &mut dyn Sink) {
    let identity = telemetry.identity();
    sink.emit(NODE_INFO.measure([&identity.hostname, &identity.kernel_version], 1.0));

    match telemetry.uptime() {
        Ok(uptime) => sink.emit(NODE_UPTIME.measure([], uptime)),
        Err(e) => skipped("uptime", &e),
    }

    match telemetry.cpu() {
        Ok(cpu) => {
            for (mode, seconds) in cpu.total.modes() {
                sink.emit(NODE_CPU_USAGE.measure([mode], seconds));
            }
            sink.emit(NODE_CPU_LOGICAL_CORES.measure([], cpu.logical_cores as f64));
        }
        Err(e) => skipped("cpu", &e),
    }

    match telemetry.memory() {
        Ok(mem) => {
            sink.emit(NODE_MEMORY_TOTAL.measure([], mem.total_bytes as f64));
            sink.emit(NODE_MEMORY_FREE.measure([], mem.free_bytes as f64));
            sink.emit(NODE_MEMORY_AVAILABLE.measure([], mem.available_bytes as f64));
            sink.emit(NODE_MEMORY_CACHED.measure([], mem.cached_bytes as f64));
        }
        Err(e) => skipped("memory", &e),
    }

    match telemetry.disks() {
        Ok(disks) => {
            for disk in disks {
                let labels = [disk.device.as_str()];
                sink.emit(NODE_DISK_READS.measure(labels, disk.reads as f64));
                sink.emit(NODE_DISK_WRITES.measure(labels, disk.writes as f64));
                sink.emit(NODE_DISK_READ_BYTES.measure(labels, disk.read_bytes as f64));
                sink.emit(NODE_DISK_WRITTEN_BYTES.measure(labels, disk.written_bytes as f64));
                sink.emit(NODE_DISK_READ_TIME.measure(labels, disk.read_time_seconds));
                sink.emit(NODE_DISK_WRITE_TIME.measure(labels, disk.write_time_seconds));
                sink.emit(NODE_DISK_IO_TIME.measure(labels, disk.io_time_seconds));
            }
        }
        Err(e) => skipped("disks", &e),
    }

    match telemetry.networks() {
        Ok(networks) => emit_networks(&networks, sink),
        Err(e) => skipped("networks", &e),
    }
}

fn emit_networks(networks: &[NetworkStats], sink: &mut dyn Sink) {
    for net in networks {
        let labels = [net.interface.as_str()];
        sink.emit(NODE_NET_RX_BYTES.measure(labels, net.rx_bytes as f64));
        sink.emit(NODE_NET_TX_BYTES.measure(labels, net.tx_bytes as f64));
        sink.emit(NODE_NET_RX_PACKETS.measure(labels, net.rx_packets as f64));
        sink.emit(NODE_NET_TX_PACKETS.measure(labels, net.tx_packets as f64));
        if let Some(up) = net.up {
            sink.emit(NODE_NET_INTERFACE_UP.measure(labels, if up { 1.0 } else { 0.0 }));
        }
        for ip in &net.addresses {
            let ip = ip.to_string();
            sink.emit(NODE_NET_INTERFACE_IP.measure([net.interface.as_str(), ip.as_str()], 1.0));
        }
    }
}

fn skipped(source: &'static str, error: &TelemetryError) {
    if error.is_not_found() {
        debug!(source, error = %error, "Host statistics not available");
    } else {
        warn!(source, error = %error, "Failed to read host statistics");
    }
}
