//! Network device counters, link state and assigned addresses.

use serde::Serialize;
use std::collections::HashMap;
use std::net::IpAddr;
use std::path::Path;
use sysinfo::Networks;

use crate::error::{read, Result, TelemetryError};

/// `IFF_UP` in the interface flags word.
const IFF_UP: u32 = 0x1;

/// Cumulative counters of one network interface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NetworkStats {
    pub interface: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub rx_packets: u64,
    pub tx_packets: u64,
    /// Administrative state; `None` when the flags file is unreadable
    pub up: Option<bool>,
    pub addresses: Vec<IpAddr>,
}

/// Collect per-interface counters, sorted by interface name.
///
/// `addresses` is the host's `(interface, address)` list; each interface
/// keeps its addresses in the order listed.
pub fn collect_network_stats(
    networks: &Networks,
    sys_root: &Path,
    addresses: &[(String, IpAddr)],
) -> Vec<NetworkStats> {
    let mut by_interface = group_addresses(addresses);
    let mut stats: Vec<NetworkStats> = networks
        .list()
        .iter()
        .map(|(name, data)| NetworkStats {
            interface: name.clone(),
            rx_bytes: data.total_received(),
            tx_bytes: data.total_transmitted(),
            rx_packets: data.total_packets_received(),
            tx_packets: data.total_packets_transmitted(),
            up: read_interface_up(sys_root, name).ok(),
            addresses: by_interface.remove(name.as_str()).unwrap_or_default(),
        })
        .collect();
    stats.sort_by(|a, b| a.interface.cmp(&b.interface));
    stats
}

/// Whether `<sys_root>/class/net/<interface>/flags` has `IFF_UP` set.
pub fn read_interface_up(sys_root: &Path, interface: &str) -> Result<bool> {
    let path = sys_root.join("class/net").join(interface).join("flags");
    let content = read(&path)?;
    let raw = content.trim();
    let flags = u32::from_str_radix(raw.trim_start_matches("0x"), 16)
        .map_err(|_| TelemetryError::parse(&path, format!("invalid flags {:?}", raw)))?;
    Ok(flags & IFF_UP != 0)
}

/// Group an `(interface, address)` list by interface, dropping duplicates.
pub fn group_addresses(addresses: &[(String, IpAddr)]) -> HashMap<&str, Vec<IpAddr>> {
    let mut grouped: HashMap<&str, Vec<IpAddr>> = HashMap::new();
    for (interface, ip) in addresses {
        let entry = grouped.entry(interface.as_str()).or_default();
        if !entry.contains(ip) {
            entry.push(*ip);
        }
    }
    grouped
}
