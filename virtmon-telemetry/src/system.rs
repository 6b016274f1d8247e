//! Host identity and uptime.

use serde::Serialize;
use std::path::Path;
use sysinfo::System;

use crate::error::{read, Result, TelemetryError};

/// Identity of the host, resolved once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NodeIdentity {
    pub hostname: String,
    pub kernel_version: String,
}

/// Collect hostname and kernel version.
pub fn collect_node_identity() -> NodeIdentity {
    NodeIdentity {
        hostname: System::host_name().unwrap_or_else(|| "unknown".to_string()),
        kernel_version: System::kernel_version().unwrap_or_else(|| "unknown".to_string()),
    }
}

/// Seconds since boot from `<proc_root>/uptime`.
pub fn read_uptime(proc_root: &Path) -> Result<f64> {
    let path = proc_root.join("uptime");
    let content = read(&path)?;
    content
        .split_whitespace()
        .next()
        .and_then(|v| v.parse::<f64>().ok())
        .ok_or_else(|| TelemetryError::parse(&path, "expected uptime seconds"))
}
