//! Memory totals from `/proc/meminfo`.

use serde::Serialize;
use std::path::Path;

use crate::error::{read, Result, TelemetryError};

/// Host memory figures in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemoryInfo {
    pub total_bytes: u64,
    pub free_bytes: u64,
    pub available_bytes: u64,
    /// Page cache
    pub cached_bytes: u64,
}

/// Parse `<proc_root>/meminfo`.
pub fn read_memory_info(proc_root: &Path) -> Result<MemoryInfo> {
    let path = proc_root.join("meminfo");
    parse_meminfo(&read(&path)?, &path)
}

fn parse_meminfo(content: &str, path: &Path) -> Result<MemoryInfo> {
    let mut info = MemoryInfo::default();
    let mut seen_total = false;

    for line in content.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let mut parts = rest.split_whitespace();
        let Some(value) = parts.next().and_then(|v| v.parse::<u64>().ok()) else {
            continue;
        };
        // Values are in kB unless no unit is given
        let bytes = match parts.next() {
            Some("kB") => value * 1024,
            _ => value,
        };
        match key {
            "MemTotal" => {
                info.total_bytes = bytes;
                seen_total = true;
            }
            "MemFree" => info.free_bytes = bytes,
            "MemAvailable" => info.available_bytes = bytes,
            "Cached" => info.cached_bytes = bytes,
            _ => {}
        }
    }

    if !seen_total {
        return Err(TelemetryError::parse(path, "MemTotal missing"));
    }
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_meminfo() {
        let content = "MemTotal:       16384 kB
MemFree:         2048 kB
MemAvailable:    8192 kB
Buffers:          512 kB
Cached:          4096 kB
SwapCached:         0 kB
HugePages_Total:    0
";
        let info = parse_meminfo(content, Path::new("meminfo")).unwrap();
        assert_eq!(info.total_bytes, 16384 * 1024);
        assert_eq!(info.free_bytes, 2048 * 1024);
        assert_eq!(info.available_bytes, 8192 * 1024);
        assert_eq!(info.cached_bytes, 4096 * 1024);
    }

    #[test]
    fn test_parse_meminfo_without_total() {
        assert!(parse_meminfo("MemFree: 1 kB\n", Path::new("meminfo")).is_err());
    }
}
