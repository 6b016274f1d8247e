//! Kernel block device counters from `/proc/diskstats`.

use serde::Serialize;
use std::path::Path;

use crate::error::{read, Result};

/// Sector size used by `/proc/diskstats`, independent of the device.
const SECTOR_BYTES: u64 = 512;

/// Cumulative I/O counters of one whole block device.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiskStats {
    pub device: String,
    pub reads: u64,
    pub writes: u64,
    pub read_bytes: u64,
    pub written_bytes: u64,
    pub read_time_seconds: f64,
    pub write_time_seconds: f64,
    pub io_time_seconds: f64,
}

/// Parse `<proc_root>/diskstats`, keeping whole devices only.
pub fn read_disk_stats(proc_root: &Path) -> Result<Vec<DiskStats>> {
    let path = proc_root.join("diskstats");
    Ok(parse_diskstats(&read(&path)?))
}

fn parse_diskstats(content: &str) -> Vec<DiskStats> {
    content
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 14 {
                return None;
            }
            let name = parts[2];
            if !is_block_device(name) {
                return None;
            }
            let n = |i: usize| parts[i].parse::<u64>().unwrap_or(0);
            let ms = |i: usize| n(i) as f64 / 1000.0;
            Some(DiskStats {
                device: name.to_string(),
                reads: n(3),
                read_bytes: n(5) * SECTOR_BYTES,
                read_time_seconds: ms(6),
                writes: n(7),
                written_bytes: n(9) * SECTOR_BYTES,
                write_time_seconds: ms(10),
                io_time_seconds: ms(12),
            })
        })
        .collect()
}

/// Whole devices only: partitions and pseudo devices are skipped.
fn is_block_device(name: &str) -> bool {
    if name.starts_with("loop") || name.starts_with("ram") || name.starts_with("zram") {
        return false;
    }

    // nvme0n1p1, mmcblk0p2
    if name.starts_with("nvme") || name.starts_with("mmcblk") {
        return match name.rsplit_once('p') {
            Some((head, tail)) => {
                !(head.ends_with(|c: char| c.is_ascii_digit())
                    && !tail.is_empty()
                    && tail.chars().all(|c| c.is_ascii_digit()))
            }
            None => true,
        };
    }

    // sda1, vdb2, xvda1, hdc3
    let legacy = ["sd", "vd", "hd", "xvd"];
    if legacy.iter().any(|p| name.starts_with(p)) {
        return !name.ends_with(|c: char| c.is_ascii_digit());
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    const DISKSTATS: &str = "   7       0 loop0 10 0 20 1 0 0 0 0 0 1 1 0 0 0 0
 259       0 nvme0n1 1000 5 200000 1500 2000 10 400000 2500 0 3000 4000 0 0 0 0
 259       1 nvme0n1p1 900 5 180000 1400 1900 10 390000 2400 0 2900 3800 0 0 0 0
   8       0 sda 10 0 8 20 30 0 16 40 0 50 60
   8       1 sda1 5 0 4 10 15 0 8 20 0 25 30
 253       0 dm-0 7 0 14 3 9 0 18 5 0 6 8
";

    #[test]
    fn test_parse_diskstats() {
        let disks = parse_diskstats(DISKSTATS);
        let names: Vec<&str> = disks.iter().map(|d| d.device.as_str()).collect();
        assert_eq!(names, vec!["nvme0n1", "sda", "dm-0"]);

        let nvme = &disks[0];
        assert_eq!(nvme.reads, 1000);
        assert_eq!(nvme.read_bytes, 200000 * 512);
        assert_eq!(nvme.read_time_seconds, 1.5);
        assert_eq!(nvme.writes, 2000);
        assert_eq!(nvme.written_bytes, 400000 * 512);
        assert_eq!(nvme.write_time_seconds, 2.5);
        assert_eq!(nvme.io_time_seconds, 3.0);
    }

    #[test]
    fn test_block_device_filter() {
        assert!(is_block_device("vda"));
        assert!(!is_block_device("vda1"));
        assert!(is_block_device("mmcblk0"));
        assert!(!is_block_device("mmcblk0p1"));
        assert!(is_block_device("md127"));
        assert!(!is_block_device("loop3"));
    }
}
