//! CPU time accounting from `/proc/stat`.

use serde::Serialize;
use std::path::Path;

use crate::error::{read, Result, TelemetryError};

/// Kernel clock ticks per second used by `/proc/stat` (USER_HZ).
const USER_HZ: f64 = 100.0;

/// Cumulative CPU time per mode across all CPUs, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CpuTimes {
    pub user: f64,
    pub nice: f64,
    pub system: f64,
    pub idle: f64,
    pub iowait: f64,
    pub irq: f64,
    pub softirq: f64,
    pub steal: f64,
}

impl CpuTimes {
    /// `(mode, seconds)` pairs in a fixed order.
    pub fn modes(&self) -> [(&'static str, f64); 8] {
        [
            ("user", self.user),
            ("nice", self.nice),
            ("system", self.system),
            ("idle", self.idle),
            ("iowait", self.iowait),
            ("irq", self.irq),
            ("softirq", self.softirq),
            ("steal", self.steal),
        ]
    }
}

/// CPU statistics of the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CpuStat {
    pub total: CpuTimes,
    /// Number of `cpuN` lines, i.e. logical cores online
    pub logical_cores: usize,
}

/// Parse `<proc_root>/stat`.
pub fn read_cpu_stat(proc_root: &Path) -> Result<CpuStat> {
    let path = proc_root.join("stat");
    parse_cpu_stat(&read(&path)?, &path)
}

fn parse_cpu_stat(content: &str, path: &Path) -> Result<CpuStat> {
    let mut total = None;
    let mut logical_cores = 0;

    for line in content.lines() {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("cpu") => {
                let ticks: Vec<u64> = parts.map(|p| p.parse().unwrap_or(0)).collect();
                if ticks.len() < 8 {
                    return Err(TelemetryError::parse(path, "cpu line has fewer than 8 fields"));
                }
                let secs = |i: usize| ticks[i] as f64 / USER_HZ;
                total = Some(CpuTimes {
                    user: secs(0),
                    nice: secs(1),
                    system: secs(2),
                    idle: secs(3),
                    iowait: secs(4),
                    irq: secs(5),
                    softirq: secs(6),
                    steal: secs(7),
                });
            }
            Some(name) if name.starts_with("cpu") && name[3..].parse::<u32>().is_ok() => {
                logical_cores += 1;
            }
            _ => {}
        }
    }

    let total = total.ok_or_else(|| TelemetryError::parse(path, "no aggregate cpu line"))?;
    Ok(CpuStat {
        total,
        logical_cores,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAT: &str = "cpu  1000 20 300 40000 50 6 7 8 0 0
cpu0 500 10 150 20000 25 3 3 4 0 0
cpu1 500 10 150 20000 25 3 4 4 0 0
intr 12345 0 0
ctxt 999
btime 1700000000
";

    #[test]
    fn test_parse_cpu_stat() {
        let stat = parse_cpu_stat(STAT, Path::new("/proc/stat")).unwrap();
        assert_eq!(stat.logical_cores, 2);
        assert_eq!(stat.total.user, 10.0);
        assert_eq!(stat.total.nice, 0.2);
        assert_eq!(stat.total.idle, 400.0);
        assert_eq!(stat.total.steal, 0.08);
        assert_eq!(stat.total.modes()[2], ("system", 3.0));
    }

    #[test]
    fn test_parse_cpu_stat_missing_aggregate() {
        let err = parse_cpu_stat("cpu0 1 2 3 4 5 6 7 8\n", Path::new("stat")).unwrap_err();
        assert!(matches!(err, TelemetryError::Parse { .. }));
    }
}
