//! Balloon driver memory statistics.

use virtmon_hypervisor::MemoryStat;

use crate::catalog::*;
use crate::fields::Unit;
use crate::measurement::{Measurement, Metric};

const TAG_MAJOR_FAULT: u32 = 2;
const TAG_MINOR_FAULT: u32 = 3;
const TAG_UNUSED: u32 = 4;
const TAG_AVAILABLE: u32 = 5;
const TAG_ACTUAL_BALLOON: u32 = 6;
const TAG_RSS: u32 = 7;
const TAG_USABLE: u32 = 8;
const TAG_DISK_CACHES: u32 = 10;

/// Memory quantities decoded from `(tag, value)` pairs. Sizes are in KiB.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub major_fault: Option<u64>,
    pub minor_fault: Option<u64>,
    pub unused: Option<u64>,
    pub available: Option<u64>,
    pub actual_balloon: Option<u64>,
    pub rss: Option<u64>,
    pub usable: Option<u64>,
    pub disk_caches: Option<u64>,
}

impl MemoryStats {
    /// Decode by tag number. Unknown tags are ignored.
    pub fn from_stats(stats: &[MemoryStat]) -> Self {
        let mut m = Self::default();
        for stat in stats {
            let slot = match stat.tag {
                TAG_MAJOR_FAULT => &mut m.major_fault,
                TAG_MINOR_FAULT => &mut m.minor_fault,
                TAG_UNUSED => &mut m.unused,
                TAG_AVAILABLE => &mut m.available,
                TAG_ACTUAL_BALLOON => &mut m.actual_balloon,
                TAG_RSS => &mut m.rss,
                TAG_USABLE => &mut m.usable,
                TAG_DISK_CACHES => &mut m.disk_caches,
                _ => continue,
            };
            *slot = Some(stat.value);
        }
        m
    }

    /// Share of available memory the guest is using, or 0 when either
    /// input is missing or zero.
    pub fn used_percent(&self) -> f64 {
        match (self.available, self.usable) {
            (Some(available), Some(usable)) if available != 0 && usable != 0 => {
                (available as f64 - usable as f64) / (available as f64 / 100.0)
            }
            _ => 0.0,
        }
    }

    /// Emit every reported quantity plus the derived usage percentage.
    pub fn emit(&self, domain: &str, out: &mut Vec<Measurement>) {
        let fields: [(&'static Metric<1>, Option<u64>, Unit); 8] = [
            (&MEMORY_MAJOR_FAULT, self.major_fault, Unit::None),
            (&MEMORY_MINOR_FAULT, self.minor_fault, Unit::None),
            (&MEMORY_UNUSED, self.unused, Unit::KibToBytes),
            (&MEMORY_AVAILABLE, self.available, Unit::KibToBytes),
            (&MEMORY_ACTUAL_BALLOON, self.actual_balloon, Unit::KibToBytes),
            (&MEMORY_RSS, self.rss, Unit::KibToBytes),
            (&MEMORY_USABLE, self.usable, Unit::KibToBytes),
            (&MEMORY_DISK_CACHE, self.disk_caches, Unit::KibToBytes),
        ];
        for (metric, value, unit) in fields {
            if let Some(raw) = value {
                out.push(metric.measure([domain], unit.apply(raw)));
            }
        }
        out.push(MEMORY_USED_PERCENT.measure([domain], self.used_percent()));
    }
}
