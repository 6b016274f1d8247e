//! Process-wide deduplication of repeated log messages.
//!
//! Some hypervisor capabilities are missing on a whole host, so the same
//! failure would otherwise be logged for every device of every domain on
//! every scrape. [`LogOnce`] remembers which fixed tags have been logged.
//! The set only grows; it starts empty when the process starts.

use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Tag for block I/O throttling not being implemented by the driver.
pub const BLKIOTUNE_UNSUPPORTED: &str = "blkiotune_unsupported";

static GLOBAL: Lazy<Arc<LogOnce>> = Lazy::new(|| Arc::new(LogOnce::new()));

/// Set of tags that have already been logged.
#[derive(Debug, Default)]
pub struct LogOnce {
    seen: Mutex<HashSet<&'static str>>,
    suppressed: AtomicU64,
}

impl LogOnce {
    pub fn new() -> Self {
        Self::default()
    }

    /// The instance shared by the whole process.
    pub fn global() -> Arc<LogOnce> {
        Arc::clone(&GLOBAL)
    }

    /// Returns true the first time `tag` is seen, false afterwards.
    pub fn first(&self, tag: &'static str) -> bool {
        // A poisoned set is still a valid set
        let mut seen = self.seen.lock().unwrap_or_else(|p| p.into_inner());
        if seen.insert(tag) {
            true
        } else {
            self.suppressed.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    pub fn contains(&self, tag: &str) -> bool {
        let seen = self.seen.lock().unwrap_or_else(|p| p.into_inner());
        seen.contains(tag)
    }

    /// How many repeats have been swallowed.
    pub fn suppressed(&self) -> u64 {
        self.suppressed.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_only_once() {
        let once = LogOnce::new();
        assert!(!once.contains(BLKIOTUNE_UNSUPPORTED));
        assert!(once.first(BLKIOTUNE_UNSUPPORTED));
        assert!(!once.first(BLKIOTUNE_UNSUPPORTED));
        assert!(!once.first(BLKIOTUNE_UNSUPPORTED));
        assert!(once.contains(BLKIOTUNE_UNSUPPORTED));
        assert_eq!(once.suppressed(), 2);

        assert!(once.first("other"));
    }

    #[test]
    fn test_global_is_shared() {
        let a = LogOnce::global();
        let b = LogOnce::global();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
