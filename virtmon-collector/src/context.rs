//! Scrape deadline and cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::CollectError;

/// Bounds one collection cycle.
///
/// The collector checks the context between domains and between storage
/// pools. A caller that gives up waiting (e.g. an HTTP handler whose own
/// timeout fired) flips the shared cancel flag so the blocking cycle stops
/// at the next check instead of running to completion.
#[derive(Debug, Clone, Default)]
pub struct ScrapeContext {
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl ScrapeContext {
    /// A context with no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Flag shared with every clone of this context.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Fails once the context is cancelled or past its deadline.
    pub fn check(&self) -> Result<(), CollectError> {
        if self.cancelled.load(Ordering::SeqCst) {
            return Err(CollectError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(CollectError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}
