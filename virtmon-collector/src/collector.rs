//! The collection cycle.

use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use virtmon_hypervisor::Connector;

use crate::catalog::{UP, VERSIONS_INFO};
use crate::context::ScrapeContext;
use crate::domain::collect_domain;
use crate::error::CollectError;
use crate::measurement::{Measurement, Sink};
use crate::once::LogOnce;
use crate::pool::collect_pool;

/// Outcome counts of one successful cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectSummary {
    pub domains: usize,
    pub failed_domains: usize,
    pub pools: usize,
    pub failed_pools: usize,
    pub measurements: usize,
}

/// Reconciles hypervisor statistics into measurements, one session per
/// cycle.
pub struct LibvirtCollector {
    connector: Arc<dyn Connector>,
    uri: String,
    log_once: Arc<LogOnce>,
}

impl LibvirtCollector {
    /// Create a collector sharing the process-wide log deduplication set.
    pub fn new(connector: Arc<dyn Connector>, uri: impl Into<String>) -> Self {
        Self::with_log_once(connector, uri, LogOnce::global())
    }

    pub fn with_log_once(
        connector: Arc<dyn Connector>,
        uri: impl Into<String>,
        log_once: Arc<LogOnce>,
    ) -> Self {
        let uri = uri.into();
        info!(backend = connector.name(), uri = %uri, "Libvirt collector created");
        Self {
            connector,
            uri,
            log_once,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn backend(&self) -> &'static str {
        self.connector.name()
    }

    /// Run one collection cycle.
    ///
    /// Measurements reach `sink` only if the cycle completes. A failing
    /// domain or pool is logged and leaves no trace in the output; a
    /// connection-level failure, an expired deadline or a cancellation
    /// aborts the cycle and emits nothing.
    #[instrument(skip_all, fields(uri = %self.uri))]
    pub fn collect(
        &self,
        ctx: &ScrapeContext,
        sink: &mut dyn Sink,
    ) -> Result<CollectSummary, CollectError> {
        ctx.check()?;
        let session = self.connector.open(&self.uri).map_err(CollectError::Connection)?;

        let mut out: Vec<Measurement> = Vec::new();
        let mut summary = CollectSummary::default();

        let versions = session.versions().map_err(|source| CollectError::Fetch {
            what: "versions",
            source,
        })?;
        out.push(VERSIONS_INFO.measure(
            [
                &versions.hypervisor.to_string(),
                &versions.daemon.to_string(),
                &versions.library.to_string(),
            ],
            1.0,
        ));

        let records = session.all_domain_stats().map_err(|source| CollectError::Fetch {
            what: "domain statistics",
            source,
        })?;

        // Each record (and its domain handle) is dropped right after use
        for record in records {
            ctx.check()?;
            let mut buffer = Vec::new();
            match collect_domain(&record, &self.log_once, &mut buffer) {
                Ok(()) => {
                    summary.domains += 1;
                    out.append(&mut buffer);
                }
                Err(e) => {
                    summary.failed_domains += 1;
                    warn!(error = %e, "Failed to collect domain, skipping");
                }
            }
        }

        let pools = session.active_storage_pools().map_err(|source| CollectError::Fetch {
            what: "storage pools",
            source,
        })?;
        for pool in pools {
            ctx.check()?;
            let mut buffer = Vec::new();
            match collect_pool(pool.as_ref(), &mut buffer) {
                Ok(name) => {
                    summary.pools += 1;
                    debug!(pool = %name, "Pool collected");
                    out.append(&mut buffer);
                }
                Err(e) => {
                    summary.failed_pools += 1;
                    warn!(error = %e, "Failed to collect storage pool, skipping");
                }
            }
        }

        summary.measurements = out.len();
        for measurement in out {
            sink.emit(measurement);
        }

        debug!(
            domains = summary.domains,
            failed_domains = summary.failed_domains,
            pools = summary.pools,
            measurements = summary.measurements,
            "Collection cycle complete"
        );
        Ok(summary)
    }
}

/// The scrape health gauge.
pub fn up(ok: bool) -> Measurement {
    UP.measure([], if ok { 1.0 } else { 0.0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use virtmon_hypervisor::MockConnector;

    #[test]
    fn test_demo_cycle() {
        let collector = LibvirtCollector::with_log_once(
            Arc::new(MockConnector::demo()),
            "mock:///",
            Arc::new(LogOnce::new()),
        );
        let mut out: Vec<Measurement> = Vec::new();
        let summary = collector.collect(&ScrapeContext::new(), &mut out).unwrap();

        assert_eq!(summary.domains, 3);
        assert_eq!(summary.failed_domains, 0);
        assert_eq!(summary.pools, 2);
        assert_eq!(summary.measurements, out.len());

        let versions: Vec<_> = out.iter().filter(|m| m.name == "libvirt_versions_info").collect();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].label("hypervisor_running"), Some("8.2.0"));
        assert_eq!(versions[0].label("libvirtd_running"), Some("10.0.0"));
    }

    #[test]
    fn test_up_gauge() {
        assert_eq!(up(true).value, 1.0);
        assert_eq!(up(false).value, 0.0);
        assert_eq!(up(false).name, "libvirt_up");
        assert!(up(true).labels.is_empty());
    }
}
