//! # virtmon Collector
//!
//! Per-scrape reconciliation of libvirt statistics into typed, labelled
//! measurements.
//!
//! One cycle opens a session, reads versions and bulk statistics for every
//! domain, joins each domain against its descriptor and per-device
//! throttle parameters, reads storage pool capacity, and releases every
//! handle it acquired. Fields the hypervisor does not report are never
//! emitted.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use virtmon_collector::{LibvirtCollector, ScrapeContext};
//! use virtmon_hypervisor::MockConnector;
//!
//! let collector = LibvirtCollector::new(Arc::new(MockConnector::demo()), "mock:///");
//! let mut measurements = Vec::new();
//! collector.collect(&ScrapeContext::new(), &mut measurements)?;
//! ```

pub mod catalog;
pub mod collector;
pub mod context;
mod domain;
pub mod error;
pub mod fields;
pub mod host;
pub mod measurement;
pub mod memory;
pub mod once;
mod pool;

pub use collector::{up, CollectSummary, LibvirtCollector};
pub use context::ScrapeContext;
pub use error::{CollectError, DomainError};
pub use host::collect_host;
pub use measurement::{Measurement, Metric, MetricKind, Sink};
pub use once::LogOnce;
