//! # virtmon Hypervisor
//!
//! Hypervisor access layer for the metrics collector.
//!
//! This crate provides a per-scrape connection session over different
//! backends:
//! - **Libvirt/QEMU** (feature `libvirt`) - the production backend
//! - **Mock** - canned in-memory data for tests and development mode
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │       Connector -> Session              │
//! │  (versions, bulk stats, storage pools)  │
//! └─────────────────────┬───────────────────┘
//!                       │
//!         ┌─────────────┴─────────────┐
//!         ▼                           ▼
//! ┌───────────────────┐     ┌───────────────────┐
//! │ LibvirtConnector  │     │   MockConnector   │
//! │   (via libvirt)   │     │    (in memory)    │
//! └───────────────────┘     └───────────────────┘
//! ```
//!
//! Every session and handle releases its hypervisor resource on drop.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use virtmon_hypervisor::{Connector, MockConnector};
//!
//! let connector = MockConnector::demo();
//! let session = connector.open("qemu:///system")?;
//! for record in session.all_domain_stats()? {
//!     println!("{} has {} disks", record.domain.name()?, record.stats.blocks.len());
//! }
//! ```

pub mod descriptor;
pub mod error;
pub mod libvirt;
pub mod mock;
mod params;
pub mod session;
pub mod types;

pub use descriptor::{DiskDescriptor, DomainDescriptor, InterfaceDescriptor, OwnerMetadata};
pub use error::HypervisorError;
pub use mock::{HandleCounters, MockConnector, MockDomain, MockPool};
pub use session::{Connector, DomainHandle, DomainStatsRecord, Session, StoragePoolHandle};
pub use types::*;

// Re-export libvirt backend when available
#[cfg(feature = "libvirt")]
pub use libvirt::LibvirtConnector;
