//! Error types for the collector.

use thiserror::Error;
use virtmon_hypervisor::HypervisorError;

/// Failures that abort the whole collection cycle.
#[derive(Error, Debug)]
pub enum CollectError {
    /// The management connection could not be opened.
    #[error("Hypervisor connection failed: {0}")]
    Connection(#[source] HypervisorError),

    /// A connection-wide query failed.
    #[error("Failed to fetch {what}: {source}")]
    Fetch {
        what: &'static str,
        #[source]
        source: HypervisorError,
    },

    #[error("Collection cancelled")]
    Cancelled,

    #[error("Collection deadline exceeded")]
    DeadlineExceeded,
}

/// Failures that abort processing of a single domain.
#[derive(Error, Debug)]
pub enum DomainError {
    /// Name or UUID could not be read.
    #[error("Failed to identify domain: {0}")]
    Identity(#[source] HypervisorError),

    #[error("Domain {domain}: descriptor unavailable: {source}")]
    Descriptor {
        domain: String,
        #[source]
        source: HypervisorError,
    },

    #[error("Domain {domain}: info unavailable: {source}")]
    Info {
        domain: String,
        #[source]
        source: HypervisorError,
    },

    #[error("Domain {domain}: vcpu info unavailable: {source}")]
    Vcpus {
        domain: String,
        #[source]
        source: HypervisorError,
    },

    #[error("Domain {domain}: block I/O tune of {device} unavailable: {source}")]
    Throttle {
        domain: String,
        device: String,
        #[source]
        source: HypervisorError,
    },
}
