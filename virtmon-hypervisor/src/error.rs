//! Error types for the hypervisor access layer.

use thiserror::Error;

/// Errors that can occur while talking to the hypervisor.
///
/// The variants carry the classification the collector needs to decide
/// whether a failure is fatal for the cycle, for one domain, or recoverable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HypervisorError {
    /// Failed to open the management connection.
    #[error("Failed to connect to hypervisor: {0}")]
    ConnectionFailed(String),
    
    /// A query against the connection or one of its handles failed.
    #[error("Failed to query: {0}")]
    QueryFailed(String),
    
    /// The domain descriptor could not be decoded.
    #[error("Invalid domain descriptor: {0}")]
    Descriptor(String),
    
    /// Operation is not valid for the entity's current state
    /// (e.g. per-vCPU info of a shut-off domain).
    #[error("Operation invalid: {0}")]
    OperationInvalid(String),
    
    /// The driver does not implement the operation at all.
    #[error("Operation unsupported: {0}")]
    OperationUnsupported(String),
    
    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl HypervisorError {
    /// Whether the error means "not valid in the current state".
    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::OperationInvalid(_))
    }
    
    /// Whether the error means "the driver lacks this capability".
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::OperationUnsupported(_))
    }
}

/// Result type alias for hypervisor operations.
pub type Result<T> = std::result::Result<T, HypervisorError>;
