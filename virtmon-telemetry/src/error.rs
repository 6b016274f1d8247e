//! Error types for host telemetry.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading host statistics.
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// A kernel statistics file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A kernel statistics file had an unexpected shape.
    #[error("Failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    /// A shared collector lock was poisoned by a panicking thread.
    #[error("Telemetry state lock poisoned")]
    Poisoned,
}

impl TelemetryError {
    pub(crate) fn parse(path: &std::path::Path, reason: impl Into<String>) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Whether the underlying file does not exist (e.g. non-Linux hosts).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Result type alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Read a whole file, attaching the path to any error.
pub(crate) fn read(path: &std::path::Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| TelemetryError::Io {
        path: path.to_path_buf(),
        source,
    })
}
