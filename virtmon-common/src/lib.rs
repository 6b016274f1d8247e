//! # virtmon Common
//!
//! Shared utilities for the virtmon components.
//!
//! ## Logging
//!
//! ```rust,no_run
//! use virtmon_common::{init_logging, LogFormat};
//!
//! init_logging("info", LogFormat::Pretty).unwrap();
//! tracing::info!(uri = "qemu:///system", "Exporter starting");
//! ```

pub mod logging;

pub use logging::{init_logging, LogFormat};
