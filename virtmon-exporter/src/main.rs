//! # virtmon Exporter
//!
//! Serves Prometheus metrics for a libvirt virtualization host. Every
//! scrape opens a fresh hypervisor session, reconciles bulk domain
//! statistics with domain descriptors and throttle parameters, adds
//! storage pool and host metrics, and renders the result.
//!
//! ## Usage
//! ```bash
//! virtmon-exporter --config /etc/virtmon/exporter.yaml
//! virtmon-exporter --dev --listen 127.0.0.1:9177
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

mod cli;
mod config;
mod render;
mod server;

use cli::Args;
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Logging settings may come from the file, so load it first
    let (config, source) = Config::resolve(&args)?;

    virtmon_common::init_logging(&config.logging.level, config.logging.format)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting virtmon exporter"
    );
    match &source {
        Some(path) => info!(config_path = %path, "Configuration loaded"),
        None => info!("No config file found, using CLI arguments and defaults"),
    }

    info!(
        listen = %config.server.listen_address,
        backend = ?config.libvirt.backend,
        uri = %config.libvirt.uri,
        host_metrics = config.host.enabled,
        "Exporter configured"
    );

    if let Err(e) = server::run(config).await {
        error!(error = %e, "Server failed");
        return Err(e);
    }

    Ok(())
}
