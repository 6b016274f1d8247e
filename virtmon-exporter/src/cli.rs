//! Command-line argument parsing.

use clap::Parser;

/// virtmon exporter - Prometheus metrics for libvirt hosts
#[derive(Parser, Debug, Default)]
#[command(name = "virtmon-exporter")]
#[command(about = "virtmon exporter - Prometheus metrics for libvirt hosts")]
#[command(version)]
pub struct Args {
    /// Path to configuration file (optional, defaults used if not found)
    #[arg(short, long, env = "VIRTMON_CONFIG")]
    pub config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Log format (pretty, json)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Listen address for the metrics endpoint
    #[arg(long)]
    pub listen: Option<String>,

    /// Libvirt connection URI (e.g., qemu:///system)
    #[arg(long, env = "LIBVIRT_DEFAULT_URI")]
    pub libvirt_uri: Option<String>,

    /// Enable development mode (mock hypervisor)
    #[arg(long)]
    pub dev: bool,

    /// Do not export host metrics
    #[arg(long)]
    pub no_host_metrics: bool,
}
