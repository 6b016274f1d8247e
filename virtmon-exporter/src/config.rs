//! Configuration management for the exporter.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use virtmon_common::LogFormat;

use crate::cli::Args;

/// Location tried when no `--config` is given.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/virtmon/exporter.yaml";

/// Main configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP endpoint configuration
    pub server: ServerConfig,
    /// Hypervisor connection configuration
    pub libvirt: LibvirtConfig,
    /// Host metrics configuration
    pub host: HostConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            bail!("Config file not found: {}", path.display());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Resolve the configuration for this run.
    ///
    /// An explicit `--config` must load. The default location is optional:
    /// when it does not exist the built-in defaults apply. Returns the path
    /// that was loaded, if any.
    pub fn resolve(args: &Args) -> Result<(Self, Option<String>)> {
        let (config, source) = match &args.config {
            Some(path) => (Self::load(path)?, Some(path.clone())),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => (
                Self::load(DEFAULT_CONFIG_PATH)?,
                Some(DEFAULT_CONFIG_PATH.to_string()),
            ),
            None => (Self::default(), None),
        };
        let config = config.with_cli_overrides(args)?;
        config.validate()?;
        Ok((config, source))
    }

    /// Apply CLI argument overrides to the configuration.
    pub fn with_cli_overrides(mut self, args: &Args) -> Result<Self> {
        if let Some(ref listen) = args.listen {
            self.server.listen_address = listen.clone();
        }

        if let Some(ref uri) = args.libvirt_uri {
            self.libvirt.uri = uri.clone();
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }

        if let Some(ref format) = args.log_format {
            self.logging.format = format.parse()?;
        }

        if args.dev {
            self.libvirt.backend = HypervisorBackend::Mock;
        }

        if args.no_host_metrics {
            self.host.enabled = false;
        }

        Ok(self)
    }

    /// Reject values the exporter cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;

        if !self.server.metrics_path.starts_with('/') {
            bail!(
                "server.metrics_path must start with '/': {}",
                self.server.metrics_path
            );
        }

        if self.libvirt.scrape_timeout_secs == 0 {
            bail!("libvirt.scrape_timeout_secs must be greater than zero");
        }

        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.server
            .listen_address
            .parse()
            .with_context(|| format!("Invalid listen address: {}", self.server.listen_address))
    }
}

/// HTTP endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on
    pub listen_address: String,
    /// Path serving the exposition
    pub metrics_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:9177".to_string(),
            metrics_path: "/metrics".to_string(),
        }
    }
}

/// Hypervisor connection configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LibvirtConfig {
    /// Connection URI, opened once per scrape
    pub uri: String,
    /// Upper bound on one collection cycle
    pub scrape_timeout_secs: u64,
    pub backend: HypervisorBackend,
}

impl Default for LibvirtConfig {
    fn default() -> Self {
        Self {
            uri: "qemu:///system".to_string(),
            scrape_timeout_secs: 10,
            backend: HypervisorBackend::Libvirt,
        }
    }
}

impl LibvirtConfig {
    pub fn scrape_timeout(&self) -> Duration {
        Duration::from_secs(self.scrape_timeout_secs)
    }
}

/// Hypervisor backend type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HypervisorBackend {
    /// Libvirt/QEMU backend
    #[default]
    Libvirt,
    /// Canned data for development
    Mock,
}

/// Host metrics configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub enabled: bool,
    /// Mount point of the proc filesystem
    pub proc_root: String,
    /// Mount point of the sys filesystem
    pub sys_root: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            proc_root: virtmon_telemetry::DEFAULT_PROC_ROOT.to_string(),
            sys_root: virtmon_telemetry::DEFAULT_SYS_ROOT.to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.listen_address, "0.0.0.0:9177");
        assert_eq!(config.server.metrics_path, "/metrics");
        assert_eq!(config.libvirt.uri, "qemu:///system");
        assert_eq!(config.libvirt.scrape_timeout(), Duration::from_secs(10));
        assert_eq!(config.libvirt.backend, HypervisorBackend::Libvirt);
        assert!(config.host.enabled);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "libvirt:\n  uri: qemu+ssh://host/system\n  backend: mock\nlogging:\n  format: json\n"
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.libvirt.uri, "qemu+ssh://host/system");
        assert_eq!(config.libvirt.backend, HypervisorBackend::Mock);
        assert_eq!(config.libvirt.scrape_timeout_secs, 10);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.server.metrics_path, "/metrics");
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let args = Args {
            config: Some("/nonexistent/virtmon.yaml".to_string()),
            ..Default::default()
        };
        assert!(Config::resolve(&args).is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let args = Args {
            listen: Some("127.0.0.1:9999".to_string()),
            libvirt_uri: Some("test:///default".to_string()),
            log_format: Some("json".to_string()),
            dev: true,
            no_host_metrics: true,
            ..Default::default()
        };
        let config = Config::default().with_cli_overrides(&args).unwrap();
        assert_eq!(config.server.listen_address, "127.0.0.1:9999");
        assert_eq!(config.libvirt.uri, "test:///default");
        assert_eq!(config.libvirt.backend, HypervisorBackend::Mock);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(!config.host.enabled);

        let bad = Args {
            log_format: Some("xml".to_string()),
            ..Default::default()
        };
        assert!(Config::default().with_cli_overrides(&bad).is_err());
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        config.libvirt.scrape_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.server.metrics_path = "metrics".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.server.listen_address = "not-an-address".to_string();
        assert!(config.validate().is_err());
    }
}
