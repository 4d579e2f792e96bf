//! Exporter configuration
//!
//! Layered lowest to highest: built-in defaults, optional config file,
//! `KUBE_SUMMARY_EXPORTER_*` environment variables, command-line flags.

use anyhow::{Context, Result};
use clap::Parser;
use exporter_lib::selector::DEFAULT_MAX_CONCURRENT_FETCHES;
use serde::Deserialize;
use std::path::PathBuf;

const ENV_PREFIX: &str = "KUBE_SUMMARY_EXPORTER";

/// Command-line flags
#[derive(Debug, Parser)]
#[command(name = "kube-summary-exporter")]
#[command(version, about = "Prometheus exporter for kubelet /stats/summary filesystem metrics", long_about = None)]
pub struct Cli {
    /// Listen address, e.g. ":9779" or "127.0.0.1:9779"
    #[arg(long)]
    pub listen_address: Option<String>,

    /// Path of a kubeconfig file; if not provided the app will try
    /// $KUBECONFIG, $HOME/.kube/config or in cluster config
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Maximum number of node summaries fetched concurrently per scrape
    #[arg(long)]
    pub max_concurrent_fetches: Option<usize>,

    /// Optional configuration file (toml, yaml or json)
    #[arg(long, env = "KUBE_SUMMARY_EXPORTER_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Exporter configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExporterConfig {
    /// Address the HTTP server binds to
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Explicit kubeconfig path
    #[serde(default)]
    pub kubeconfig: Option<PathBuf>,

    /// Concurrency limit for summary fetches within one scrape
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
}

fn default_listen_address() -> String {
    ":9779".to_string()
}

fn default_max_concurrent_fetches() -> usize {
    DEFAULT_MAX_CONCURRENT_FETCHES
}

impl ExporterConfig {
    /// Load configuration from defaults, file, environment and flags
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = &cli.config {
            builder = builder.add_source(config::File::from(path.as_path()).required(true));
        }

        let config = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .set_override_option("listen_address", cli.listen_address.clone())?
            .set_override_option(
                "kubeconfig",
                cli.kubeconfig
                    .as_ref()
                    .map(|path| path.to_string_lossy().into_owned()),
            )?
            .set_override_option(
                "max_concurrent_fetches",
                cli.max_concurrent_fetches.map(|n| n as u64),
            )?
            .build()
            .context("Failed to load configuration")?;

        let mut loaded: ExporterConfig = config
            .try_deserialize()
            .context("Invalid configuration")?;
        loaded.max_concurrent_fetches = loaded.max_concurrent_fetches.max(1);
        Ok(loaded)
    }

    /// Socket address to bind; a bare `:port` listens on all interfaces
    pub fn bind_address(&self) -> String {
        if self.listen_address.starts_with(':') {
            format!("0.0.0.0{}", self.listen_address)
        } else {
            self.listen_address.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Mutex, MutexGuard};

    // Tests in this module read the process environment
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn env_lock() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[test]
    fn test_defaults() {
        let _guard = env_lock();
        let cli = Cli::parse_from(["kube-summary-exporter"]);
        let config = ExporterConfig::load(&cli).unwrap();

        assert_eq!(config.listen_address, ":9779");
        assert_eq!(config.bind_address(), "0.0.0.0:9779");
        assert!(config.kubeconfig.is_none());
        assert_eq!(config.max_concurrent_fetches, DEFAULT_MAX_CONCURRENT_FETCHES);
    }

    #[test]
    fn test_flags_override_defaults() {
        let _guard = env_lock();
        let cli = Cli::parse_from([
            "kube-summary-exporter",
            "--listen-address",
            "127.0.0.1:9100",
            "--kubeconfig",
            "/tmp/kubeconfig",
            "--max-concurrent-fetches",
            "0",
        ]);
        let config = ExporterConfig::load(&cli).unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:9100");
        assert_eq!(config.kubeconfig, Some(PathBuf::from("/tmp/kubeconfig")));
        assert_eq!(config.max_concurrent_fetches, 1);
    }

    #[test]
    fn test_config_file_is_overridden_by_flags() {
        let _guard = env_lock();
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "listen_address = \":9999\"").unwrap();
        writeln!(file, "max_concurrent_fetches = 3").unwrap();

        let path = file.path().to_string_lossy().into_owned();
        let cli = Cli::parse_from([
            "kube-summary-exporter",
            "--config",
            path.as_str(),
            "--listen-address",
            ":8000",
        ]);
        let config = ExporterConfig::load(&cli).unwrap();

        assert_eq!(config.listen_address, ":8000");
        assert_eq!(config.max_concurrent_fetches, 3);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let _guard = env_lock();
        let cli = Cli::parse_from([
            "kube-summary-exporter",
            "--config",
            "/nonexistent/kube-summary-exporter.toml",
        ]);
        assert!(ExporterConfig::load(&cli).is_err());
    }

    #[test]
    fn test_environment_sits_between_file_and_flags() {
        let _guard = env_lock();
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "max_concurrent_fetches = 3").unwrap();
        writeln!(file, "listen_address = \":9999\"").unwrap();
        let path = file.path().to_string_lossy().into_owned();

        std::env::set_var("KUBE_SUMMARY_EXPORTER_MAX_CONCURRENT_FETCHES", "5");
        std::env::set_var("KUBE_SUMMARY_EXPORTER_LISTEN_ADDRESS", ":7000");

        let from_env = ExporterConfig::load(&Cli::parse_from([
            "kube-summary-exporter",
            "--config",
            path.as_str(),
        ]));
        let from_flag = ExporterConfig::load(&Cli::parse_from([
            "kube-summary-exporter",
            "--config",
            path.as_str(),
            "--max-concurrent-fetches",
            "2",
        ]));

        std::env::remove_var("KUBE_SUMMARY_EXPORTER_MAX_CONCURRENT_FETCHES");
        std::env::remove_var("KUBE_SUMMARY_EXPORTER_LISTEN_ADDRESS");

        let from_env = from_env.unwrap();
        assert_eq!(from_env.max_concurrent_fetches, 5);
        assert_eq!(from_env.listen_address, ":7000");

        let from_flag = from_flag.unwrap();
        assert_eq!(from_flag.max_concurrent_fetches, 2);
        assert_eq!(from_flag.listen_address, ":7000");
    }
}
