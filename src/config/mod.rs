//! Configuration management module
//!
//! Handles loading, saving, and validation of harness configuration.
//! The asset directory is an explicit configuration value threaded into
//! every step; the `ASSET_DIR` environment variable and CLI flags are
//! folded in once at startup rather than read ambiently by each step.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::util::units::parse_bytes;
use crate::{HarnessError, Result, APP_NAME, CONFIG_FILE};

/// Shard max-size values accepted by the cluster config rewrite.
pub const SHARD_SIZES: &[&str] = &["16MB", "32MB", "64MB", "128MB"];

/// Default dataset archive location (HTTPS object storage).
pub const DEFAULT_DATASET_URL: &str =
    "https://quickwit-datasets-public.s3.amazonaws.com/hdfs-logs-multitenants.json.gz";

/// Default package-mirror endpoint for cluster-component installation.
pub const DEFAULT_MIRROR_URL: &str = "http://tiup.pingcap.net:8988";

/// Top-level harness configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Local directory holding benchmark input data
    pub asset_dir: PathBuf,
    /// URL of the compressed dataset archive
    pub dataset_url: String,
    /// Package-mirror endpoint passed to `tiup mirror set`
    pub mirror_url: String,
    /// TiUP binary used for mirror configuration and the playground
    pub tiup_bin: String,
    /// TiFlash replica count used by the multi-replica benchmark mode
    pub multi_tiflash_count: u32,
    /// External benchmark driver process
    pub driver: DriverConfig,
    /// Optional managed playground cluster around the driver run
    pub cluster: ClusterConfig,
}

/// Benchmark driver process configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Program to execute
    pub program: String,
    /// Fixed arguments passed before any mode flags
    pub args: Vec<String>,
}

/// Playground cluster configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Whether the harness starts/stops the cluster around the driver run
    pub manage: bool,
    /// TiUP playground component version
    pub tiup_version: String,
    /// TiDB version handed to the playground
    pub tidb_version: String,
    /// Number of TICI worker nodes
    pub worker_count: u32,
    /// Number of TiFlash instances in default mode
    pub tiflash_count: u32,
    /// Directory holding the cluster component configs
    pub config_dir: PathBuf,
    /// Shard max-size written into the cluster config before startup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shard_size: Option<String>,
    /// How long to wait for the connect banner before giving up
    pub ready_timeout: Duration,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            asset_dir: PathBuf::from("assets"),
            dataset_url: DEFAULT_DATASET_URL.to_string(),
            mirror_url: DEFAULT_MIRROR_URL.to_string(),
            tiup_bin: "tiup".to_string(),
            multi_tiflash_count: 2,
            driver: DriverConfig::default(),
            cluster: ClusterConfig::default(),
        }
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            args: vec!["main.py".to_string()],
        }
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            manage: false,
            tiup_version: "v1.16.2-feature.fts".to_string(),
            tidb_version: "v9.0.0-feature.fts".to_string(),
            worker_count: 1,
            tiflash_count: 1,
            config_dir: PathBuf::from("config"),
            shard_size: None,
            ready_timeout: Duration::from_secs(180),
        }
    }
}

impl HarnessConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.asset_dir.as_os_str().is_empty() {
            return Err(HarnessError::ConfigError(
                "Asset directory must not be empty".to_string(),
            ));
        }

        if !self.dataset_url.starts_with("http://") && !self.dataset_url.starts_with("https://") {
            return Err(HarnessError::ConfigError(format!(
                "Dataset URL must be an HTTP(S) URL: {}",
                self.dataset_url
            )));
        }

        if !self.mirror_url.starts_with("http://") && !self.mirror_url.starts_with("https://") {
            return Err(HarnessError::ConfigError(format!(
                "Mirror URL must be an HTTP(S) URL: {}",
                self.mirror_url
            )));
        }

        if self.multi_tiflash_count == 0 {
            return Err(HarnessError::ConfigError(
                "Multi-replica TiFlash count must be greater than 0".to_string(),
            ));
        }

        if self.tiup_bin.is_empty() {
            return Err(HarnessError::ConfigError(
                "TiUP binary must not be empty".to_string(),
            ));
        }

        if self.driver.program.is_empty() {
            return Err(HarnessError::ConfigError(
                "Driver program must not be empty".to_string(),
            ));
        }

        if self.cluster.worker_count == 0 || self.cluster.tiflash_count == 0 {
            return Err(HarnessError::ConfigError(
                "Cluster worker and TiFlash counts must be greater than 0".to_string(),
            ));
        }

        if self.cluster.ready_timeout.is_zero() {
            return Err(HarnessError::ConfigError(
                "Cluster ready timeout must be greater than 0".to_string(),
            ));
        }

        if let Some(size) = &self.cluster.shard_size {
            // Must be a parseable size and one of the supported steps
            parse_bytes(size).map_err(HarnessError::ConfigError)?;
            if !SHARD_SIZES.contains(&size.as_str()) {
                return Err(HarnessError::ConfigError(format!(
                    "Shard size must be one of {}: got {}",
                    SHARD_SIZES.join(", "),
                    size
                )));
            }
        }

        Ok(())
    }

    /// Set the asset directory
    pub fn with_asset_dir(mut self, path: PathBuf) -> Self {
        self.asset_dir = path;
        self
    }

    /// Set the dataset archive URL
    pub fn with_dataset_url(mut self, url: impl Into<String>) -> Self {
        self.dataset_url = url.into();
        self
    }

    /// Set the package-mirror URL
    pub fn with_mirror_url(mut self, url: impl Into<String>) -> Self {
        self.mirror_url = url.into();
        self
    }

    /// Set the TiFlash replica count for multi-replica mode
    pub fn with_multi_tiflash_count(mut self, count: u32) -> Self {
        self.multi_tiflash_count = count;
        self
    }

    /// Set the driver program and fixed arguments
    pub fn with_driver(mut self, program: impl Into<String>, args: Vec<String>) -> Self {
        self.driver = DriverConfig {
            program: program.into(),
            args,
        };
        self
    }

    /// Load configuration from the standard config file location
    /// Returns default configuration if the file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_file_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, defaulting when absent
    pub fn load_from(config_path: &std::path::Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| {
            HarnessError::ConfigError(format!(
                "Failed to read config file {}: {}",
                config_path.display(),
                e
            ))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            HarnessError::ConfigError(format!(
                "Failed to parse config file {}: {}",
                config_path.display(),
                e
            ))
        })?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to the standard config file location
    pub fn save(&self) -> Result<()> {
        self.validate()?;

        let config_path = Self::config_file_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                HarnessError::ConfigError(format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| {
            HarnessError::ConfigError(format!("Failed to serialize configuration: {}", e))
        })?;

        fs::write(&config_path, content).map_err(|e| {
            HarnessError::ConfigError(format!(
                "Failed to write config file {}: {}",
                config_path.display(),
                e
            ))
        })?;

        Ok(())
    }

    /// Get the standard configuration file path
    /// Uses $CONFIG_HOME/tici-bench/tici-bench.toml
    pub fn config_file_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            HarnessError::ConfigError("Unable to determine config directory".to_string())
        })?;

        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = HarnessConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.asset_dir, PathBuf::from("assets"));
        assert_eq!(config.multi_tiflash_count, 2);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = HarnessConfig::default()
            .with_asset_dir(PathBuf::from("/tmp/x"))
            .with_multi_tiflash_count(3);
        let toml_str = toml::to_string(&config).expect("Failed to serialize to TOML");
        let deserialized: HarnessConfig =
            toml::from_str(&toml_str).expect("Failed to deserialize from TOML");

        assert_eq!(deserialized.asset_dir, PathBuf::from("/tmp/x"));
        assert_eq!(deserialized.multi_tiflash_count, 3);
        assert_eq!(deserialized.dataset_url, config.dataset_url);
        assert_eq!(deserialized.cluster.tiup_version, config.cluster.tiup_version);
    }

    #[test]
    fn test_invalid_urls_rejected() {
        let config = HarnessConfig::default().with_dataset_url("ftp://example.com/a.gz");
        assert!(config.validate().is_err());

        let config = HarnessConfig::default().with_mirror_url("not-a-url");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_shard_size_validation() {
        let mut config = HarnessConfig::default();
        config.cluster.shard_size = Some("32MB".to_string());
        assert!(config.validate().is_ok());

        config.cluster.shard_size = Some("48MB".to_string());
        assert!(config.validate().is_err());

        config.cluster.shard_size = Some("huge".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_replica_count_rejected() {
        let config = HarnessConfig::default().with_multi_tiflash_count(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_file_path() {
        let path = HarnessConfig::config_file_path();
        assert!(path.is_ok());
        let path = path.unwrap();
        assert!(path.to_string_lossy().contains("tici-bench"));
        assert!(path.to_string_lossy().contains("tici-bench.toml"));
    }

    #[test]
    fn test_load_from_missing_file_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = HarnessConfig::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.dataset_url, DEFAULT_DATASET_URL);
    }
}
