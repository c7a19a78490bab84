//! tici-bench - TiDB full-text-search benchmark harness
//!
//! Sequences environment preparation (asset directory, package mirror),
//! idempotent dataset acquisition, and benchmark-driver invocation against
//! a TiDB cluster, optionally with multiple TiFlash replicas.

use std::fmt;

// Public re-exports
pub mod cluster;
pub mod config;
pub mod dataset;
pub mod driver;
pub mod mirror;
pub mod report;
pub mod tasks;
pub mod util;

// Common error types
#[derive(Debug)]
pub enum HarnessError {
    /// I/O operation failed
    IoError(std::io::Error),
    /// Configuration validation or parsing error
    ConfigError(String),
    /// Dataset download error
    DownloadError(String),
    /// Archive decompression error
    DecompressError(String),
    /// Package-mirror configuration error
    MirrorError(String),
    /// Playground cluster lifecycle error
    ClusterError(String),
    /// Benchmark driver invocation error
    DriverError(String),
    /// Run-history persistence error
    PersistenceError(String),
}

impl fmt::Display for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HarnessError::IoError(err) => write!(f, "I/O error: {}", err),
            HarnessError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            HarnessError::DownloadError(msg) => write!(f, "Download error: {}", msg),
            HarnessError::DecompressError(msg) => write!(f, "Decompression error: {}", msg),
            HarnessError::MirrorError(msg) => write!(f, "Mirror error: {}", msg),
            HarnessError::ClusterError(msg) => write!(f, "Cluster error: {}", msg),
            HarnessError::DriverError(msg) => write!(f, "Driver error: {}", msg),
            HarnessError::PersistenceError(msg) => {
                write!(f, "Run-history persistence error: {}", msg)
            }
        }
    }
}

impl std::error::Error for HarnessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HarnessError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for HarnessError {
    fn from(err: std::io::Error) -> Self {
        HarnessError::IoError(err)
    }
}

impl From<reqwest::Error> for HarnessError {
    fn from(err: reqwest::Error) -> Self {
        HarnessError::DownloadError(err.to_string())
    }
}

impl From<serde_json::Error> for HarnessError {
    fn from(err: serde_json::Error) -> Self {
        HarnessError::PersistenceError(format!("JSON serialization error: {}", err))
    }
}

impl From<toml::de::Error> for HarnessError {
    fn from(err: toml::de::Error) -> Self {
        HarnessError::ConfigError(format!("TOML parsing error: {}", err))
    }
}

impl From<toml::ser::Error> for HarnessError {
    fn from(err: toml::ser::Error) -> Self {
        HarnessError::ConfigError(format!("TOML serialization error: {}", err))
    }
}

/// Result type alias for harness operations
pub type Result<T> = std::result::Result<T, HarnessError>;

// Common types and constants
pub const APP_NAME: &str = "tici-bench";
pub const CONFIG_FILE: &str = "tici-bench.toml";
pub const HISTORY_FILE: &str = "runs.json";
pub const MAX_RUN_HISTORY: usize = 100;

/// Environment variable naming the asset directory, honored by both the
/// acquisition step and the driver process.
pub const ASSET_DIR_ENV: &str = "ASSET_DIR";

/// Decompressed dataset file expected inside the asset directory.
pub const DATASET_FILE: &str = "hdfs-logs-multitenants.json";
/// Compressed archive name as served by the dataset bucket.
pub const DATASET_ARCHIVE: &str = "hdfs-logs-multitenants.json.gz";
