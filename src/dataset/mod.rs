//! Dataset acquisition module
//!
//! Fetch-if-absent handling of the benchmark input dataset: an explicit
//! non-empty check on the decompressed file decides whether any network
//! work happens at all. Downloads stream into a `.part` file that is
//! renamed only on completion, so a failed run never leaves an artifact
//! that would confuse the next idempotence check.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::info;

use crate::{HarnessError, Result, DATASET_ARCHIVE, DATASET_FILE};

pub mod decompress;
pub mod download;

pub use decompress::decompress_gz;
pub use download::download_to;

/// Outcome of an acquisition attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// Dataset was already present and non-empty; nothing was fetched
    AlreadyPresent,
    /// Dataset was downloaded and decompressed
    Downloaded {
        /// Compressed bytes fetched over the network
        archive_bytes: u64,
        /// Decompressed dataset size
        dataset_bytes: u64,
    },
}

/// Filesystem view of the asset directory holding the dataset
#[derive(Debug, Clone)]
pub struct DatasetStore {
    asset_dir: PathBuf,
}

impl DatasetStore {
    /// Create a store rooted at the given asset directory
    pub fn new(asset_dir: impl Into<PathBuf>) -> Self {
        Self {
            asset_dir: asset_dir.into(),
        }
    }

    /// The asset directory this store operates on
    pub fn asset_dir(&self) -> &Path {
        &self.asset_dir
    }

    /// Path of the decompressed dataset file
    pub fn dataset_path(&self) -> PathBuf {
        self.asset_dir.join(DATASET_FILE)
    }

    /// Path of the compressed archive (transient)
    pub fn archive_path(&self) -> PathBuf {
        self.asset_dir.join(DATASET_ARCHIVE)
    }

    /// Path the download streams into before the completing rename
    pub fn partial_path(&self) -> PathBuf {
        self.asset_dir.join(format!("{}.part", DATASET_ARCHIVE))
    }

    /// Create the asset directory and any missing ancestors
    pub fn ensure_asset_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.asset_dir).map_err(|e| {
            HarnessError::IoError(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create asset directory {}: {}",
                    self.asset_dir.display(),
                    e
                ),
            ))
        })
    }

    /// Explicit presence check: the decompressed dataset exists and has
    /// at least one byte of content
    pub fn dataset_ready(&self) -> bool {
        match std::fs::metadata(self.dataset_path()) {
            Ok(meta) => meta.is_file() && meta.len() > 0,
            Err(_) => false,
        }
    }

    /// Acquire the dataset if it is not already present.
    ///
    /// Performs zero network calls when the decompressed file is ready.
    /// Otherwise downloads the archive from `dataset_url`, decompresses it
    /// in place, and deletes the archive. Network and decompression
    /// failures are fatal and leave neither archive nor partial dataset
    /// behind.
    pub async fn ensure_dataset(&self, dataset_url: &str) -> Result<AcquireOutcome> {
        if self.dataset_ready() {
            info!(
                dataset = %self.dataset_path().display(),
                "dataset already present, skipping download"
            );
            return Ok(AcquireOutcome::AlreadyPresent);
        }

        self.ensure_asset_dir()?;
        self.remove_stale_artifacts()?;

        let archive = self.archive_path();
        let partial = self.partial_path();

        info!(url = dataset_url, "downloading dataset archive");
        let started = Instant::now();
        let archive_bytes = match download_to(dataset_url, &partial).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = std::fs::remove_file(&partial);
                return Err(e);
            }
        };
        std::fs::rename(&partial, &archive)?;
        log_download(archive_bytes, started.elapsed());

        info!(archive = %archive.display(), "decompressing dataset archive");
        let dataset = self.dataset_path();
        let dataset_bytes = match decompress_gz(&archive, &dataset).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = std::fs::remove_file(&dataset);
                let _ = std::fs::remove_file(&archive);
                return Err(e);
            }
        };

        std::fs::remove_file(&archive)?;
        info!(
            dataset = %dataset.display(),
            size = %crate::util::format_bytes(dataset_bytes),
            "dataset ready"
        );

        Ok(AcquireOutcome::Downloaded {
            archive_bytes,
            dataset_bytes,
        })
    }

    /// Remove leftovers of a failed prior run before downloading again
    fn remove_stale_artifacts(&self) -> Result<()> {
        for path in [self.archive_path(), self.partial_path()] {
            if path.exists() {
                info!(path = %path.display(), "removing stale artifact");
                std::fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}

fn log_download(bytes: u64, elapsed: Duration) {
    info!(
        size = %crate::util::format_bytes(bytes),
        elapsed = %crate::util::format_duration(elapsed),
        rate = %format!(
            "{:.1} MiB/s",
            crate::util::calculate_throughput_mbps(bytes, elapsed)
        ),
        "download complete"
    );
}
