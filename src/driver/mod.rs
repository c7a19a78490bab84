//! Benchmark driver invocation
//!
//! The driver is an external process reached through one contract: the
//! asset directory in the `ASSET_DIR` environment variable, plus an
//! optional `--tiflash <n>` flag selecting the multi-replica
//! columnar-engine configuration. Its stdio is inherited so query output
//! and timings land on the user's terminal.

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::info;

use crate::config::DriverConfig;
use crate::{HarnessError, Result, ASSET_DIR_ENV};

/// A fully specified driver invocation
#[derive(Debug, Clone)]
pub struct DriverInvocation {
    program: String,
    args: Vec<String>,
    asset_dir: PathBuf,
    tiflash_count: Option<u32>,
}

impl DriverInvocation {
    /// Build a default-mode invocation from the driver config
    pub fn new(config: &DriverConfig, asset_dir: &Path) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            asset_dir: asset_dir.to_owned(),
            tiflash_count: None,
        }
    }

    /// Select the multi-replica mode with the given TiFlash count
    pub fn with_tiflash_count(mut self, count: u32) -> Self {
        self.tiflash_count = Some(count);
        self
    }

    /// The full command line, for logging and assertions
    pub fn command_line(&self) -> Vec<String> {
        let mut line = vec![self.program.clone()];
        line.extend(self.args.iter().cloned());
        if let Some(count) = self.tiflash_count {
            line.push("--tiflash".to_string());
            line.push(count.to_string());
        }
        line
    }

    /// Run the driver to completion.
    ///
    /// A non-zero driver exit propagates as the harness's own failure.
    pub async fn run(&self) -> Result<()> {
        info!(
            command = self.command_line().join(" "),
            asset_dir = %self.asset_dir.display(),
            "invoking benchmark driver"
        );

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .env(ASSET_DIR_ENV, &self.asset_dir);
        if let Some(count) = self.tiflash_count {
            command.arg("--tiflash").arg(count.to_string());
        }

        let status = command.status().await.map_err(|e| {
            HarnessError::DriverError(format!("Failed to spawn driver {}: {}", self.program, e))
        })?;

        if !status.success() {
            return Err(HarnessError::DriverError(format!(
                "Driver exited with {}",
                status
            )));
        }

        Ok(())
    }
}
