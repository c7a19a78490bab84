//! Benchmark orchestration tasks
//!
//! The four harness operations with their dependency chaining: setup,
//! install (depends on setup), and the two benchmark modes (depend on
//! install). Execution is fully sequential; each step blocks until its
//! predecessor completes and every failure aborts the remaining sequence.

use std::time::Instant;

use chrono::Utc;
use tracing::{info, warn};

use crate::cluster::Playground;
use crate::config::HarnessConfig;
use crate::dataset::{AcquireOutcome, DatasetStore};
use crate::driver::DriverInvocation;
use crate::mirror;
use crate::report::{BenchMode, RunHistory, RunRecord};
use crate::util::format_duration;
use crate::{HarnessError, Result};

/// The benchmark orchestrator
#[derive(Debug, Clone)]
pub struct Harness {
    config: HarnessConfig,
    store: DatasetStore,
    history: Option<RunHistory>,
}

impl Harness {
    /// Create an orchestrator from a validated configuration
    pub fn new(config: HarnessConfig) -> Result<Self> {
        config.validate()?;
        let store = DatasetStore::new(config.asset_dir.clone());
        Ok(Self {
            config,
            store,
            history: None,
        })
    }

    /// Record runs into an explicit history file instead of the default
    pub fn with_history(mut self, history: RunHistory) -> Self {
        self.history = Some(history);
        self
    }

    /// The configuration in effect
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Prepare the environment: create the asset directory and point the
    /// package manager at the configured mirror. Idempotent.
    pub async fn setup(&self) -> Result<()> {
        info!(asset_dir = %self.config.asset_dir.display(), "preparing environment");
        self.store.ensure_asset_dir()?;
        mirror::set_mirror(&self.config.tiup_bin, &self.config.mirror_url).await
    }

    /// Acquire the dataset, running setup first. Idempotent.
    pub async fn install(&self) -> Result<AcquireOutcome> {
        self.setup().await?;
        self.store.ensure_dataset(&self.config.dataset_url).await
    }

    /// Run the benchmark driver in default mode
    pub async fn test(&self) -> Result<()> {
        self.run_benchmark(BenchMode::Default).await
    }

    /// Run the benchmark driver against multiple TiFlash replicas
    pub async fn test_multi_tiflash(&self) -> Result<()> {
        self.run_benchmark(BenchMode::MultiTiflash).await
    }

    async fn run_benchmark(&self, mode: BenchMode) -> Result<()> {
        self.install().await?;

        let tiflash_count = match mode {
            BenchMode::Default => self.config.cluster.tiflash_count,
            BenchMode::MultiTiflash => self.config.multi_tiflash_count,
        };

        let mut invocation = DriverInvocation::new(&self.config.driver, &self.config.asset_dir);
        if mode == BenchMode::MultiTiflash {
            invocation = invocation.with_tiflash_count(tiflash_count);
        }

        let timestamp = Utc::now();
        let started = Instant::now();

        let result = if self.config.cluster.manage {
            self.run_with_cluster(&invocation, tiflash_count).await
        } else {
            invocation.run().await
        };

        let elapsed = started.elapsed();
        self.record_run(RunRecord {
            timestamp,
            mode,
            tiflash_count,
            shard_size: if self.config.cluster.manage {
                self.config.cluster.shard_size.clone()
            } else {
                None
            },
            elapsed_secs: elapsed.as_secs_f64(),
            success: result.is_ok(),
        });

        result?;
        println!(
            "Benchmark ({}) completed in {}",
            mode,
            format_duration(elapsed)
        );
        Ok(())
    }

    /// Bracket the driver run with a managed playground cluster. The
    /// cluster is stopped whether the driver succeeds, fails, or the user
    /// interrupts.
    async fn run_with_cluster(
        &self,
        invocation: &DriverInvocation,
        tiflash_count: u32,
    ) -> Result<()> {
        let playground = Playground::new(self.config.tiup_bin.as_str(), self.config.cluster.clone())
            .with_tiflash_count(tiflash_count);
        let cluster = playground.start().await?;

        let driver_result = tokio::select! {
            result = invocation.run() => result,
            _ = tokio::signal::ctrl_c() => {
                warn!("interrupted, shutting down");
                Err(HarnessError::DriverError("Interrupted by user".to_string()))
            }
        };

        if let Err(e) = cluster.stop().await {
            warn!(error = %e, "failed to stop playground cluster");
        }

        driver_result
    }

    fn record_run(&self, run: RunRecord) {
        let history = match &self.history {
            Some(history) => history.clone(),
            None => match RunHistory::new() {
                Ok(history) => history,
                Err(e) => {
                    warn!(error = %e, "run history unavailable");
                    return;
                }
            },
        };

        if let Err(e) = history.append_run(run) {
            warn!(error = %e, "failed to record run history");
        }
    }
}
