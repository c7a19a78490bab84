//! Run history persistence
//!
//! Appends a record per driver invocation to a JSON file under the user
//! data dir, rotated to a bounded history length.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{HarnessError, Result, APP_NAME, HISTORY_FILE, MAX_RUN_HISTORY};

/// Which invocation mode produced a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BenchMode {
    /// Default driver invocation, no extra flags
    Default,
    /// Multi-replica columnar-engine configuration
    MultiTiflash,
}

impl fmt::Display for BenchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BenchMode::Default => write!(f, "default"),
            BenchMode::MultiTiflash => write!(f, "multi-tiflash"),
        }
    }
}

/// One benchmark driver invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// When the run started
    pub timestamp: DateTime<Utc>,
    /// Invocation mode
    pub mode: BenchMode,
    /// TiFlash instance count in effect
    pub tiflash_count: u32,
    /// Shard max-size in effect, when the cluster was managed
    pub shard_size: Option<String>,
    /// Wall-clock duration of the driver run in seconds
    pub elapsed_secs: f64,
    /// Whether the driver exited successfully
    pub success: bool,
}

/// History file structure for JSON persistence
#[derive(Debug, Serialize, Deserialize)]
struct HistoryFile {
    version: u32,
    runs: Vec<RunRecord>,
}

impl Default for HistoryFile {
    fn default() -> Self {
        Self {
            version: 1,
            runs: Vec::new(),
        }
    }
}

/// Run history storage manager
#[derive(Debug, Clone)]
pub struct RunHistory {
    history_path: PathBuf,
}

impl RunHistory {
    /// Create a history manager at the standard location
    pub fn new() -> Result<Self> {
        let history_path = Self::history_file_path()?;
        Ok(Self { history_path })
    }

    /// Create a history manager at an explicit path
    pub fn with_path(history_path: PathBuf) -> Self {
        Self { history_path }
    }

    /// Get the standard history file path
    /// Uses $DATA_HOME/tici-bench/runs.json
    pub fn history_file_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir().ok_or_else(|| {
            HarnessError::PersistenceError("Unable to determine data directory".to_string())
        })?;

        Ok(data_dir.join(APP_NAME).join(HISTORY_FILE))
    }

    /// Load all recorded runs
    pub fn load_runs(&self) -> Result<Vec<RunRecord>> {
        if !self.history_path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.history_path).map_err(|e| {
            HarnessError::PersistenceError(format!(
                "Failed to read history file {}: {}",
                self.history_path.display(),
                e
            ))
        })?;

        let history: HistoryFile = serde_json::from_str(&content).map_err(|e| {
            HarnessError::PersistenceError(format!(
                "Failed to parse history file {}: {}",
                self.history_path.display(),
                e
            ))
        })?;

        Ok(history.runs)
    }

    /// Append a run record, rotating out the oldest entries past the limit
    pub fn append_run(&self, run: RunRecord) -> Result<()> {
        let mut runs = self.load_runs()?;
        runs.push(run);

        if runs.len() > MAX_RUN_HISTORY {
            let skip_count = runs.len() - MAX_RUN_HISTORY;
            runs = runs.into_iter().skip(skip_count).collect();
        }

        self.save_runs(runs)
    }

    /// Get the most recent runs, newest first
    pub fn recent_runs(&self, limit: usize) -> Result<Vec<RunRecord>> {
        let mut runs = self.load_runs()?;
        runs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        runs.truncate(limit);
        Ok(runs)
    }

    fn save_runs(&self, runs: Vec<RunRecord>) -> Result<()> {
        if let Some(parent) = self.history_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                HarnessError::PersistenceError(format!(
                    "Failed to create history directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let history = HistoryFile { version: 1, runs };
        let content = serde_json::to_string_pretty(&history)?;

        fs::write(&self.history_path, content).map_err(|e| {
            HarnessError::PersistenceError(format!(
                "Failed to write history file {}: {}",
                self.history_path.display(),
                e
            ))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(success: bool) -> RunRecord {
        RunRecord {
            timestamp: Utc::now(),
            mode: BenchMode::Default,
            tiflash_count: 1,
            shard_size: Some("16MB".to_string()),
            elapsed_secs: 1.5,
            success,
        }
    }

    #[test]
    fn test_append_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let history = RunHistory::with_path(dir.path().join("runs.json"));

        assert!(history.load_runs().unwrap().is_empty());

        history.append_run(record(true)).unwrap();
        history.append_run(record(false)).unwrap();

        let runs = history.load_runs().unwrap();
        assert_eq!(runs.len(), 2);
        assert!(runs[0].success);
        assert!(!runs[1].success);
    }

    #[test]
    fn test_rotation_keeps_bounded_history() {
        let dir = tempfile::tempdir().unwrap();
        let history = RunHistory::with_path(dir.path().join("runs.json"));

        for _ in 0..(MAX_RUN_HISTORY + 5) {
            history.append_run(record(true)).unwrap();
        }

        assert_eq!(history.load_runs().unwrap().len(), MAX_RUN_HISTORY);
    }

    #[test]
    fn test_recent_runs_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let history = RunHistory::with_path(dir.path().join("runs.json"));

        let mut old = record(true);
        old.timestamp = Utc::now() - chrono::Duration::hours(1);
        old.mode = BenchMode::Default;
        history.append_run(old).unwrap();

        let mut new = record(true);
        new.mode = BenchMode::MultiTiflash;
        history.append_run(new).unwrap();

        let recent = history.recent_runs(1).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].mode, BenchMode::MultiTiflash);
    }
}
