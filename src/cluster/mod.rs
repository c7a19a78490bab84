//! Playground cluster lifecycle
//!
//! Starts a local `tiup playground` with the configured worker and TiFlash
//! counts, waits for the TiDB connect banner on its stdout, and kills the
//! process group when the run is over. The cluster is an external
//! collaborator; the harness only brackets the driver run with it.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tracing::{info, warn};

use crate::config::ClusterConfig;
use crate::{HarnessError, Result};

pub mod shard;

pub use shard::apply_shard_size;

/// Host/port pair parsed from the playground's connect banner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TidbEndpoint {
    pub host: String,
    pub port: u16,
}

/// A playground cluster definition, ready to be started
#[derive(Debug, Clone)]
pub struct Playground {
    tiup_bin: String,
    config: ClusterConfig,
    tiflash_count: u32,
}

impl Playground {
    /// Create a playground from the cluster configuration
    pub fn new(tiup_bin: impl Into<String>, config: ClusterConfig) -> Self {
        let tiflash_count = config.tiflash_count;
        Self {
            tiup_bin: tiup_bin.into(),
            config,
            tiflash_count,
        }
    }

    /// Override the TiFlash instance count (multi-replica benchmark mode)
    pub fn with_tiflash_count(mut self, count: u32) -> Self {
        self.tiflash_count = count;
        self
    }

    /// Arguments handed to tiup, without the binary itself
    pub fn playground_args(&self) -> Vec<String> {
        vec![
            format!("playground:{}", self.config.tiup_version),
            self.config.tidb_version.clone(),
            "--ticdc".to_string(),
            "1".to_string(),
            "--tici.meta".to_string(),
            "1".to_string(),
            "--tici.worker".to_string(),
            self.config.worker_count.to_string(),
            "--tiflash".to_string(),
            self.tiflash_count.to_string(),
            "--tici.config".to_string(),
            self.config.config_dir.display().to_string(),
        ]
    }

    /// Start the cluster and wait for it to report a TiDB endpoint.
    ///
    /// Rewrites the shard max-size in the cluster config first, when one is
    /// configured. Premature child exit and readiness-timeout expiry are
    /// both fatal.
    pub async fn start(&self) -> Result<RunningCluster> {
        if let Some(size) = &self.config.shard_size {
            let meta_path = self.config.config_dir.join("test-meta.toml");
            apply_shard_size(&meta_path, size)?;
        }

        info!(
            workers = self.config.worker_count,
            tiflash = self.tiflash_count,
            "starting playground cluster"
        );

        let mut child = Command::new(&self.tiup_bin)
            .args(self.playground_args())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                HarnessError::ClusterError(format!(
                    "Failed to spawn {} playground: {}",
                    self.tiup_bin, e
                ))
            })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            HarnessError::ClusterError("Playground stdout was not captured".to_string())
        })?;
        let mut lines = BufReader::new(stdout).lines();

        let endpoint =
            tokio::time::timeout(self.config.ready_timeout, scan_for_endpoint(&mut lines))
                .await
                .map_err(|_| {
                    HarnessError::ClusterError(format!(
                        "Cluster didn't start within {}s",
                        self.config.ready_timeout.as_secs()
                    ))
                })??;

        info!(host = %endpoint.host, port = endpoint.port, "playground cluster is ready");

        Ok(RunningCluster { child, endpoint })
    }
}

/// A started cluster and the endpoint it reported
#[derive(Debug)]
pub struct RunningCluster {
    child: Child,
    pub endpoint: TidbEndpoint,
}

impl RunningCluster {
    /// Kill the playground process and reap it
    pub async fn stop(mut self) -> Result<()> {
        info!("stopping playground cluster");
        if let Err(e) = self.child.start_kill() {
            warn!(error = %e, "playground already exited");
        }
        self.child.wait().await?;
        Ok(())
    }
}

async fn scan_for_endpoint(lines: &mut Lines<BufReader<ChildStdout>>) -> Result<TidbEndpoint> {
    while let Some(line) = lines.next_line().await? {
        if let Some(endpoint) = parse_connect_line(&line) {
            return Ok(endpoint);
        }
    }
    Err(HarnessError::ClusterError(
        "Playground exited before reporting a TiDB endpoint".to_string(),
    ))
}

/// Parse the TiDB endpoint from a playground output line like:
/// `Connect TiDB:    mysql --comments --host 127.0.0.1 --port 44415 -u root`
///
/// Malformed lines yield `None` and are skipped by the caller.
pub fn parse_connect_line(line: &str) -> Option<TidbEndpoint> {
    if !line.contains("Connect TiDB:") {
        return None;
    }

    let parts: Vec<&str> = line.split_whitespace().collect();
    let host_index = parts.iter().position(|p| *p == "--host")? + 1;
    let port_index = parts.iter().position(|p| *p == "--port")? + 1;

    let host = parts.get(host_index)?.to_string();
    let port = parts.get(port_index)?.parse().ok()?;

    Some(TidbEndpoint { host, port })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_connect_line() {
        let line = "Connect TiDB:    mysql --comments --host 127.0.0.1 --port 44415 -u root";
        let endpoint = parse_connect_line(line).unwrap();
        assert_eq!(endpoint.host, "127.0.0.1");
        assert_eq!(endpoint.port, 44415);
    }

    #[test]
    fn test_parse_connect_line_skips_noise() {
        assert!(parse_connect_line("Waiting for TiFlash to be ready...").is_none());
        assert!(parse_connect_line("Connect TiDB: mysql --host 127.0.0.1").is_none());
        assert!(parse_connect_line("Connect TiDB: mysql --host h --port notaport").is_none());
    }

    #[test]
    fn test_playground_args() {
        let config = ClusterConfig::default();
        let playground = Playground::new("tiup", config.clone()).with_tiflash_count(2);
        let args = playground.playground_args();

        assert_eq!(args[0], format!("playground:{}", config.tiup_version));
        assert_eq!(args[1], config.tidb_version);

        let tiflash_index = args.iter().position(|a| a == "--tiflash").unwrap();
        assert_eq!(args[tiflash_index + 1], "2");

        let worker_index = args.iter().position(|a| a == "--tici.worker").unwrap();
        assert_eq!(args[worker_index + 1], "1");
    }

    #[tokio::test]
    async fn test_start_fails_when_binary_missing() {
        let playground = Playground::new("/nonexistent/tiup", ClusterConfig::default());
        let err = playground.start().await;
        assert!(matches!(err, Err(HarnessError::ClusterError(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_start_parses_banner_from_stub() {
        use std::io::Write;

        // Stub playground: prints a banner then sleeps like a real cluster
        let dir = tempfile::tempdir().unwrap();
        let stub = dir.path().join("tiup-stub.sh");
        {
            let mut f = std::fs::File::create(&stub).unwrap();
            writeln!(f, "#!/bin/sh").unwrap();
            writeln!(f, "echo 'Starting components...'").unwrap();
            writeln!(
                f,
                "echo 'Connect TiDB:    mysql --comments --host 127.0.0.1 --port 4000 -u root'"
            )
            .unwrap();
            writeln!(f, "sleep 60").unwrap();
        }
        let mut perms = std::fs::metadata(&stub).unwrap().permissions();
        use std::os::unix::fs::PermissionsExt;
        perms.set_mode(0o755);
        std::fs::set_permissions(&stub, perms).unwrap();

        let playground = Playground::new(stub.display().to_string(), ClusterConfig::default());
        let cluster = playground.start().await.unwrap();
        assert_eq!(cluster.endpoint.port, 4000);
        cluster.stop().await.unwrap();
    }
}
