//! Package-mirror configuration
//!
//! A single declarative call: `tiup mirror set <url>`. Repeating it is
//! harmless, and no output from tiup is consumed by later steps.

use tokio::process::Command;
use tracing::info;

use crate::{HarnessError, Result};

/// Point the package manager at the configured mirror endpoint.
///
/// A non-zero exit from tiup is fatal.
pub async fn set_mirror(tiup_bin: &str, mirror_url: &str) -> Result<()> {
    info!(url = mirror_url, "configuring package mirror");

    let status = Command::new(tiup_bin)
        .arg("mirror")
        .arg("set")
        .arg(mirror_url)
        .status()
        .await
        .map_err(|e| {
            HarnessError::MirrorError(format!("Failed to run {} mirror set: {}", tiup_bin, e))
        })?;

    if !status.success() {
        return Err(HarnessError::MirrorError(format!(
            "`{} mirror set {}` exited with {}",
            tiup_bin, mirror_url, status
        )));
    }

    Ok(())
}
