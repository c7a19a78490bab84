//! Shard max-size rewrite for the cluster config
//!
//! The playground reads its shard settings from a TOML file in the cluster
//! config directory. The rewrite goes through the TOML parser rather than
//! line patching, so every other key survives untouched.

use std::fs;
use std::path::Path;

use toml::{Table, Value};
use tracing::info;

use crate::{HarnessError, Result};

/// Set `max_size` in the cluster meta config to the given shard size.
///
/// The key is located wherever it already lives in the document (top level
/// or inside a table). A document without a `max_size` key is an error.
pub fn apply_shard_size(config_path: &Path, size: &str) -> Result<()> {
    let content = fs::read_to_string(config_path).map_err(|e| {
        HarnessError::ConfigError(format!(
            "Failed to read cluster config {}: {}",
            config_path.display(),
            e
        ))
    })?;

    let mut document: Table = content.parse().map_err(|e| {
        HarnessError::ConfigError(format!(
            "Failed to parse cluster config {}: {}",
            config_path.display(),
            e
        ))
    })?;

    if !set_max_size(&mut document, size) {
        return Err(HarnessError::ConfigError(format!(
            "No max_size key in cluster config {}",
            config_path.display()
        )));
    }

    let updated = toml::to_string_pretty(&document)?;
    fs::write(config_path, updated).map_err(|e| {
        HarnessError::ConfigError(format!(
            "Failed to write cluster config {}: {}",
            config_path.display(),
            e
        ))
    })?;

    info!(config = %config_path.display(), max_size = size, "cluster config updated");
    Ok(())
}

fn set_max_size(table: &mut Table, size: &str) -> bool {
    let mut changed = false;

    if let Some(value) = table.get_mut("max_size") {
        *value = Value::String(size.to_string());
        changed = true;
    }

    for (_, value) in table.iter_mut() {
        if let Value::Table(nested) = value {
            changed |= set_max_size(nested, size);
        }
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrites_nested_max_size_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test-meta.toml");
        std::fs::write(
            &path,
            "name = \"meta\"\n\n[shard]\nmax_size = \"16MB\"\nreplicas = 3\n",
        )
        .unwrap();

        apply_shard_size(&path, "64MB").unwrap();

        let document: Table = std::fs::read_to_string(&path).unwrap().parse().unwrap();
        assert_eq!(
            document["shard"]["max_size"],
            Value::String("64MB".to_string())
        );
        assert_eq!(document["shard"]["replicas"], Value::Integer(3));
        assert_eq!(document["name"], Value::String("meta".to_string()));
    }

    #[test]
    fn test_missing_key_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test-meta.toml");
        std::fs::write(&path, "[shard]\nreplicas = 3\n").unwrap();

        let err = apply_shard_size(&path, "64MB");
        assert!(matches!(err, Err(HarnessError::ConfigError(_))));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = apply_shard_size(Path::new("/nonexistent/meta.toml"), "16MB");
        assert!(matches!(err, Err(HarnessError::ConfigError(_))));
    }
}
