//! Config file discovery and loading.

use crate::schema::RegionHopConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Default config file name within the config directory.
const CONFIG_FILE_NAME: &str = "regionhop.yaml";

/// Resolve the regionhop config directory.
/// Priority: `REGIONHOP_CONFIG_DIR` env > `~/.regionhop/` > `./.regionhop`
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("REGIONHOP_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    match dirs::home_dir() {
        Some(home) => home.join(".regionhop"),
        None => PathBuf::from(".regionhop"),
    }
}

/// Resolve the full path to the main config file.
pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Read the raw YAML of a config file as a JSON value tree.
///
/// Returns `Ok(None)` if the file doesn't exist (first run).
pub async fn load_raw(path: &Path) -> Result<Option<serde_json::Value>> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(None);
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let value: serde_json::Value = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;

    info!(path = %path.display(), "Loaded config");
    Ok(Some(value))
}

/// Load and parse the config from disk without env substitution.
pub async fn load_config(path: &Path) -> Result<RegionHopConfig> {
    match load_raw(path).await? {
        Some(value) => serde_json::from_value(value)
            .with_context(|| format!("Invalid config at: {}", path.display())),
        None => Ok(RegionHopConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let path = std::env::temp_dir().join(format!("regionhop-missing-{}.yaml", uuid::Uuid::new_v4()));
        let cfg = load_config(&path).await.unwrap();
        assert!(cfg.handoff.is_none());
        assert!(cfg.grid.is_none());
    }

    #[tokio::test]
    async fn reads_yaml_file() {
        let path = std::env::temp_dir().join(format!("regionhop-{}.yaml", uuid::Uuid::new_v4()));
        fs::write(&path, "handoff:\n  callbackTimeoutMs: 1234\n").await.unwrap();
        let cfg = load_config(&path).await.unwrap();
        let _ = fs::remove_file(&path).await;
        assert_eq!(cfg.handoff.unwrap().callback_timeout_ms, Some(1234));
    }

    #[test]
    fn config_file_lives_in_dir() {
        let p = config_file_path(Path::new("/etc/regionhop"));
        assert_eq!(p, PathBuf::from("/etc/regionhop/regionhop.yaml"));
    }
}
