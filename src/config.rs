use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::record::DEFAULT_CAPACITY;

/// Recorder and view settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Agent name announced on the bus
    pub name: String,
    /// Bus address, transport default when None
    pub bus: Option<String>,
    /// Snapshots kept per message
    pub buffer_size: usize,
    pub refresh_interval_ms: u64,
    pub pinned_refresh_interval_ms: u64,
    pub pump_interval_ms: u64,
    /// Age after which a message is shown as extinct
    pub extinction_secs: f64,
    pub pin_across_senders: bool,
    /// Expand-all is only allowed below this many visible messages
    pub expand_threshold: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            name: "msgtab".to_string(),
            bus: None,
            buffer_size: DEFAULT_CAPACITY,
            refresh_interval_ms: 500,
            pinned_refresh_interval_ms: 200,
            pump_interval_ms: 10,
            extinction_secs: 5.0,
            pin_across_senders: true,
            expand_threshold: 5,
        }
    }
}

/// Loads and saves a `RecorderConfig` as JSON
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the default configuration if the file does not exist yet
    pub fn ensure_config_file(&self) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).context("Failed to create config directory")?;
            }
        }

        self.save(&RecorderConfig::default())
            .context("Failed to write default config")
    }

    pub fn load(&self) -> Result<RecorderConfig> {
        self.ensure_config_file()?;

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read config from {:?}", self.path))?;

        let config: RecorderConfig =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;

        Ok(config)
    }

    pub fn save(&self, config: &RecorderConfig) -> Result<()> {
        let json = serde_json::to_string_pretty(config).context("Failed to serialize config")?;

        // Write to temporary file first
        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, json).context("Failed to write temporary config file")?;

        fs::rename(&temp_path, &self.path).context("Failed to atomically update config file")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("nested").join("msgtab.json"));

        let config = store.load().unwrap();

        assert_eq!(config, RecorderConfig::default());
        assert!(store.path().exists());
    }

    #[test]
    fn test_partial_file_takes_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("msgtab.json");
        fs::write(&path, r#"{ "buffer_size": 1, "unknown_key": true }"#).unwrap();

        let config = ConfigStore::new(&path).load().unwrap();

        assert_eq!(config.buffer_size, 1);
        assert_eq!(config.refresh_interval_ms, 500);
        assert!(config.pin_across_senders);
    }

    #[test]
    fn test_save_roundtrip() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("msgtab.json"));
        let config = RecorderConfig {
            name: "ground-inspector".to_string(),
            bus: Some("127.255.255.255:2010".to_string()),
            ..RecorderConfig::default()
        };

        store.save(&config).unwrap();

        assert_eq!(store.load().unwrap(), config);
        assert!(!dir.path().join("msgtab.tmp").exists());
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("msgtab.json");
        fs::write(&path, "not json").unwrap();

        assert!(ConfigStore::new(&path).load().is_err());
    }
}
