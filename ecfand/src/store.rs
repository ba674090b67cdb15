//! Write-through configuration store
//!
//! The store is the single owner of the persisted [`Config`]: every state
//! change routes through [`ConfigStore::update`], which mutates the
//! in-memory document and flushes the whole object to disk before
//! returning. Readers take cheap point-in-time snapshots and never block
//! behind a writer for longer than the clone.

use ecfan_core::{Config, EcfanError, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub(crate) struct ConfigStore {
    path: PathBuf,
    config: Mutex<Config>,
}

impl ConfigStore {
    /// Load the configuration from disk, materializing and persisting the
    /// documented defaults when the file does not exist yet. The defaults
    /// hit the disk before the server answers its first request.
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(
                "Config not found at {}. Creating with defaults.",
                path.display()
            );
            let config = Config::default();
            write_config(path, &config)
                .await
                .map_err(EcfanError::Config)?;

            return Ok(Self {
                path: path.to_path_buf(),
                config: Mutex::new(config),
            });
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|e| EcfanError::Config(format!("Failed to read config file: {}", e)))?;

        let config = Config::from_json(&content)
            .map_err(|e| EcfanError::Config(format!("Failed to parse config file: {}", e)))?;

        Ok(Self {
            path: path.to_path_buf(),
            config: Mutex::new(config),
        })
    }

    /// Point-in-time copy for readers.
    pub async fn snapshot(&self) -> Config {
        self.config.lock().await.clone()
    }

    /// Apply a mutation and flush the result to disk before returning.
    ///
    /// Updates are serialized against each other by the store's lock, so
    /// concurrent mutations cannot lose each other's writes. A failed disk
    /// write surfaces as [`EcfanError::Persist`]; the in-memory state keeps
    /// the mutation, because the hardware change it describes has already
    /// happened.
    pub async fn update<F>(&self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut Config),
    {
        let mut config = self.config.lock().await;
        mutate(&mut config);
        write_config(&self.path, &config)
            .await
            .map_err(EcfanError::Persist)
    }

    /// Location of the persisted file.
    #[allow(dead_code)]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Serialize and write the full config atomically (temp file, then rename).
async fn write_config(path: &Path, config: &Config) -> std::result::Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await.map_err(|e| {
                format!(
                    "Failed to create config directory '{}': {}",
                    parent.display(),
                    e
                )
            })?;
        }
    }

    let json = config
        .to_json()
        .map_err(|e| format!("Failed to serialize config: {}", e))?;

    let temp_path = path.with_extension("json.tmp");

    fs::write(&temp_path, &json)
        .await
        .map_err(|e| format!("Failed to write temp config file: {}", e))?;

    fs::rename(&temp_path, path)
        .await
        .map_err(|e| format!("Failed to rename temp config file: {}", e))?;

    debug!("Saved config to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecfan_core::{FanId, FanMode, PowerMode};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_creates_defaults_on_disk() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let store = ConfigStore::load(&config_path).await.unwrap();

        // The file exists with the documented defaults before anything
        // else gets to run
        assert!(config_path.exists());
        let on_disk = Config::from_json(&std::fs::read_to_string(&config_path).unwrap()).unwrap();
        assert_eq!(on_disk, Config::default());
        assert_eq!(store.snapshot().await, Config::default());
    }

    #[tokio::test]
    async fn test_update_persists_before_returning() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let store = ConfigStore::load(&config_path).await.unwrap();

        store
            .update(|config| {
                config.power_mode = PowerMode::Performance;
                config.fan2.mode = FanMode::Curve;
                config.fan2.level = 3;
            })
            .await
            .unwrap();

        let on_disk = Config::from_json(&std::fs::read_to_string(&config_path).unwrap()).unwrap();
        assert_eq!(on_disk.power_mode, PowerMode::Performance);
        assert_eq!(on_disk.fan2.mode, FanMode::Curve);
        assert_eq!(on_disk.fan2.level, 3);
    }

    #[tokio::test]
    async fn test_persistence_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        {
            let store = ConfigStore::load(&config_path).await.unwrap();
            store
                .update(|config| {
                    config.power_mode = PowerMode::Quiet;
                    for fan in FanId::all() {
                        let state = config.fan_mut(fan);
                        state.mode = FanMode::Curve;
                        state.level = fan.number();
                        state.rampup_curve = [10, 20, 30, 40, 50];
                    }
                })
                .await
                .unwrap();
        }

        // A fresh store sees exactly the state the first one wrote
        let reloaded = ConfigStore::load(&config_path).await.unwrap();
        let config = reloaded.snapshot().await;
        assert_eq!(config.power_mode, PowerMode::Quiet);
        for fan in FanId::all() {
            assert_eq!(config.fan(fan).level, fan.number());
            assert_eq!(config.fan(fan).rampup_curve, [10, 20, 30, 40, 50]);
        }
    }

    #[tokio::test]
    async fn test_concurrent_updates_do_not_lose_writes() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        let store = std::sync::Arc::new(ConfigStore::load(&config_path).await.unwrap());

        let a = store.clone();
        let b = store.clone();
        let t1 = tokio::spawn(async move { a.update(|c| c.fan1.level = 5).await });
        let t2 = tokio::spawn(async move { b.update(|c| c.fan3.level = 2).await });
        t1.await.unwrap().unwrap();
        t2.await.unwrap().unwrap();

        let config = store.snapshot().await;
        assert_eq!(config.fan1.level, 5);
        assert_eq!(config.fan3.level, 2);
    }

    #[tokio::test]
    async fn test_unparseable_config_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        std::fs::write(&config_path, "{ not json").unwrap();

        assert!(matches!(
            ConfigStore::load(&config_path).await,
            Err(EcfanError::Config(_))
        ));
    }
}
