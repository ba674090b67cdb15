//! APU power preset control

use crate::store::ConfigStore;
use ecfan_core::{PowerMode, Result};
use ecfan_hardware::EcBus;
use std::sync::Arc;
use tracing::{info, warn};

/// Applies power presets to the EC and tracks the active one in the config.
///
/// `set` is atomic from the caller's perspective: the EC write happens
/// first, and on failure nothing is persisted, so the previous mode stays
/// authoritative in both places.
pub(crate) struct PowerModeController {
    bus: Arc<EcBus>,
    store: Arc<ConfigStore>,
}

impl PowerModeController {
    pub fn new(bus: Arc<EcBus>, store: Arc<ConfigStore>) -> Self {
        Self { bus, store }
    }

    /// Active preset as reported by the EC.
    pub async fn get(&self) -> Result<PowerMode> {
        self.bus.power_mode().await
    }

    /// Apply a preset and persist it.
    pub async fn set(&self, mode: PowerMode) -> Result<PowerMode> {
        self.bus.set_power_mode(mode).await?;

        info!("Power mode set to {}", mode);
        if let Err(e) = self.store.update(|config| config.power_mode = mode).await {
            warn!("Config not saved: {}", e);
        }

        Ok(mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecfan_hardware::SimulatedEc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_set_applies_and_persists() {
        let sim = SimulatedEc::new();
        let handle = sim.handle();
        let bus = Arc::new(EcBus::new(Box::new(sim)));

        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(
            ConfigStore::load(&temp_dir.path().join("config.json"))
                .await
                .unwrap(),
        );

        let power = PowerModeController::new(bus, store.clone());
        power.set(PowerMode::Performance).await.unwrap();

        assert_eq!(handle.register(0x31), 0x01);
        assert_eq!(store.snapshot().await.power_mode, PowerMode::Performance);
        assert_eq!(power.get().await.unwrap(), PowerMode::Performance);
    }
}
