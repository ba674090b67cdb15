//! Control plane: fan-curve engine, power presets, monitor loop, and
//! startup restoration.

mod engine;
mod monitor;
mod power;

pub(crate) use engine::FanCurveEngine;
pub(crate) use monitor::MonitorLoop;
pub(crate) use power::PowerModeController;

use crate::store::ConfigStore;
use ecfan_core::{FanId, FanMode};
use ecfan_hardware::EcBus;
use tracing::{info, warn};

/// Push the persisted state back to the EC after a restart, so operator
/// intent survives reboots and crashes. Individual failures are logged and
/// skipped; a fan left in its power-on state is recoverable through the
/// API, a dead daemon is not.
pub(crate) async fn restore_from_config(bus: &EcBus, store: &ConfigStore) {
    info!("Restoring saved parameters from configuration...");

    let config = store.snapshot().await;

    match bus.set_power_mode(config.power_mode).await {
        Ok(()) => info!("Restored power mode: {}", config.power_mode),
        Err(e) => warn!("Could not restore power mode: {}", e),
    }

    for fan in FanId::all() {
        let state = config.fan(fan);

        if let Err(e) = bus.set_fan_mode(fan, state.mode != FanMode::Auto).await {
            warn!("Could not restore {} mode: {}", fan, e);
            continue;
        }

        // In fixed mode the stored level is authoritative; in curve mode it
        // is the resume point for evaluation. Auto keeps the EC in charge.
        if state.mode != FanMode::Auto {
            if let Err(e) = bus.set_fan_level(fan, state.level).await {
                warn!("Could not restore {} level: {}", fan, e);
                continue;
            }
        }

        info!("Restored {}: mode {}, level {}", fan, state.mode, state.level);
    }

    info!("Parameter restoration completed");
}
