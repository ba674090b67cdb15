//! Temperature monitor loop
//!
//! A fixed 1-second scheduler that samples the APU temperature once per
//! tick and drives curve evaluation for every fan in curve mode. The loop
//! runs for the lifetime of the process; transient EC failures cost one
//! tick, never the loop.

use crate::control::FanCurveEngine;
use crate::store::ConfigStore;
use ecfan_core::{FanId, FanMode};
use ecfan_hardware::EcBus;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Sampling period of the monitor
pub(crate) const MONITOR_PERIOD: Duration = Duration::from_secs(1);

pub(crate) struct MonitorLoop {
    bus: Arc<EcBus>,
    store: Arc<ConfigStore>,
    engine: Arc<FanCurveEngine>,
    /// Whether curve monitoring was announced as active
    active: bool,
}

impl MonitorLoop {
    pub fn new(bus: Arc<EcBus>, store: Arc<ConfigStore>, engine: Arc<FanCurveEngine>) -> Self {
        Self {
            bus,
            store,
            engine,
            active: false,
        }
    }

    /// Run the loop until the process exits.
    pub fn spawn(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(MONITOR_PERIOD);
            loop {
                interval.tick().await;
                self.tick().await;
            }
        })
    }

    /// One monitor tick: sample once, evaluate every curve fan against the
    /// same reading. A failed sample skips the whole tick so no fan ever
    /// evaluates against a stale or garbage temperature.
    pub async fn tick(&mut self) {
        let config = self.store.snapshot().await;
        let curve_fans: Vec<FanId> = FanId::all()
            .filter(|&fan| config.fan(fan).mode == FanMode::Curve)
            .collect();

        if curve_fans.is_empty() {
            if self.active {
                info!("Curve monitoring stopped - no fans in curve mode");
                self.active = false;
            }
            return;
        }

        if !self.active {
            info!(
                "Curve monitoring started - {} fan(s) in curve mode",
                curve_fans.len()
            );
            self.active = true;
        }

        let temp = match self.bus.apu_temperature().await {
            Ok(temp) => temp,
            Err(e) => {
                warn!("Temperature sample failed, skipping tick: {}", e);
                return;
            }
        };

        for fan in curve_fans {
            if let Err(e) = self.engine.evaluate(fan, temp).await {
                warn!("Curve evaluation failed for {}: {}", fan, e);
            }
        }
    }
}
