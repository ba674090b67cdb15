//! Per-fan control state machine
//!
//! The engine owns every mode, level, and curve change. Each operation
//! validates first (a rejected request never touches hardware), then writes
//! through the EC bus, then persists through the config store — the single
//! persistence path, so the file always describes a state that was actually
//! applied.

use crate::store::ConfigStore;
use ecfan_core::{
    next_level, validate_curve, validate_level, Config, Curve, CurveKind, EcfanError, FanId,
    FanMode, Result,
};
use ecfan_hardware::EcBus;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) struct FanCurveEngine {
    bus: Arc<EcBus>,
    store: Arc<ConfigStore>,
}

impl FanCurveEngine {
    pub fn new(bus: Arc<EcBus>, store: Arc<ConfigStore>) -> Self {
        Self { bus, store }
    }

    /// Switch a fan's control mode.
    ///
    /// Entering fixed mode re-applies the stored level immediately.
    /// Entering curve mode only arms evaluation: the next monitor tick
    /// resumes from the last applied level rather than forcing a write.
    pub async fn set_mode(&self, fan: FanId, mode: FanMode) -> Result<FanMode> {
        self.bus.set_fan_mode(fan, mode != FanMode::Auto).await?;

        if mode == FanMode::Fixed {
            let level = self.store.snapshot().await.fan(fan).level;
            self.bus.set_fan_level(fan, level).await?;
        }

        info!("{} mode set to {}", fan, mode);
        self.persist(move |config| config.fan_mut(fan).mode = mode)
            .await;

        Ok(mode)
    }

    /// Set a fixed-mode fan's level. Rejected outside fixed mode and for
    /// levels outside 0-5, without touching the hardware.
    pub async fn set_level(&self, fan: FanId, level: i64) -> Result<u8> {
        let level = validate_level(level)?;

        let mode = self.store.snapshot().await.fan(fan).mode;
        if mode != FanMode::Fixed {
            return Err(EcfanError::Validation(format!(
                "{} is in {} mode; the level can only be set in fixed mode",
                fan, mode
            )));
        }

        self.bus.set_fan_level(fan, level).await?;

        info!("{} level set to {}", fan, level);
        self.persist(move |config| config.fan_mut(fan).level = level)
            .await;

        Ok(level)
    }

    /// Replace one of a fan's ramp curves. Curves are host-side state: they
    /// steer evaluation and are persisted, but never written to the EC.
    pub async fn set_curve(&self, fan: FanId, kind: CurveKind, points: &[i64]) -> Result<Curve> {
        let curve = validate_curve(points)?;

        info!("{} {} curve set to {:?}", fan, kind.as_str(), curve);
        self.persist(move |config| {
            let state = config.fan_mut(fan);
            match kind {
                CurveKind::Rampup => state.rampup_curve = curve,
                CurveKind::Rampdown => state.rampdown_curve = curve,
            }
        })
        .await;

        Ok(curve)
    }

    /// One evaluation tick for one fan against the shared temperature
    /// sample. No-op unless the fan is in curve mode.
    pub async fn evaluate(&self, fan: FanId, temp: u8) -> Result<()> {
        let state = {
            let config = self.store.snapshot().await;
            config.fan(fan).clone()
        };

        if state.mode != FanMode::Curve {
            return Ok(());
        }

        let next = next_level(
            state.level,
            temp,
            &state.rampup_curve,
            &state.rampdown_curve,
        );
        if next == state.level {
            return Ok(());
        }

        self.bus.set_fan_level(fan, next).await?;

        let direction = if next > state.level {
            "ramping up"
        } else {
            "ramping down"
        };
        info!("{} {} to level {} (temp: {}°C)", fan, direction, next, temp);

        self.persist(move |config| config.fan_mut(fan).level = next)
            .await;

        Ok(())
    }

    /// Persist a mutation. A failed write is a warning, not a failure: the
    /// hardware already changed and rolling the memory back would lie about
    /// the applied state.
    async fn persist<F>(&self, mutate: F)
    where
        F: FnOnce(&mut Config),
    {
        if let Err(e) = self.store.update(mutate).await {
            warn!("Config not saved: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecfan_hardware::{SimHandle, SimulatedEc};
    use tempfile::TempDir;

    async fn engine() -> (FanCurveEngine, SimHandle, Arc<ConfigStore>, TempDir) {
        let sim = SimulatedEc::new();
        let handle = sim.handle();
        let bus = Arc::new(EcBus::new(Box::new(sim)));

        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(
            ConfigStore::load(&temp_dir.path().join("config.json"))
                .await
                .unwrap(),
        );

        (
            FanCurveEngine::new(bus, store.clone()),
            handle,
            store,
            temp_dir,
        )
    }

    fn fan(n: u8) -> FanId {
        FanId::new(n).unwrap()
    }

    #[tokio::test]
    async fn test_set_mode_fixed_applies_stored_level() {
        let (engine, handle, store, _dir) = engine().await;
        store.update(|c| c.fan1.level = 3).await.unwrap();

        engine.set_mode(fan(1), FanMode::Fixed).await.unwrap();

        // Mode register manual, level register at 3 (nibble 0x4)
        assert_eq!(handle.register(0x21), 0x11);
        assert_eq!(handle.register(0x22), 0x14);
        assert_eq!(store.snapshot().await.fan1.mode, FanMode::Fixed);
    }

    #[tokio::test]
    async fn test_set_mode_curve_arms_without_level_write() {
        let (engine, handle, store, _dir) = engine().await;
        store.update(|c| c.fan2.level = 4).await.unwrap();

        engine.set_mode(fan(2), FanMode::Curve).await.unwrap();

        // Manual control selected but the level register stays where the
        // EC left it; evaluation resumes from the stored level instead
        assert_eq!(handle.register(0x23), 0x21);
        assert_eq!(handle.register(0x24), 0x27);
        let state = store.snapshot().await.fan2.clone();
        assert_eq!(state.mode, FanMode::Curve);
        assert_eq!(state.level, 4);
    }

    #[tokio::test]
    async fn test_set_level_requires_fixed_mode() {
        let (engine, handle, store, _dir) = engine().await;

        // Fans default to auto
        let err = engine.set_level(fan(1), 2).await.unwrap_err();
        assert!(matches!(err, EcfanError::Validation(_)));
        assert_eq!(handle.register(0x22), 0x17);
        assert_eq!(store.snapshot().await.fan1.level, 0);
    }

    #[tokio::test]
    async fn test_set_level_rejects_out_of_range_without_hardware_write() {
        let (engine, handle, store, _dir) = engine().await;
        engine.set_mode(fan(1), FanMode::Fixed).await.unwrap();

        let err = engine.set_level(fan(1), 7).await.unwrap_err();
        assert!(matches!(err, EcfanError::InvalidLevel(7)));

        // Level register still off, persisted level unchanged
        assert_eq!(handle.register(0x22), 0x17);
        assert_eq!(store.snapshot().await.fan1.level, 0);
    }

    #[tokio::test]
    async fn test_set_level_writes_and_persists() {
        let (engine, handle, store, _dir) = engine().await;
        engine.set_mode(fan(3), FanMode::Fixed).await.unwrap();

        assert_eq!(engine.set_level(fan(3), 5).await.unwrap(), 5);

        assert_eq!(handle.register(0x26), 0x36);
        assert_eq!(store.snapshot().await.fan3.level, 5);
    }

    #[tokio::test]
    async fn test_set_curve_persists_without_touching_hardware() {
        let (engine, handle, store, _dir) = engine().await;

        let before = handle.register(0x22);
        engine
            .set_curve(fan(1), CurveKind::Rampdown, &[30, 45, 75, 90, 95])
            .await
            .unwrap();

        assert_eq!(handle.register(0x22), before);
        assert_eq!(
            store.snapshot().await.fan1.rampdown_curve,
            [30, 45, 75, 90, 95]
        );
    }

    #[tokio::test]
    async fn test_set_curve_rejects_wrong_length() {
        let (engine, _, store, _dir) = engine().await;

        let err = engine
            .set_curve(fan(1), CurveKind::Rampup, &[60, 70, 83, 95])
            .await
            .unwrap_err();
        assert!(matches!(err, EcfanError::Validation(_)));
        assert_eq!(
            store.snapshot().await.fan1.rampup_curve,
            [60, 70, 83, 95, 97]
        );
    }

    #[tokio::test]
    async fn test_evaluate_steps_up_once_and_persists() {
        let (engine, handle, store, _dir) = engine().await;
        store
            .update(|c| {
                c.fan1.mode = FanMode::Curve;
                c.fan1.level = 2;
            })
            .await
            .unwrap();

        // 83 clears the level-2 rampup threshold; one step only
        engine.evaluate(fan(1), 83).await.unwrap();

        assert_eq!(handle.register(0x22), 0x14);
        assert_eq!(store.snapshot().await.fan1.level, 3);
    }

    #[tokio::test]
    async fn test_evaluate_holds_inside_hysteresis_band() {
        let (engine, handle, store, _dir) = engine().await;
        store
            .update(|c| {
                c.fan1.mode = FanMode::Curve;
                c.fan1.level = 2;
            })
            .await
            .unwrap();

        let before = handle.register(0x22);
        // Between rampdown[1]=50 and rampup[2]=83: no movement either way
        for temp in [50, 60, 72, 82] {
            engine.evaluate(fan(1), temp).await.unwrap();
        }

        assert_eq!(handle.register(0x22), before);
        assert_eq!(store.snapshot().await.fan1.level, 2);
    }

    #[tokio::test]
    async fn test_evaluate_ignores_non_curve_fans() {
        let (engine, handle, store, _dir) = engine().await;
        engine.set_mode(fan(1), FanMode::Fixed).await.unwrap();

        engine.evaluate(fan(1), 99).await.unwrap();

        assert_eq!(handle.register(0x22), 0x17);
        assert_eq!(store.snapshot().await.fan1.level, 0);
    }
}
