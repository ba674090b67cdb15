//! Info handlers: service status probe and combined metrics

use crate::api::error::ApiError;
use crate::api::AppState;
use axum::{extract::State, Json};
use ecfan_core::api::{FanMetrics, MetricsResponse, StatusResponse};
use ecfan_core::{Config, FanId};
use tracing::debug;

/// Probe the EC and report its firmware version.
///
/// Doubles as the health check: a reachable EC answers with a plausible
/// firmware pair, anything else is a 500.
///
/// # Endpoint
///
/// `GET /status`
pub(crate) async fn status(
    State(state): State<AppState>,
) -> Result<Json<StatusResponse>, ApiError> {
    debug!("Request: GET /status");

    let (major, minor) = state.bus.firmware_version().await?;

    Ok(Json(StatusResponse {
        status: 1,
        version: format!("{}.{:02}", major, minor),
    }))
}

/// One combined snapshot: power preset, temperature, and every fan's mode,
/// level, speed and curves.
///
/// # Endpoint
///
/// `GET /metrics`
pub(crate) async fn metrics(
    State(state): State<AppState>,
) -> Result<Json<MetricsResponse>, ApiError> {
    debug!("Request: GET /metrics");

    let power_mode = state.bus.power_mode().await?;
    let temperature = state.bus.apu_temperature().await?;
    let config = state.store.snapshot().await;

    Ok(Json(MetricsResponse {
        power_mode,
        temperature,
        fan1: fan_metrics(&state, &config, 1).await?,
        fan2: fan_metrics(&state, &config, 2).await?,
        fan3: fan_metrics(&state, &config, 3).await?,
    }))
}

/// Collect one fan's block: mode and curves from the config snapshot
/// (operator intent), level and speed from the hardware.
async fn fan_metrics(state: &AppState, config: &Config, id: u8) -> Result<FanMetrics, ApiError> {
    let fan = FanId::new(id)?;
    let fan_state = config.fan(fan);

    Ok(FanMetrics {
        mode: fan_state.mode,
        level: state.bus.fan_level(fan).await?,
        rpm: state.bus.fan_rpm(fan).await?,
        rampup_curve: fan_state.rampup_curve,
        rampdown_curve: fan_state.rampdown_curve,
    })
}
