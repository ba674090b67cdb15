//! APU handlers: power preset and temperature

use crate::api::error::ApiError;
use crate::api::AppState;
use axum::{extract::State, Json};
use ecfan_core::api::{PowerModeRequest, PowerModeResponse, TemperatureResponse};
use ecfan_core::PowerMode;
use tracing::debug;

/// Report the active power preset as the EC sees it.
///
/// # Endpoint
///
/// `GET /apu/power_mode`
pub(crate) async fn get_power_mode(
    State(state): State<AppState>,
) -> Result<Json<PowerModeResponse>, ApiError> {
    debug!("Request: GET /apu/power_mode");

    let power_mode = state.power.get().await?;
    Ok(Json(PowerModeResponse { power_mode }))
}

/// Apply a power preset and persist it.
///
/// # Endpoint
///
/// `POST /apu/power_mode` with `{"power_mode": "balanced|performance|quiet"}`
pub(crate) async fn set_power_mode(
    State(state): State<AppState>,
    Json(request): Json<PowerModeRequest>,
) -> Result<Json<PowerModeResponse>, ApiError> {
    debug!("Request: POST /apu/power_mode ({})", request.power_mode);

    let mode = PowerMode::parse(&request.power_mode)?;
    let power_mode = state.power.set(mode).await?;
    Ok(Json(PowerModeResponse { power_mode }))
}

/// Report the APU temperature in degrees Celsius.
///
/// # Endpoint
///
/// `GET /apu/temp`
pub(crate) async fn get_temperature(
    State(state): State<AppState>,
) -> Result<Json<TemperatureResponse>, ApiError> {
    debug!("Request: GET /apu/temp");

    let temperature = state.bus.apu_temperature().await?;
    Ok(Json(TemperatureResponse { temperature }))
}
