//! Fan handlers: mode, level, speed and ramp curves
//!
//! All routes carry the fan in the first path segment (`fan1`..`fan3`);
//! anything else is a 400 before any state is consulted.

use crate::api::error::ApiError;
use crate::api::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use ecfan_core::api::{
    FanCurveRequest, FanCurveResponse, FanLevelRequest, FanLevelResponse, FanModeRequest,
    FanModeResponse, FanRpmResponse,
};
use ecfan_core::{CurveKind, FanId, FanMode};
use tracing::debug;

fn parse_fan(segment: &str) -> Result<FanId, ApiError> {
    FanId::from_segment(segment).map_err(ApiError::from)
}

/// Report a fan's control mode.
///
/// The mode is answered from the config snapshot: at the register level the
/// EC only distinguishes auto from manual, fixed-versus-curve is host state.
///
/// # Endpoint
///
/// `GET /fanX/mode`
pub(crate) async fn get_mode(
    Path(fan): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<FanModeResponse>, ApiError> {
    debug!("Request: GET /{}/mode", fan);

    let fan = parse_fan(&fan)?;
    let mode = state.store.snapshot().await.fan(fan).mode;
    Ok(Json(FanModeResponse { mode }))
}

/// Switch a fan's control mode.
///
/// # Endpoint
///
/// `POST /fanX/mode` with `{"mode": "auto|fixed|curve"}`
pub(crate) async fn set_mode(
    Path(fan): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<FanModeRequest>,
) -> Result<Json<FanModeResponse>, ApiError> {
    debug!("Request: POST /{}/mode ({})", fan, request.mode);

    let fan = parse_fan(&fan)?;
    let mode = FanMode::parse(&request.mode)?;
    let mode = state.engine.set_mode(fan, mode).await?;
    Ok(Json(FanModeResponse { mode }))
}

/// Report a fan's current level, decoded from the hardware register.
///
/// # Endpoint
///
/// `GET /fanX/level`
pub(crate) async fn get_level(
    Path(fan): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<FanLevelResponse>, ApiError> {
    debug!("Request: GET /{}/level", fan);

    let fan = parse_fan(&fan)?;
    let level = state.bus.fan_level(fan).await?;
    Ok(Json(FanLevelResponse { level }))
}

/// Set a fixed-mode fan's level (0-5).
///
/// Rejected with 400 outside fixed mode or outside the range, without
/// touching the hardware.
///
/// # Endpoint
///
/// `POST /fanX/level` with `{"level": 0..5}`
pub(crate) async fn set_level(
    Path(fan): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<FanLevelRequest>,
) -> Result<Json<FanLevelResponse>, ApiError> {
    debug!("Request: POST /{}/level ({})", fan, request.level);

    let fan = parse_fan(&fan)?;
    let level = state.engine.set_level(fan, request.level).await?;
    Ok(Json(FanLevelResponse { level }))
}

/// Report a fan's rotation speed.
///
/// # Endpoint
///
/// `GET /fanX/rpm`
pub(crate) async fn get_rpm(
    Path(fan): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<FanRpmResponse>, ApiError> {
    debug!("Request: GET /{}/rpm", fan);

    let fan = parse_fan(&fan)?;
    let rpm = state.bus.fan_rpm(fan).await?;
    Ok(Json(FanRpmResponse { rpm }))
}

/// # Endpoint
///
/// `GET /fanX/rampup_curve`
pub(crate) async fn get_rampup_curve(
    Path(fan): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<FanCurveResponse>, ApiError> {
    debug!("Request: GET /{}/rampup_curve", fan);

    let fan = parse_fan(&fan)?;
    let curve = state.store.snapshot().await.fan(fan).rampup_curve;
    Ok(Json(FanCurveResponse { curve }))
}

/// # Endpoint
///
/// `POST /fanX/rampup_curve` with `{"curve": [t1, t2, t3, t4, t5]}`
pub(crate) async fn set_rampup_curve(
    Path(fan): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<FanCurveRequest>,
) -> Result<Json<FanCurveResponse>, ApiError> {
    debug!("Request: POST /{}/rampup_curve ({:?})", fan, request.curve);

    let fan = parse_fan(&fan)?;
    let curve = state
        .engine
        .set_curve(fan, CurveKind::Rampup, &request.curve)
        .await?;
    Ok(Json(FanCurveResponse { curve }))
}

/// # Endpoint
///
/// `GET /fanX/rampdown_curve`
pub(crate) async fn get_rampdown_curve(
    Path(fan): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<FanCurveResponse>, ApiError> {
    debug!("Request: GET /{}/rampdown_curve", fan);

    let fan = parse_fan(&fan)?;
    let curve = state.store.snapshot().await.fan(fan).rampdown_curve;
    Ok(Json(FanCurveResponse { curve }))
}

/// # Endpoint
///
/// `POST /fanX/rampdown_curve` with `{"curve": [t1, t2, t3, t4, t5]}`
pub(crate) async fn set_rampdown_curve(
    Path(fan): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<FanCurveRequest>,
) -> Result<Json<FanCurveResponse>, ApiError> {
    debug!("Request: POST /{}/rampdown_curve ({:?})", fan, request.curve);

    let fan = parse_fan(&fan)?;
    let curve = state
        .engine
        .set_curve(fan, CurveKind::Rampdown, &request.curve)
        .await?;
    Ok(Json(FanCurveResponse { curve }))
}
