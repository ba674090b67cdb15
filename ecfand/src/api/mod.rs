//! API module for the ecfan daemon
//!
//! Contains the REST API implementation with Axum router and handlers.

pub(crate) mod handlers;

use crate::control::{FanCurveEngine, PowerModeController};
use crate::store::ConfigStore;
use axum::{
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use ecfan_hardware::EcBus;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// Application state shared across all handlers
#[derive(Clone)]
pub(crate) struct AppState {
    /// Serialized EC access
    pub bus: Arc<EcBus>,
    /// Persisted configuration
    pub store: Arc<ConfigStore>,
    /// Fan mode/level/curve control
    pub engine: Arc<FanCurveEngine>,
    /// Power preset control
    pub power: Arc<PowerModeController>,
}

impl AppState {
    pub fn new(bus: Arc<EcBus>, store: Arc<ConfigStore>) -> Self {
        let engine = Arc::new(FanCurveEngine::new(bus.clone(), store.clone()));
        let power = Arc::new(PowerModeController::new(bus.clone(), store.clone()));
        Self {
            bus,
            store,
            engine,
            power,
        }
    }
}

/// Create the main API router with all endpoints
pub(crate) fn create_router(state: AppState) -> Router {
    info!("Setting up API router...");

    let cors = CorsLayer::new()
        .allow_origin("*".parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any);

    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    Router::new()
        // Service status and combined metrics
        .route("/status", get(handlers::info::status))
        .route("/metrics", get(handlers::info::metrics))
        // APU endpoints
        .route(
            "/apu/power_mode",
            get(handlers::apu::get_power_mode).post(handlers::apu::set_power_mode),
        )
        .route("/apu/temp", get(handlers::apu::get_temperature))
        // Per-fan endpoints; the segment is fan1, fan2 or fan3
        .route(
            "/:fan/mode",
            get(handlers::fans::get_mode).post(handlers::fans::set_mode),
        )
        .route(
            "/:fan/level",
            get(handlers::fans::get_level).post(handlers::fans::set_level),
        )
        .route("/:fan/rpm", get(handlers::fans::get_rpm))
        .route(
            "/:fan/rampup_curve",
            get(handlers::fans::get_rampup_curve).post(handlers::fans::set_rampup_curve),
        )
        .route(
            "/:fan/rampdown_curve",
            get(handlers::fans::get_rampdown_curve).post(handlers::fans::set_rampdown_curve),
        )
        .layer(middleware_stack)
        .with_state(state)
}

/// Error handling utilities
pub(crate) mod error {
    use axum::{
        http::StatusCode,
        response::{IntoResponse, Response},
        Json,
    };
    use ecfan_core::api::ErrorBody;
    use ecfan_core::EcfanError;
    use tracing::error;

    /// Custom error type for API responses
    #[derive(Debug)]
    pub struct ApiError {
        pub status_code: StatusCode,
        pub message: String,
    }

    impl ApiError {
        pub fn new(status_code: StatusCode, message: impl Into<String>) -> Self {
            Self {
                status_code,
                message: message.into(),
            }
        }

        /// Create a bad request error
        pub fn bad_request(message: impl Into<String>) -> Self {
            Self::new(StatusCode::BAD_REQUEST, message)
        }

        /// Create an internal server error
        pub fn internal_error(message: impl Into<String>) -> Self {
            Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
        }
    }

    impl IntoResponse for ApiError {
        fn into_response(self) -> Response {
            error!("API Error {}: {}", self.status_code, self.message);

            let body = ErrorBody {
                error: self.message,
            };

            (self.status_code, Json(body)).into_response()
        }
    }

    /// Convert EcfanError to ApiError: malformed requests are the caller's
    /// fault (400), EC trouble is ours (500).
    impl From<EcfanError> for ApiError {
        fn from(err: EcfanError) -> Self {
            match err {
                EcfanError::Validation(_)
                | EcfanError::InvalidFanId(_)
                | EcfanError::InvalidLevel(_)
                | EcfanError::InvalidMode(_) => Self::bad_request(err.to_string()),
                _ => Self::internal_error(err.to_string()),
            }
        }
    }
}
