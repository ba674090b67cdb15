//! API models for the ecfan REST API
//!
//! Request bodies use permissive types (strings, wide integers) so the
//! handlers can reject out-of-range values with a proper 400 instead of a
//! deserialization failure; response bodies use the typed forms.

use crate::types::{Curve, FanMode, PowerMode};
use serde::{Deserialize, Serialize};

/// `GET /status` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    /// 1 when the EC answered the firmware probe
    pub status: u8,
    /// EC firmware version, `major.minor`
    pub version: String,
}

/// `POST /apu/power_mode` request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerModeRequest {
    pub power_mode: String,
}

/// `GET/POST /apu/power_mode` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerModeResponse {
    pub power_mode: PowerMode,
}

/// `GET /apu/temp` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemperatureResponse {
    /// Degrees Celsius
    pub temperature: u8,
}

/// `GET /fanX/rpm` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanRpmResponse {
    pub rpm: u16,
}

/// `POST /fanX/mode` request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanModeRequest {
    pub mode: String,
}

/// `GET/POST /fanX/mode` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanModeResponse {
    pub mode: FanMode,
}

/// `POST /fanX/level` request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanLevelRequest {
    pub level: i64,
}

/// `GET/POST /fanX/level` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanLevelResponse {
    pub level: u8,
}

/// `POST /fanX/rampup_curve` / `rampdown_curve` request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanCurveRequest {
    pub curve: Vec<i64>,
}

/// `GET/POST /fanX/rampup_curve` / `rampdown_curve` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanCurveResponse {
    pub curve: Curve,
}

/// Per-fan block of the `GET /metrics` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanMetrics {
    pub mode: FanMode,
    pub level: u8,
    pub rpm: u16,
    pub rampup_curve: Curve,
    pub rampdown_curve: Curve,
}

/// `GET /metrics` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsResponse {
    pub power_mode: PowerMode,
    pub temperature: u8,
    pub fan1: FanMetrics,
    pub fan2: FanMetrics,
    pub fan3: FanMetrics,
}

/// Error body returned by every failing endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_mode_response_shape() {
        let body = PowerModeResponse {
            power_mode: PowerMode::Performance,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"power_mode":"performance"}"#);
    }

    #[test]
    fn test_level_request_accepts_out_of_range_values() {
        // Range checking happens in the handler, not in serde
        let req: FanLevelRequest = serde_json::from_str(r#"{"level": 7}"#).unwrap();
        assert_eq!(req.level, 7);

        let req: FanLevelRequest = serde_json::from_str(r#"{"level": -1}"#).unwrap();
        assert_eq!(req.level, -1);
    }

    #[test]
    fn test_curve_request_accepts_any_length() {
        let req: FanCurveRequest =
            serde_json::from_str(r#"{"curve": [60, 70, 83]}"#).unwrap();
        assert_eq!(req.curve, vec![60, 70, 83]);
    }

    #[test]
    fn test_curve_response_shape() {
        let body = FanCurveResponse {
            curve: [60, 70, 83, 95, 97],
        };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"curve":[60,70,83,95,97]}"#);
    }

    #[test]
    fn test_error_body_shape() {
        let body = ErrorBody {
            error: "Fan level must be 0-5".to_string(),
        };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"error":"Fan level must be 0-5"}"#);
    }
}
