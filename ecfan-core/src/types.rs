//! Core types and data structures for ecfan

use crate::error::{EcfanError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of fans driven by the EC
pub const FAN_COUNT: usize = 3;

/// Highest fan level (0 = off, 5 = 100%)
pub const MAX_LEVEL: u8 = 5;

/// Number of thresholds in a ramp curve, one per level transition
pub const CURVE_POINTS: usize = 5;

/// Highest accepted curve threshold in degrees Celsius
pub const MAX_CURVE_TEMP: u8 = 100;

/// A ramp curve: five temperature thresholds in degrees Celsius
pub type Curve = [u8; CURVE_POINTS];

/// Identifier of a physical fan (1-3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FanId(u8);

impl FanId {
    /// Create a fan ID, validating the 1-3 range
    pub fn new(id: u8) -> Result<Self> {
        if (1..=FAN_COUNT as u8).contains(&id) {
            Ok(Self(id))
        } else {
            Err(EcfanError::InvalidFanId(id))
        }
    }

    /// Parse a URL path segment of the form `fan1`, `fan2`, `fan3`
    pub fn from_segment(segment: &str) -> Result<Self> {
        let id = segment
            .strip_prefix("fan")
            .and_then(|n| n.parse::<u8>().ok())
            .ok_or_else(|| EcfanError::Validation(format!("Unknown fan: {}", segment)))?;
        Self::new(id)
    }

    /// The 1-based fan number
    pub fn number(self) -> u8 {
        self.0
    }

    /// Zero-based index into per-fan arrays
    pub fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    /// Iterate over all fan IDs in order
    pub fn all() -> impl Iterator<Item = FanId> {
        (1..=FAN_COUNT as u8).map(FanId)
    }
}

impl fmt::Display for FanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fan{}", self.0)
    }
}

/// Fan control mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FanMode {
    /// EC firmware controls the fan on its own
    Auto,
    /// Operator-selected level, held until changed
    Fixed,
    /// Level derived from temperature via the ramp curves
    Curve,
}

impl FanMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FanMode::Auto => "auto",
            FanMode::Fixed => "fixed",
            FanMode::Curve => "curve",
        }
    }

    /// Parse an API-supplied mode string
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(FanMode::Auto),
            "fixed" => Ok(FanMode::Fixed),
            "curve" => Ok(FanMode::Curve),
            other => Err(EcfanError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for FanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// APU power preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerMode {
    Balanced,
    Performance,
    Quiet,
}

impl PowerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PowerMode::Balanced => "balanced",
            PowerMode::Performance => "performance",
            PowerMode::Quiet => "quiet",
        }
    }

    /// Parse an API-supplied power mode string
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "balanced" => Ok(PowerMode::Balanced),
            "performance" => Ok(PowerMode::Performance),
            "quiet" => Ok(PowerMode::Quiet),
            other => Err(EcfanError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for PowerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which of the two ramp curves an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveKind {
    Rampup,
    Rampdown,
}

impl CurveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CurveKind::Rampup => "rampup",
            CurveKind::Rampdown => "rampdown",
        }
    }
}

/// Per-fan control state, persisted as part of [`crate::Config`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanState {
    pub mode: FanMode,
    /// Last applied level; authoritative in fixed mode, resume point in curve mode
    pub level: u8,
    pub rampup_curve: Curve,
    pub rampdown_curve: Curve,
}

impl Default for FanState {
    fn default() -> Self {
        FanState {
            mode: FanMode::Auto,
            level: 0,
            rampup_curve: [60, 70, 83, 95, 97],
            rampdown_curve: [40, 50, 80, 94, 96],
        }
    }
}

impl FanState {
    /// Fan 3 drives a different rotor and ships with earlier thresholds
    pub fn fan3_default() -> Self {
        FanState {
            rampup_curve: [20, 60, 83, 95, 97],
            rampdown_curve: [0, 50, 80, 94, 96],
            ..Default::default()
        }
    }

    /// Default state for the given fan
    pub fn default_for(fan: FanId) -> Self {
        if fan.number() == 3 {
            Self::fan3_default()
        } else {
            Self::default()
        }
    }
}

/// Validate an API-supplied fan level
pub fn validate_level(level: i64) -> Result<u8> {
    if (0..=MAX_LEVEL as i64).contains(&level) {
        Ok(level as u8)
    } else {
        Err(EcfanError::InvalidLevel(level))
    }
}

/// Validate an API-supplied curve: exactly five thresholds, each 0-100 degrees.
///
/// Monotonic ordering is a convention, not a constraint; a misordered curve
/// is accepted and evaluated literally.
pub fn validate_curve(points: &[i64]) -> Result<Curve> {
    if points.len() != CURVE_POINTS {
        return Err(EcfanError::Validation(format!(
            "Curve must have exactly {} points, got {}",
            CURVE_POINTS,
            points.len()
        )));
    }

    let mut curve = [0u8; CURVE_POINTS];
    for (i, &p) in points.iter().enumerate() {
        if !(0..=MAX_CURVE_TEMP as i64).contains(&p) {
            return Err(EcfanError::Validation(format!(
                "Curve temperature {} out of range (0-{} degrees)",
                p, MAX_CURVE_TEMP
            )));
        }
        curve[i] = p as u8;
    }

    Ok(curve)
}
