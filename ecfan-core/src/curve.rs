//! Hysteresis curve evaluation
//!
//! A fan in curve mode moves between levels 0-5 driven by two threshold
//! arrays: the rampup curve gates upward transitions, the rampdown curve
//! gates downward ones. Keeping the two apart creates a hysteresis band per
//! level, so a temperature hovering near a boundary does not toggle the fan.

use crate::types::{Curve, MAX_LEVEL};

/// Compute the level a curve fan should hold after one evaluation tick.
///
/// - Ramp up when `temp >= rampup[level]` and the fan is below level 5.
/// - Otherwise ramp down when `level > 0` and `temp < rampdown[level - 1]`.
///
/// Moves a single step per tick: a temperature that crosses several
/// thresholds at once still advances one level, so the fan spins up
/// gradually rather than jumping.
pub fn next_level(level: u8, temp: u8, rampup: &Curve, rampdown: &Curve) -> u8 {
    debug_assert!(level <= MAX_LEVEL);

    if level < MAX_LEVEL && temp >= rampup[level as usize] {
        return level + 1;
    }

    if level > 0 && temp < rampdown[(level - 1) as usize] {
        return level - 1;
    }

    level
}
