//! Drivetrain helpers shared by the engine models and the controller.

use crate::consts::{EV_REDUCTION_RATIO, GEAR_TABLE, WHEEL_RADIUS_M};
use std::f64::consts::PI;

/// Wheel rotational speed [rpm] at `speed_kmh`.
#[inline]
pub fn wheel_rpm(speed_kmh: f64) -> f64 {
    let metres_per_minute = speed_kmh.max(0.0) * 1000.0 / 60.0;
    metres_per_minute / (2.0 * PI * WHEEL_RADIUS_M)
}

/// Electric motor speed [rpm] at `level` of full power.
#[inline]
pub fn ev_rpm(level: f64, speed_kmh: f64) -> f64 {
    level.clamp(0.0, 1.0) * wheel_rpm(speed_kmh) * EV_REDUCTION_RATIO
}

/// Combustion gear (1-based) and its ratio for `speed_kmh`.
pub fn gear_for_speed(speed_kmh: f64) -> (u8, f64) {
    let mut gear = 0u8;
    for (upper, ratio) in GEAR_TABLE {
        gear += 1;
        if speed_kmh < upper {
            return (gear, ratio);
        }
    }
    // Only reachable for NaN.
    (gear, GEAR_TABLE[GEAR_TABLE.len() - 1].1)
}
