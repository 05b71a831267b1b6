//! Vehicle speed model.
//!
//! Speed is not integrated from engine RPM. While the accelerator is held
//! the vehicle follows `speed = n·(1.13 − 0.00162·n)`, where `n` counts
//! acceleration cycles and saturates at [`ACCEL_CYCLE_CAP`]. The current
//! speed is mapped back to `n` on the rising branch of the curve, so the
//! model needs no memory of its own.

use vmu_common::consts::{
    ACCEL_CURVE_LINEAR, ACCEL_CURVE_QUADRATIC, ACCEL_CYCLE_CAP, BRAKE_DECEL, COAST_DECEL,
    MAX_SPEED, MIN_SPEED,
};

/// Speed reached after `cycles` acceleration cycles [km/h].
#[inline]
pub fn curve_speed(cycles: f64) -> f64 {
    let n = cycles.clamp(0.0, ACCEL_CYCLE_CAP);
    n * (ACCEL_CURVE_LINEAR - ACCEL_CURVE_QUADRATIC * n)
}

/// Acceleration cycles needed to reach `speed`.
///
/// Speeds above the curve map to the cap.
pub fn curve_cycles(speed: f64) -> f64 {
    let a = ACCEL_CURVE_LINEAR;
    let b = ACCEL_CURVE_QUADRATIC;
    let discriminant = a * a - 4.0 * b * speed.max(0.0);
    if discriminant < 0.0 {
        return ACCEL_CYCLE_CAP;
    }
    ((a - discriminant.sqrt()) / (2.0 * b)).min(ACCEL_CYCLE_CAP)
}

/// Speed after one cycle with the given pedals.
///
/// Accelerating never lowers the speed, even past the top of the curve.
pub fn next_speed(speed: f64, accelerator: bool, brake: bool) -> f64 {
    let next = if brake {
        speed - BRAKE_DECEL
    } else if accelerator {
        let n = (curve_cycles(speed) + 1.0).min(ACCEL_CYCLE_CAP);
        curve_speed(n).max(speed)
    } else {
        speed - COAST_DECEL
    };
    next.clamp(MIN_SPEED, MAX_SPEED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curve_inverts_on_rising_branch() {
        for n in [0.0, 1.0, 10.0, 42.0, 150.0, 300.0] {
            let back = curve_cycles(curve_speed(n));
            assert!((back - n).abs() < 1e-6, "n={n} back={back}");
        }
    }

    #[test]
    fn test_first_cycle_from_rest() {
        let v = next_speed(0.0, true, false);
        assert!((v - (ACCEL_CURVE_LINEAR - ACCEL_CURVE_QUADRATIC)).abs() < 1e-9);
    }

    #[test]
    fn test_passes_split_point_after_43_cycles() {
        let mut speed = 0.0;
        let mut cycles = 0;
        while speed <= 45.0 {
            speed = next_speed(speed, true, false);
            cycles += 1;
        }
        assert_eq!(cycles, 43);
    }

    #[test]
    fn test_top_speed_saturates() {
        let mut speed = 0.0;
        for _ in 0..1_000 {
            let next = next_speed(speed, true, false);
            assert!(next >= speed);
            speed = next;
        }
        assert!(speed > 190.0 && speed <= MAX_SPEED);
        assert!((speed - curve_speed(ACCEL_CYCLE_CAP)).abs() < 0.01);
    }

    #[test]
    fn test_above_curve_holds_speed() {
        assert!((next_speed(199.0, true, false) - 199.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_coast_and_brake() {
        assert!((next_speed(10.0, false, false) - 9.7).abs() < 1e-12);
        assert!((next_speed(10.0, false, true) - 8.0).abs() < 1e-12);
        // Brake wins over a stale accelerator flag.
        assert!((next_speed(10.0, true, true) - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_never_below_minimum() {
        assert!((next_speed(0.2, false, false) - MIN_SPEED).abs() < f64::EPSILON);
        assert!((next_speed(1.0, false, true) - MIN_SPEED).abs() < f64::EPSILON);
        assert!((next_speed(MIN_SPEED, false, false) - MIN_SPEED).abs() < f64::EPSILON);
    }
}
