//! Vehicle constants.
//!
//! Single source of truth for limits and model coefficients. Controller
//! thresholds can be overridden through `[controller]` in the config file;
//! the values here are the defaults.

use std::time::Duration;

// ─── Limits ─────────────────────────────────────────────────────────

/// Lower speed clamp [km/h].
pub const MIN_SPEED: f64 = 0.0;

/// Upper speed clamp [km/h].
pub const MAX_SPEED: f64 = 200.0;

/// Battery capacity [%].
pub const MAX_BATTERY: f64 = 100.0;

/// Tank capacity [%].
pub const MAX_FUEL: f64 = 100.0;

// ─── Controller thresholds ──────────────────────────────────────────

/// Speed at and below which the vehicle runs electric-only [km/h].
pub const EV_ONLY_SPEED_LIMIT: f64 = 45.0;

/// Battery level at or below which the combustion engine takes over [%].
pub const BATTERY_CRITICAL_THRESHOLD: f64 = 10.0;

/// Fuel level at or below which the tank counts as empty [%].
pub const FUEL_CRITICAL_THRESHOLD: f64 = 0.1;

/// Battery level considered fully charged [%].
pub const CHARGE_FULL: f64 = 100.0;

/// Power-level change applied per cycle while a transition ramps.
pub const RAMP_STEP: f64 = 0.005;

// ─── Speed model ────────────────────────────────────────────────────

/// Linear coefficient of the acceleration curve.
pub const ACCEL_CURVE_LINEAR: f64 = 1.13;

/// Quadratic coefficient of the acceleration curve.
pub const ACCEL_CURVE_QUADRATIC: f64 = 0.00162;

/// Saturation of the acceleration cycle counter.
pub const ACCEL_CYCLE_CAP: f64 = 350.0;

/// Speed lost per cycle while coasting [km/h].
pub const COAST_DECEL: f64 = 0.3;

/// Speed lost per cycle while braking [km/h].
pub const BRAKE_DECEL: f64 = 2.0;

// ─── Timing ─────────────────────────────────────────────────────────

/// Supervisor cycle period in milliseconds.
pub const CYCLE_TIME_MS: u64 = 100;

/// Supervisor cycle period.
pub const CYCLE_TIME: Duration = Duration::from_millis(CYCLE_TIME_MS);

/// Consecutive cycles without a response before `safety` is raised.
pub const WATCHDOG_MISS_LIMIT: u32 = 5;

// ─── Drivetrain ─────────────────────────────────────────────────────

/// Wheel radius [m].
pub const WHEEL_RADIUS_M: f64 = 0.3;

/// Electric drive reduction ratio.
pub const EV_REDUCTION_RATIO: f64 = 9.0;

/// Electric motor RPM ceiling.
pub const EV_MAX_RPM: f64 = 6000.0;

/// Combustion gearbox: (upper speed bound [km/h], ratio). The last band is open.
pub const GEAR_TABLE: [(f64, f64); 5] = [
    (20.0, 3.5),
    (40.0, 2.1),
    (60.0, 1.4),
    (90.0, 1.0),
    (f64::INFINITY, 0.8),
];

/// Final drive ratio shared by all combustion gears.
pub const FINAL_DRIVE_RATIO: f64 = 3.9;

// ─── Energy ─────────────────────────────────────────────────────────

/// Battery drained per cycle at full electric power [%].
pub const EV_DRAIN_RATE: f64 = 0.02;

/// Battery gained per cycle while stationary [%].
pub const EV_CHARGE_RATE: f64 = 0.05;

/// Battery recovered per cycle while braking at `MAX_SPEED` [%].
pub const EV_REGEN_RATE: f64 = 0.1;

/// Fuel burned per cycle per km/h at full combustion power [%].
pub const FUEL_RATE: f64 = 0.0005;

// ─── Thermal ────────────────────────────────────────────────────────

/// Ambient temperature both engines decay toward [°C].
pub const AMBIENT_TEMP: f64 = 25.0;

/// Electric motor heating per cycle at full power [°C].
pub const EV_HEAT_RATE: f64 = 0.05;

/// Electric motor temperature ceiling [°C].
pub const EV_MAX_TEMP: f64 = 80.0;

/// Combustion engine heating per cycle at full power [°C].
pub const IEC_HEAT_RATE: f64 = 0.15;

/// Combustion engine temperature ceiling [°C].
pub const IEC_MAX_TEMP: f64 = 110.0;

/// Fraction of the excess over ambient shed per idle cycle.
pub const COOL_FACTOR: f64 = 0.01;

// ─── IPC ────────────────────────────────────────────────────────────

/// Upper bound of one encoded engine message [bytes].
pub const MESSAGE_SIZE: usize = 256;

/// Messages a queue holds before senders see it full.
pub const QUEUE_DEPTH: usize = 10;

/// Capacity of the debug trace kept in shared state [bytes].
pub const DEBUG_MESSAGE_CAPACITY: usize = 127;
