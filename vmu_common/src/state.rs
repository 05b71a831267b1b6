//! Shared vehicle state.
//!
//! [`SystemState`] is mapped in place into the shared region, so it is
//! `#[repr(C)]`, `Copy` and holds no pointers. Every field is written under
//! the state lock; see `vmu_shared_memory::StateStore`.

use crate::config::VehicleConfig;
use crate::consts::{
    AMBIENT_TEMP, DEBUG_MESSAGE_CAPACITY, MAX_BATTERY, MAX_FUEL, MAX_SPEED, MIN_SPEED,
};
use core::fmt;
use serde::{Deserialize, Serialize};
use static_assertions::{const_assert, const_assert_eq};
use std::str::FromStr;
use thiserror::Error;

// ─── Enumerations ───────────────────────────────────────────────────

/// Power arbitration mode chosen by the supervisor.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PowerMode {
    /// Electric motor only.
    #[default]
    ElectricOnly = 0,
    /// Both engines share the load.
    Hybrid = 1,
    /// Combustion engine only.
    CombustionOnly = 2,
    /// Brake pressed while moving.
    RegenerativeBraking = 3,
    /// Stationary, battery full.
    Parked = 4,
    /// Stationary and charging.
    ChargingIdle = 5,
}

impl PowerMode {
    /// Upper-case label used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ElectricOnly => "ELECTRIC_ONLY",
            Self::Hybrid => "HYBRID",
            Self::CombustionOnly => "COMBUSTION_ONLY",
            Self::RegenerativeBraking => "REGENERATIVE_BRAKING",
            Self::Parked => "PARKED",
            Self::ChargingIdle => "CHARGING_IDLE",
        }
    }
}

impl fmt::Display for PowerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last status token reported by an engine.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EngineStatus {
    /// Not delivering power.
    #[default]
    Idle = 0,
    /// Delivering power.
    Running = 1,
    /// Electric only: stationary charge.
    Charging = 2,
    /// Electric only: recovering energy under braking.
    Regenerating = 3,
    /// Reserve (battery or fuel) exhausted.
    Depleted = 4,
    /// Acknowledged shutdown.
    Ended = 5,
}

impl EngineStatus {
    /// Lower-case label used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Charging => "charging",
            Self::Regenerating => "regenerating",
            Self::Depleted => "depleted",
            Self::Ended => "ended",
        }
    }
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Operator input ─────────────────────────────────────────────────

/// Driver pedal input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pedal {
    /// `0`: release both pedals.
    Neutral,
    /// `1`: accelerator.
    Accelerate,
    /// `2`: brake.
    Brake,
}

/// Rejected operator input line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown pedal input {0:?} (expected 0, 1 or 2)")]
pub struct PedalParseError(pub String);

impl FromStr for Pedal {
    type Err = PedalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "0" => Ok(Self::Neutral),
            "1" => Ok(Self::Accelerate),
            "2" => Ok(Self::Brake),
            other => Err(PedalParseError(other.to_string())),
        }
    }
}

// ─── Debug trace ────────────────────────────────────────────────────

/// Fixed-capacity UTF-8 text stored inline in shared memory.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct DebugMessage {
    len: u8,
    bytes: [u8; DEBUG_MESSAGE_CAPACITY],
}

const_assert!(DEBUG_MESSAGE_CAPACITY <= u8::MAX as usize);

impl DebugMessage {
    /// Empty message.
    pub const EMPTY: Self = Self {
        len: 0,
        bytes: [0; DEBUG_MESSAGE_CAPACITY],
    };

    /// Replace the content, truncating on a char boundary.
    pub fn set(&mut self, text: &str) {
        let mut end = text.len().min(DEBUG_MESSAGE_CAPACITY);
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        self.bytes[..end].copy_from_slice(&text.as_bytes()[..end]);
        self.len = end as u8;
    }

    /// Replace the content with formatted text without allocating.
    ///
    /// Borrows only this field, so the arguments may read sibling fields of
    /// the owning [`SystemState`].
    pub fn format(&mut self, args: fmt::Arguments<'_>) {
        use fmt::Write;
        let mut text: heapless::String<DEBUG_MESSAGE_CAPACITY> = heapless::String::new();
        // Overflow keeps the prefix that fit.
        let _ = text.write_fmt(args);
        self.set(&text);
    }

    /// Current content. A corrupted length yields an empty string.
    pub fn as_str(&self) -> &str {
        let len = (self.len as usize).min(DEBUG_MESSAGE_CAPACITY);
        core::str::from_utf8(&self.bytes[..len]).unwrap_or("")
    }
}

impl fmt::Debug for DebugMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

// ─── Shared state ───────────────────────────────────────────────────

/// The single record shared by the supervisor and both engine simulators.
///
/// All-zero bytes form a valid value, so a freshly sized region can be
/// reinterpreted before it is initialised.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemState {
    // ── Continuous quantities ──
    /// Vehicle speed [km/h].
    pub speed: f64,
    /// Electric motor speed [rpm].
    pub rpm_ev: f64,
    /// Combustion engine speed [rpm].
    pub rpm_iec: f64,
    /// Battery charge [%].
    pub battery: f64,
    /// Fuel level [%].
    pub fuel: f64,
    /// Electric share of demanded power [0, 1].
    pub ev_power_level: f64,
    /// Combustion share of demanded power [0, 1].
    pub iec_power_level: f64,
    /// Electric motor temperature [°C].
    pub temp_ev: f64,
    /// Combustion engine temperature [°C].
    pub temp_iec: f64,

    // ── Response bookkeeping ──
    /// Newest electric response sequence applied.
    pub ev_ack_seq: u32,
    /// Newest combustion response sequence applied.
    pub iec_ack_seq: u32,

    // ── Discrete state ──
    pub power_mode: PowerMode,
    pub ev_status: EngineStatus,
    pub iec_status: EngineStatus,
    /// Combustion gear, 1-based (0 before the first report).
    pub iec_gear: u8,

    // ── Flags ──
    pub accelerator: bool,
    pub brake: bool,
    /// Written only by the electric simulator.
    pub ev_on: bool,
    /// Written only by the combustion simulator.
    pub iec_on: bool,
    /// Sticky watchdog flag.
    pub safety: bool,
    /// Ramp toward electric in progress.
    pub transition_in_progress_ev: bool,
    /// Ramp toward combustion in progress.
    pub transition_in_progress_iec: bool,

    /// Last decision trace.
    pub debug_message: DebugMessage,
}

const_assert_eq!(core::mem::size_of::<SystemState>(), 224);
const_assert!(core::mem::align_of::<SystemState>() <= 64);

/// A state field outside its permitted range.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum LimitViolation {
    #[error("speed {0} out of range")]
    Speed(f64),
    #[error("battery {0} out of range")]
    Battery(f64),
    #[error("fuel {0} out of range")]
    Fuel(f64),
    #[error("power level {0} outside [0, 1]")]
    PowerLevel(f64),
    #[error("negative rpm {0}")]
    Rpm(f64),
    #[error("accelerator and brake pressed together")]
    PedalConflict,
}

impl SystemState {
    /// All-zero state.
    pub const fn zeroed() -> Self {
        Self {
            speed: 0.0,
            rpm_ev: 0.0,
            rpm_iec: 0.0,
            battery: 0.0,
            fuel: 0.0,
            ev_power_level: 0.0,
            iec_power_level: 0.0,
            temp_ev: 0.0,
            temp_iec: 0.0,
            ev_ack_seq: 0,
            iec_ack_seq: 0,
            power_mode: PowerMode::ElectricOnly,
            ev_status: EngineStatus::Idle,
            iec_status: EngineStatus::Idle,
            iec_gear: 0,
            accelerator: false,
            brake: false,
            ev_on: false,
            iec_on: false,
            safety: false,
            transition_in_progress_ev: false,
            transition_in_progress_iec: false,
            debug_message: DebugMessage::EMPTY,
        }
    }

    /// State written by the supervisor when it creates the region.
    pub fn initial(vehicle: &VehicleConfig) -> Self {
        let mut state = Self::zeroed();
        state.battery = vehicle.initial_battery.clamp(0.0, MAX_BATTERY);
        state.fuel = vehicle.initial_fuel.clamp(0.0, MAX_FUEL);
        state.temp_ev = AMBIENT_TEMP;
        state.temp_iec = AMBIENT_TEMP;
        state.power_mode = PowerMode::Parked;
        state.debug_message.set("startup");
        state
    }

    // ── Pedals ──

    /// Press the accelerator (releases the brake).
    pub fn press_accelerator(&mut self) {
        self.accelerator = true;
        self.brake = false;
    }

    /// Press the brake (releases the accelerator).
    pub fn press_brake(&mut self) {
        self.brake = true;
        self.accelerator = false;
    }

    /// Release both pedals.
    pub fn release_pedals(&mut self) {
        self.accelerator = false;
        self.brake = false;
    }

    /// Apply one operator input.
    pub fn apply_pedal(&mut self, pedal: Pedal) {
        match pedal {
            Pedal::Neutral => self.release_pedals(),
            Pedal::Accelerate => self.press_accelerator(),
            Pedal::Brake => self.press_brake(),
        }
    }

    // ── Diagnostics ──

    /// Sum of both power levels. Drifts from 1 during some ramps.
    pub fn power_sum(&self) -> f64 {
        self.ev_power_level + self.iec_power_level
    }

    /// Check every ranged field.
    ///
    /// # Errors
    ///
    /// Returns the first field found outside its range.
    pub fn check_limits(&self) -> Result<(), LimitViolation> {
        if !(MIN_SPEED..=MAX_SPEED).contains(&self.speed) {
            return Err(LimitViolation::Speed(self.speed));
        }
        if !(0.0..=MAX_BATTERY).contains(&self.battery) {
            return Err(LimitViolation::Battery(self.battery));
        }
        if !(0.0..=MAX_FUEL).contains(&self.fuel) {
            return Err(LimitViolation::Fuel(self.fuel));
        }
        for level in [self.ev_power_level, self.iec_power_level] {
            if !(0.0..=1.0).contains(&level) {
                return Err(LimitViolation::PowerLevel(level));
            }
        }
        for rpm in [self.rpm_ev, self.rpm_iec] {
            if rpm < 0.0 || rpm.is_nan() {
                return Err(LimitViolation::Rpm(rpm));
            }
        }
        if self.accelerator && self.brake {
            return Err(LimitViolation::PedalConflict);
        }
        Ok(())
    }
}

impl Default for SystemState {
    fn default() -> Self {
        Self::zeroed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroed_bytes_are_valid_state() {
        let bytes = [0u8; core::mem::size_of::<SystemState>()];
        // SAFETY: every field of SystemState accepts the all-zero pattern.
        let state: SystemState = unsafe { core::mem::transmute(bytes) };
        assert_eq!(state, SystemState::zeroed());
        assert_eq!(state.power_mode, PowerMode::ElectricOnly);
        assert_eq!(state.debug_message.as_str(), "");
    }

    #[test]
    fn test_initial_state() {
        let state = SystemState::initial(&VehicleConfig::default());
        assert!((state.battery - 100.0).abs() < f64::EPSILON);
        assert!((state.fuel - 100.0).abs() < f64::EPSILON);
        assert_eq!(state.power_mode, PowerMode::Parked);
        assert!(state.check_limits().is_ok());
    }

    #[test]
    fn test_initial_state_clamps_reserves() {
        let state = SystemState::initial(&VehicleConfig {
            initial_battery: 150.0,
            initial_fuel: -3.0,
        });
        assert!((state.battery - MAX_BATTERY).abs() < f64::EPSILON);
        assert!(state.fuel.abs() < f64::EPSILON);
    }

    #[test]
    fn test_pedals_mutually_exclusive() {
        let mut state = SystemState::zeroed();
        state.press_accelerator();
        assert!(state.accelerator && !state.brake);
        state.press_brake();
        assert!(!state.accelerator && state.brake);
        state.apply_pedal(Pedal::Accelerate);
        assert!(state.accelerator && !state.brake);
        state.apply_pedal(Pedal::Neutral);
        assert!(!state.accelerator && !state.brake);
    }

    #[test]
    fn test_pedal_parse() {
        assert_eq!("0".parse::<Pedal>(), Ok(Pedal::Neutral));
        assert_eq!("1\n".parse::<Pedal>(), Ok(Pedal::Accelerate));
        assert_eq!(" 2 ".parse::<Pedal>(), Ok(Pedal::Brake));
        assert!("3".parse::<Pedal>().is_err());
        assert!("".parse::<Pedal>().is_err());
    }

    #[test]
    fn test_debug_message_truncates_on_char_boundary() {
        let mut msg = DebugMessage::EMPTY;
        let long = "é".repeat(100); // 200 bytes
        msg.set(&long);
        assert_eq!(msg.as_str().len(), 126);
        assert!(msg.as_str().chars().all(|c| c == 'é'));

        msg.set("short");
        assert_eq!(msg.as_str(), "short");
    }

    #[test]
    fn test_format_reads_sibling_fields() {
        let mut state = SystemState::zeroed();
        state.ev_power_level = 0.125;
        state.battery = 42.0;
        state.debug_message.format(format_args!(
            "ramp ev={:.3} battery={:.1}",
            state.ev_power_level, state.battery
        ));
        assert_eq!(state.debug_message.as_str(), "ramp ev=0.125 battery=42.0");
    }

    #[test]
    fn test_format_keeps_prefix_on_overflow() {
        let chunk = "a".repeat(100);
        let mut msg = DebugMessage::EMPTY;
        msg.format(format_args!("{chunk}{chunk}"));
        assert_eq!(msg.as_str(), chunk);
    }

    #[test]
    fn test_check_limits_reports_violations() {
        let mut state = SystemState::initial(&VehicleConfig::default());
        state.speed = 250.0;
        assert_eq!(state.check_limits(), Err(LimitViolation::Speed(250.0)));

        state.speed = 10.0;
        state.ev_power_level = 1.2;
        assert_eq!(state.check_limits(), Err(LimitViolation::PowerLevel(1.2)));

        state.ev_power_level = 1.0;
        state.accelerator = true;
        state.brake = true;
        assert_eq!(state.check_limits(), Err(LimitViolation::PedalConflict));
    }

    #[test]
    fn test_power_mode_labels() {
        assert_eq!(PowerMode::ChargingIdle.to_string(), "CHARGING_IDLE");
        assert_eq!(PowerMode::RegenerativeBraking as u8, 3);
    }
}
