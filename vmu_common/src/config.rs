//! Configuration loading traits and types.
//!
//! Every VMU process reads the same TOML file. Only `[shared]` is required;
//! all other sections fall back to the defaults in [`crate::consts`].
//!
//! # Usage
//!
//! ```rust,no_run
//! use vmu_common::config::{ConfigLoader, VmuConfig, ConfigError};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = VmuConfig::load(Path::new("config/vmu.toml"))?;
//!     config.validate()?;
//!     println!("Service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use crate::consts::{
    BATTERY_CRITICAL_THRESHOLD, CHARGE_FULL, CYCLE_TIME_MS, EV_MAX_RPM, EV_ONLY_SPEED_LIMIT,
    FUEL_CRITICAL_THRESHOLD, MAX_BATTERY, MAX_FUEL, MAX_SPEED, MESSAGE_SIZE, QUEUE_DEPTH,
    RAMP_STEP, WATCHDOG_MISS_LIMIT,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, per-cycle decision traces.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

/// Common configuration fields shared across all VMU processes.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "vmu-bench-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Names of the inter-process resources created by the supervisor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IpcConfig {
    /// State region name (file under `/dev/shm`).
    pub state_region: String,
    /// Named semaphore guarding the state region.
    pub state_lock: String,
    /// Supervisor → electric engine queue.
    pub ev_requests: String,
    /// Electric engine → supervisor queue.
    pub ev_responses: String,
    /// Supervisor → combustion engine queue.
    pub iec_requests: String,
    /// Combustion engine → supervisor queue.
    pub iec_responses: String,
    /// Maximum encoded message size [bytes].
    pub message_size: usize,
    /// Queue depth [messages].
    pub queue_depth: usize,
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            state_region: "vmu_state".to_string(),
            state_lock: "/vmu_state_lock".to_string(),
            ev_requests: "/vmu_ev_req".to_string(),
            ev_responses: "/vmu_ev_rsp".to_string(),
            iec_requests: "/vmu_iec_req".to_string(),
            iec_responses: "/vmu_iec_rsp".to_string(),
            message_size: MESSAGE_SIZE,
            queue_depth: QUEUE_DEPTH,
        }
    }
}

impl IpcConfig {
    /// Derive a private set of names, e.g. for parallel test runs.
    pub fn with_suffix(suffix: &str) -> Self {
        let base = Self::default();
        Self {
            state_region: format!("{}_{suffix}", base.state_region),
            state_lock: format!("{}_{suffix}", base.state_lock),
            ev_requests: format!("{}_{suffix}", base.ev_requests),
            ev_responses: format!("{}_{suffix}", base.ev_responses),
            iec_requests: format!("{}_{suffix}", base.iec_requests),
            iec_responses: format!("{}_{suffix}", base.iec_responses),
            ..base
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.state_region.is_empty() || self.state_region.contains('/') {
            return Err(ConfigError::ValidationError(
                "ipc.state_region must be a bare, non-empty name".to_string(),
            ));
        }
        for (field, name) in [
            ("state_lock", &self.state_lock),
            ("ev_requests", &self.ev_requests),
            ("ev_responses", &self.ev_responses),
            ("iec_requests", &self.iec_requests),
            ("iec_responses", &self.iec_responses),
        ] {
            if name.len() < 2 || !name.starts_with('/') || name[1..].contains('/') {
                return Err(ConfigError::ValidationError(format!(
                    "ipc.{field} must look like \"/name\", got {name:?}"
                )));
            }
        }
        if self.message_size == 0 || self.queue_depth == 0 {
            return Err(ConfigError::ValidationError(
                "ipc.message_size and ipc.queue_depth must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// What the supervisor does once the watchdog has raised `safety`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SafetyPolicy {
    /// Report once, keep driving.
    #[default]
    Alert,
    /// Report and force the accelerator off until the vehicle parks.
    CoastToPark,
}

/// Supervisor loop settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Cycle period [ms].
    pub cycle_time_ms: u64,
    /// Pause between sending commands and draining responses [ms].
    pub response_grace_ms: u64,
    /// Consecutive silent cycles tolerated per engine.
    pub watchdog_miss_limit: u32,
    /// Reaction to a raised `safety` flag.
    pub safety_policy: SafetyPolicy,
    /// Emit a status line every N cycles (0 disables it).
    pub status_log_interval: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            cycle_time_ms: CYCLE_TIME_MS,
            response_grace_ms: 10,
            watchdog_miss_limit: WATCHDOG_MISS_LIMIT,
            safety_policy: SafetyPolicy::default(),
            status_log_interval: 10,
        }
    }
}

impl SupervisorConfig {
    /// Cycle period as `Duration`.
    pub fn cycle_time(&self) -> Duration {
        Duration::from_millis(self.cycle_time_ms)
    }

    /// Response grace period as `Duration`.
    pub fn response_grace(&self) -> Duration {
        Duration::from_millis(self.response_grace_ms)
    }
}

/// Power-mode decision thresholds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ControllerConfig {
    /// Electric-only / hybrid split speed [km/h].
    pub split_speed: f64,
    /// Battery critical threshold [%].
    pub battery_critical: f64,
    /// Fuel empty threshold [%].
    pub fuel_critical: f64,
    /// Battery level treated as full [%].
    pub charge_full: f64,
    /// Ramp step per cycle.
    pub ramp_step: f64,
    /// Electric RPM ceiling used to cap the low-speed ramp.
    pub ev_max_rpm: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            split_speed: EV_ONLY_SPEED_LIMIT,
            battery_critical: BATTERY_CRITICAL_THRESHOLD,
            fuel_critical: FUEL_CRITICAL_THRESHOLD,
            charge_full: CHARGE_FULL,
            ramp_step: RAMP_STEP,
            ev_max_rpm: EV_MAX_RPM,
        }
    }
}

impl ControllerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.split_speed > 0.0 && self.split_speed < MAX_SPEED) {
            return Err(ConfigError::ValidationError(format!(
                "controller.split_speed must be in (0, {MAX_SPEED})"
            )));
        }
        if !(0.0..self.charge_full).contains(&self.battery_critical) {
            return Err(ConfigError::ValidationError(
                "controller.battery_critical must be in [0, charge_full)".to_string(),
            ));
        }
        if !(self.charge_full > 0.0 && self.charge_full <= MAX_BATTERY) {
            return Err(ConfigError::ValidationError(format!(
                "controller.charge_full must be in (0, {MAX_BATTERY}]"
            )));
        }
        if !(0.0..MAX_FUEL).contains(&self.fuel_critical) {
            return Err(ConfigError::ValidationError(
                "controller.fuel_critical must be in [0, max fuel)".to_string(),
            ));
        }
        if !(self.ramp_step > 0.0 && self.ramp_step <= 1.0) {
            return Err(ConfigError::ValidationError(
                "controller.ramp_step must be in (0, 1]".to_string(),
            ));
        }
        if self.ev_max_rpm <= 0.0 {
            return Err(ConfigError::ValidationError(
                "controller.ev_max_rpm must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Initial vehicle reserves.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VehicleConfig {
    /// Battery at startup [%].
    pub initial_battery: f64,
    /// Fuel at startup [%].
    pub initial_fuel: f64,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            initial_battery: MAX_BATTERY,
            initial_fuel: MAX_FUEL,
        }
    }
}

/// Engine simulator loop settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Bounded wait for the next request [ms].
    pub poll_timeout_ms: u64,
    /// Nap length while paused [ms].
    pub pause_nap_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_timeout_ms: 50,
            pause_nap_ms: 50,
        }
    }
}

impl EngineConfig {
    /// Request wait as `Duration`.
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    /// Pause nap as `Duration`.
    pub fn pause_nap(&self) -> Duration {
        Duration::from_millis(self.pause_nap_ms)
    }
}

/// Complete VMU configuration file.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// service_name = "vmu"
///
/// [supervisor]
/// safety_policy = "coast_to_park"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmuConfig {
    /// Logging and identity.
    pub shared: SharedConfig,
    /// Resource names.
    #[serde(default)]
    pub ipc: IpcConfig,
    /// Decision loop.
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    /// Power-mode thresholds.
    #[serde(default)]
    pub controller: ControllerConfig,
    /// Initial reserves.
    #[serde(default)]
    pub vehicle: VehicleConfig,
    /// Engine simulator loop.
    #[serde(default)]
    pub engine: EngineConfig,
}

impl VmuConfig {
    /// Defaults for every section, with the given service name.
    pub fn with_service_name(name: &str) -> Self {
        Self {
            shared: SharedConfig {
                log_level: LogLevel::default(),
                service_name: name.to_string(),
            },
            ipc: IpcConfig::default(),
            supervisor: SupervisorConfig::default(),
            controller: ControllerConfig::default(),
            vehicle: VehicleConfig::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.ipc.validate()?;
        self.controller.validate()?;

        if self.supervisor.cycle_time_ms == 0 {
            return Err(ConfigError::ValidationError(
                "supervisor.cycle_time_ms must be positive".to_string(),
            ));
        }
        if self.supervisor.response_grace_ms >= self.supervisor.cycle_time_ms {
            return Err(ConfigError::ValidationError(
                "supervisor.response_grace_ms must be shorter than the cycle".to_string(),
            ));
        }
        if self.supervisor.watchdog_miss_limit == 0 {
            return Err(ConfigError::ValidationError(
                "supervisor.watchdog_miss_limit must be at least 1".to_string(),
            ));
        }
        if !(0.0..=MAX_BATTERY).contains(&self.vehicle.initial_battery)
            || !(0.0..=MAX_FUEL).contains(&self.vehicle.initial_fuel)
        {
            return Err(ConfigError::ValidationError(
                "vehicle reserves must lie within [0, 100]".to_string(),
            ));
        }
        if self.engine.poll_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "engine.poll_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation: any serde-deserializable struct can be loaded.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
