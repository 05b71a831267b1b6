//! Prelude module for common re-exports.
//!
//! ```rust
//! use vmu_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    ConfigError, ConfigLoader, ControllerConfig, LogLevel, SafetyPolicy, SharedConfig,
    VehicleConfig, VmuConfig,
};

// ─── State ──────────────────────────────────────────────────────────
pub use crate::state::{EngineStatus, Pedal, PowerMode, SystemState};

// ─── Protocol ───────────────────────────────────────────────────────
pub use crate::command::{CommandType, Direction, EngineCommand, EngineKind, EngineReport};

// ─── Lifecycle ──────────────────────────────────────────────────────
pub use crate::lifecycle::RunFlags;
