//! VMU Common Library
//!
//! Shared constants, the shared vehicle state layout, the engine message
//! types and configuration loading for all VMU workspace crates.
//!
//! # Module Structure
//!
//! - [`consts`] - Physical limits, thresholds and model coefficients
//! - [`config`] - Configuration loading traits and types
//! - [`state`] - `SystemState`, the record shared by all three processes
//! - [`command`] - `EngineCommand` exchanged between supervisor and engines
//! - [`physics`] - Small drivetrain helpers shared by the models
//! - [`lifecycle`] - Process run / pause flags driven by signals
//! - [`logging`] - Tracing subscriber setup shared by the binaries
//! - [`prelude`] - Common re-exports for convenience

pub mod command;
pub mod config;
pub mod consts;
pub mod lifecycle;
pub mod logging;
pub mod physics;
pub mod prelude;
pub mod state;
