//! # VMU Engine Simulators
//!
//! Electric and combustion drive models plus the loop that serves the
//! supervisor's commands. Each simulator runs as its own process
//! (`vmu_engine --engine electric|combustion`), attached to the state region
//! and its two queues created by the supervisor.

pub mod combustion;
pub mod electric;
pub mod error;
pub mod model;
pub mod runner;
pub mod thermal;

pub use error::EngineError;
pub use model::{EngineModel, ModelLimits, ModelRegistry};
pub use runner::{EngineRunner, PollOutcome, RunnerStats};
