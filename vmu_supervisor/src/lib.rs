//! # VMU Supervisor
//!
//! Vehicle management unit for the hybrid powertrain. Owns the shared state
//! region, its semaphore and both engines' queues, and runs the 100 ms
//! decision loop:
//!
//! ```text
//!  ┌─ lock ─────────────────────┐        ┌─ lock ─────────────────────┐
//!  │ safety policy              │ send   │ apply new responses        │
//!  │ PowerModeController.decide ├──────► │ speed model                │
//!  │ build ev / iec commands    │ grace  │ watchdog → safety          │
//!  └────────────────────────────┘ drain  └────────────────────────────┘
//! ```

pub mod controller;
pub mod cycle;
pub mod error;
pub mod pedal;
pub mod speed;
pub mod supervisor;
pub mod watchdog;

pub use controller::{Decision, PowerModeController};
pub use cycle::CycleStats;
pub use error::SupervisorError;
pub use supervisor::{Collected, Supervisor, SupervisorStats, engine_command};
pub use watchdog::Watchdog;
