//! Supervisor errors.

use thiserror::Error;
use vmu_common::command::EngineKind;
use vmu_common::config::ConfigError;
use vmu_common::lifecycle::LifecycleError;
use vmu_shared_memory::ShmError;

/// Errors raised by the supervisor.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// Shared state or queue failure.
    #[error("shared memory: {0}")]
    Shm(#[from] ShmError),

    /// Configuration could not be loaded or validated.
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    /// Signal handlers could not be installed.
    #[error("lifecycle: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// Operator input thread could not be started.
    #[error("pedal input: {0}")]
    Io(#[from] std::io::Error),

    /// An engine link was passed in the wrong slot.
    #[error("expected {expected} link, got {found}")]
    LinkMismatch {
        expected: EngineKind,
        found: EngineKind,
    },
}
