//! Engine simulator errors.

use thiserror::Error;
use vmu_common::command::EngineKind;
use vmu_shared_memory::ShmError;

/// Errors raised by the engine simulators.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Shared state or queue failure.
    #[error("shared memory: {0}")]
    Shm(#[from] ShmError),

    /// No model registered under this name.
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// A model with this name is already registered.
    #[error("Model already registered: {0}")]
    DuplicateModel(&'static str),

    /// Model and link disagree about the engine.
    #[error("model simulates {model} but link belongs to {link}")]
    KindMismatch { model: EngineKind, link: EngineKind },
}
