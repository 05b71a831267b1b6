//! # VMU Shared Memory
//!
//! Inter-process plumbing for the vehicle management unit:
//!
//! - [`SharedRegion`]: a typed, header-checked mapping under `/dev/shm`
//! - [`NamedSemaphore`]: binary POSIX semaphore used as a cross-process mutex
//! - [`StateStore`]: closure-scoped, locked access to `SystemState`, backed
//!   either by [`SharedState`] (region + semaphore) or [`LocalState`]
//! - [`MessageChannel`]: one-way engine command queues, backed by POSIX
//!   message queues ([`MqChannel`]) or in-process ([`MemoryChannel`])
//!
//! ```text
//! ┌──────────────┐  requests   ┌──────────────┐
//! │  supervisor  ├────────────►│   engine     │
//! │              │◄────────────┤  simulator   │
//! └──────┬───────┘  responses  └──────┬───────┘
//!        │        ┌───────────┐       │
//!        └───────►│ SystemState│◄─────┘
//!         sem_wait└───────────┘ sem_wait
//! ```
//!
//! The supervisor creates every resource and unlinks them when its handles
//! drop. Engine processes open existing resources and fail fast otherwise.

pub mod channel;
pub mod error;
pub mod platform;
pub mod region;
pub mod semaphore;
pub mod store;

pub use channel::{EngineLink, MemoryChannel, MessageChannel, MqChannel, ReceiveMode};
pub use error::{ShmError, ShmResult};
pub use region::{SharedRegion, struct_version_hash};
pub use semaphore::{NamedSemaphore, SemaphoreGuard};
pub use store::{LocalState, SharedState, StateStore};
