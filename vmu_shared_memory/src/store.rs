//! Locked access to [`SystemState`].
//!
//! State is only reachable inside an `update` closure, which runs with the
//! lock held. No reference can outlive the closure, so every read-modify-write
//! is atomic with respect to the other processes.

use crate::error::ShmResult;
use crate::region::SharedRegion;
use crate::semaphore::NamedSemaphore;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;
use vmu_common::config::IpcConfig;
use vmu_common::state::SystemState;

/// Exclusive access to the shared vehicle state.
pub trait StateStore: Send + Sync {
    /// Run `f` with the state locked. Returns whatever `f` returns.
    fn update<R>(&self, f: impl FnOnce(&mut SystemState) -> R) -> ShmResult<R>;

    /// Copy of the current state.
    fn snapshot(&self) -> ShmResult<SystemState> {
        self.update(|state| *state)
    }

    /// Number of committed updates so far.
    fn heartbeat(&self) -> u64;
}

impl<S: StateStore> StateStore for Arc<S> {
    fn update<R>(&self, f: impl FnOnce(&mut SystemState) -> R) -> ShmResult<R> {
        (**self).update(f)
    }

    fn heartbeat(&self) -> u64 {
        (**self).heartbeat()
    }
}

// ─── Cross-process store ────────────────────────────────────────────

/// State region plus the semaphore that guards it.
pub struct SharedState {
    region: SharedRegion<SystemState>,
    lock: NamedSemaphore,
}

impl SharedState {
    /// Create both resources (supervisor only).
    pub fn create(ipc: &IpcConfig, initial: SystemState) -> ShmResult<Self> {
        let region = SharedRegion::create(&ipc.state_region, initial)?;
        let lock = NamedSemaphore::create(&ipc.state_lock)?;
        info!(
            "Shared state ready: region={} lock={}",
            ipc.state_region, ipc.state_lock
        );
        Ok(Self { region, lock })
    }

    /// Attach to resources created by the supervisor.
    pub fn open(ipc: &IpcConfig) -> ShmResult<Self> {
        let region = SharedRegion::open(&ipc.state_region)?;
        let lock = NamedSemaphore::open(&ipc.state_lock)?;
        Ok(Self { region, lock })
    }

    /// Whether this handle owns (and will unlink) the resources.
    pub fn is_owner(&self) -> bool {
        self.region.is_owner()
    }
}

impl StateStore for SharedState {
    fn update<R>(&self, f: impl FnOnce(&mut SystemState) -> R) -> ShmResult<R> {
        let _guard = self.lock.acquire()?;
        // SAFETY: the semaphore is held until `_guard` drops.
        let state = unsafe { &mut *self.region.payload() };
        let result = f(state);
        self.region.beat();
        Ok(result)
    }

    fn heartbeat(&self) -> u64 {
        self.region.heartbeat()
    }
}

// ─── In-process store ───────────────────────────────────────────────

/// Same contract, backed by a mutex. Used for tests and single-process runs.
#[derive(Debug, Default)]
pub struct LocalState {
    state: Mutex<SystemState>,
    heartbeat: AtomicU64,
}

impl LocalState {
    pub fn new(initial: SystemState) -> Self {
        Self {
            state: Mutex::new(initial),
            heartbeat: AtomicU64::new(0),
        }
    }
}

impl StateStore for LocalState {
    fn update<R>(&self, f: impl FnOnce(&mut SystemState) -> R) -> ShmResult<R> {
        let mut state = self.state.lock();
        let result = f(&mut state);
        self.heartbeat.fetch_add(1, Ordering::AcqRel);
        Ok(result)
    }

    fn heartbeat(&self) -> u64 {
        self.heartbeat.load(Ordering::Acquire)
    }
}
