//! Process run / pause flags.
//!
//! SIGINT and SIGTERM clear the running flag (via `ctrlc`). SIGTSTP toggles
//! a process-wide pause flag instead of stopping the process. Loops check
//! both at the top of every iteration.

use nix::libc::c_int;
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::info;

static SIGNAL_PAUSED: AtomicBool = AtomicBool::new(false);

extern "C" fn toggle_pause(_signal: c_int) {
    // Async-signal-safe: a single atomic op.
    SIGNAL_PAUSED.fetch_xor(true, Ordering::SeqCst);
}

/// Failure to install a signal handler.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("termination handler: {0}")]
    Ctrlc(#[from] ctrlc::Error),
    #[error("pause handler: {0}")]
    Sigaction(#[from] nix::Error),
}

/// Shared run / pause flags for one process.
#[derive(Debug, Clone)]
pub struct RunFlags {
    running: Arc<AtomicBool>,
    paused: Arc<AtomicBool>,
    follow_signals: bool,
}

impl Default for RunFlags {
    fn default() -> Self {
        Self::new()
    }
}

impl RunFlags {
    /// Running, not paused, not wired to signals.
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
            paused: Arc::new(AtomicBool::new(false)),
            follow_signals: false,
        }
    }

    /// Install the process signal handlers and return flags that follow them.
    ///
    /// Call once per process.
    pub fn install() -> Result<Self, LifecycleError> {
        let mut flags = Self::new();
        flags.follow_signals = true;

        let running = flags.running.clone();
        ctrlc::set_handler(move || {
            info!("Received shutdown signal");
            running.store(false, Ordering::SeqCst);
        })?;

        let action = SigAction::new(
            SigHandler::Handler(toggle_pause),
            SaFlags::SA_RESTART,
            SigSet::empty(),
        );
        // SAFETY: the handler only touches an atomic.
        unsafe { sigaction(Signal::SIGTSTP, &action) }?;

        Ok(flags)
    }

    /// Loop should keep going.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Ask every holder of these flags to stop.
    pub fn request_stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Loop should nap instead of iterating.
    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
            || (self.follow_signals && SIGNAL_PAUSED.load(Ordering::SeqCst))
    }

    /// Flip the local pause flag. Returns the new state.
    pub fn toggle_pause(&self) -> bool {
        !self.paused.fetch_xor(true, Ordering::SeqCst)
    }
}
