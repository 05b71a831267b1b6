//! Operator pedal input.
//!
//! One line per input: `0` neutral, `1` accelerate, `2` brake. Each accepted
//! line is applied to the shared state under the lock; anything else is
//! logged and skipped.

use std::io::{self, BufRead};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};
use vmu_common::lifecycle::RunFlags;
use vmu_common::state::Pedal;
use vmu_shared_memory::{ShmResult, StateStore};

/// Apply one input line. Returns the pedal applied, if the line was valid.
pub fn apply_line<S: StateStore>(store: &S, line: &str) -> ShmResult<Option<Pedal>> {
    if line.trim().is_empty() {
        return Ok(None);
    }
    match line.parse::<Pedal>() {
        Ok(pedal) => {
            store.update(|state| state.apply_pedal(pedal))?;
            debug!("pedal: {pedal:?}");
            Ok(Some(pedal))
        }
        Err(e) => {
            warn!("pedal: {e}");
            Ok(None)
        }
    }
}

/// Read lines from `reader` until EOF or shutdown. Returns the number of
/// inputs applied.
pub fn read_pedals<S: StateStore, R: BufRead>(store: &S, reader: R, flags: &RunFlags) -> usize {
    let mut applied = 0;
    for line in reader.lines() {
        if !flags.is_running() {
            break;
        }
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("pedal: read failed: {e}");
                break;
            }
        };
        match apply_line(store, &line) {
            Ok(Some(_)) => applied += 1,
            Ok(None) => {}
            Err(e) => {
                warn!("pedal: state update failed: {e}");
                break;
            }
        }
    }
    applied
}

/// Read pedal input from stdin on a background thread.
///
/// The thread blocks on stdin and is not joined at shutdown; it must hold
/// its own store handle, not the one that owns the shared resources.
pub fn spawn_stdin_reader<S>(store: S, flags: RunFlags) -> io::Result<JoinHandle<usize>>
where
    S: StateStore + 'static,
{
    thread::Builder::new()
        .name("pedal".to_string())
        .spawn(move || {
            info!("Pedal input ready: 0 = neutral, 1 = accelerate, 2 = brake");
            let applied = read_pedals(&store, io::stdin().lock(), &flags);
            debug!("pedal input closed after {applied} inputs");
            applied
        })
}
