//! Engine simulator loop.
//!
//! Waits (bounded) for a request, applies it to the shared state under the
//! lock, then replies on the response queue with the same `seq`.

use crate::error::EngineError;
use crate::model::EngineModel;
use std::time::Duration;
use tracing::{debug, info, warn};
use vmu_common::command::{CommandType, EngineCommand, EngineKind, EngineReport};
use vmu_common::lifecycle::RunFlags;
use vmu_common::state::EngineStatus;
use vmu_shared_memory::{EngineLink, MessageChannel, ShmError, StateStore};

/// What one [`EngineRunner::poll_once`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Nothing arrived before the timeout.
    Idle,
    /// Request applied and answered.
    Handled { seq: u32 },
    /// A reply found on the request queue was moved to the response queue.
    Forwarded,
    /// Message for the other engine, dropped.
    Ignored,
    /// `End` received.
    Ended,
}

/// Counters kept by the runner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunnerStats {
    pub handled: u64,
    pub forwarded: u64,
    pub ignored: u64,
    pub replies_dropped: u64,
}

/// Drives one [`EngineModel`] from its request queue.
pub struct EngineRunner<S, C> {
    store: S,
    link: EngineLink<C>,
    model: Box<dyn EngineModel>,
    stats: RunnerStats,
}

impl<S: StateStore, C: MessageChannel> EngineRunner<S, C> {
    /// # Errors
    /// Returns `EngineError::KindMismatch` if the model does not simulate
    /// the engine the link belongs to.
    pub fn new(
        store: S,
        link: EngineLink<C>,
        model: Box<dyn EngineModel>,
    ) -> Result<Self, EngineError> {
        if model.kind() != link.kind {
            return Err(EngineError::KindMismatch {
                model: model.kind(),
                link: link.kind,
            });
        }
        Ok(Self {
            store,
            link,
            model,
            stats: RunnerStats::default(),
        })
    }

    /// Engine served by this runner.
    pub fn kind(&self) -> EngineKind {
        self.link.kind
    }

    /// Counters so far.
    pub fn stats(&self) -> RunnerStats {
        self.stats
    }

    /// Handle at most one request, waiting up to `timeout` for it.
    pub fn poll_once(&mut self, timeout: Duration) -> Result<PollOutcome, EngineError> {
        let Some(cmd) = self.link.requests.recv_timeout(timeout)? else {
            return Ok(PollOutcome::Idle);
        };

        if cmd.is_reply() {
            debug!("{}: reply seq={} on request queue, forwarding", self.kind(), cmd.seq);
            self.send_reply(&cmd);
            self.stats.forwarded += 1;
            return Ok(PollOutcome::Forwarded);
        }

        if cmd.engine != self.kind() {
            debug!("{}: dropping command for {}", self.kind(), cmd.engine);
            self.stats.ignored += 1;
            return Ok(PollOutcome::Ignored);
        }

        if cmd.command == CommandType::End {
            info!("{}: end of run requested (seq={})", self.kind(), cmd.seq);
            self.send_reply(&cmd.reply(EngineReport::Pending, EngineStatus::Ended));
            return Ok(PollOutcome::Ended);
        }

        let model = &mut self.model;
        let (report, status) = self.store.update(|state| model.apply(&cmd, state))?;
        self.send_reply(&cmd.reply(report, status));
        self.stats.handled += 1;
        Ok(PollOutcome::Handled { seq: cmd.seq })
    }

    fn send_reply(&mut self, reply: &EngineCommand) {
        match self.link.responses.send(reply) {
            Ok(()) => {}
            Err(ShmError::ChannelFull { name }) => {
                self.stats.replies_dropped += 1;
                warn!(
                    "{}: response queue {name} full, reply seq={} dropped",
                    self.kind(),
                    reply.seq
                );
            }
            Err(e) => {
                self.stats.replies_dropped += 1;
                warn!("{}: failed to send reply seq={}: {e}", self.kind(), reply.seq);
            }
        }
    }

    /// Serve requests until `End` arrives or `flags` stop the process.
    pub fn run(
        &mut self,
        flags: &RunFlags,
        poll_timeout: Duration,
        pause_nap: Duration,
    ) -> Result<RunnerStats, EngineError> {
        info!("{} engine ({}) serving requests", self.kind(), self.model.name());
        let mut was_paused = false;

        while flags.is_running() {
            if flags.is_paused() {
                if !was_paused {
                    info!("{}: paused", self.kind());
                    was_paused = true;
                }
                std::thread::sleep(pause_nap);
                continue;
            }
            if was_paused {
                info!("{}: resumed", self.kind());
                was_paused = false;
            }

            if self.poll_once(poll_timeout)? == PollOutcome::Ended {
                break;
            }
        }

        info!(
            "{} engine stopped: handled={} forwarded={} dropped_replies={}",
            self.kind(),
            self.stats.handled,
            self.stats.forwarded,
            self.stats.replies_dropped
        );
        Ok(self.stats)
    }
}
