//! Supervisor cycle runner.
//!
//! Each cycle has two halves around a short grace period:
//!
//! 1. **dispatch**: under the lock, apply the safety policy, run the
//!    power-mode controller and build one command per engine; then send both
//!    commands without blocking.
//! 2. **collect**: drain both response queues without blocking, feed the
//!    watchdog, then under the lock apply new responses, advance the speed
//!    model and latch `safety` if an engine went silent.
//!
//! No channel I/O happens while the lock is held.

use crate::controller::{Decision, PowerModeController};
use crate::cycle::CycleStats;
use crate::error::SupervisorError;
use crate::speed::next_speed;
use crate::watchdog::Watchdog;
use std::thread;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use vmu_common::command::{CommandType, EngineCommand, EngineKind};
use vmu_common::config::{SafetyPolicy, SupervisorConfig, VmuConfig};
use vmu_common::lifecycle::RunFlags;
use vmu_common::state::SystemState;
use vmu_shared_memory::{EngineLink, MessageChannel, ShmError, StateStore};

/// Responses drained per engine and cycle; the rest wait for the next one.
const DRAIN_LIMIT: usize = 32;

/// Message counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupervisorStats {
    /// Responses applied to the shared state.
    pub applied: u64,
    /// Responses already applied earlier (same or older `seq`).
    pub stale: u64,
    /// Requests or foreign replies found on a response queue.
    pub misrouted: u64,
    /// Commands lost to a full or failing request queue.
    pub commands_dropped: u64,
}

/// Outcome of one [`Supervisor::collect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collected {
    /// Responses drained, indexed like [`EngineKind::ALL`].
    pub responses: [usize; 2],
    /// Responses that were new and got applied.
    pub applied: usize,
    /// `safety` after this cycle.
    pub safety: bool,
}

/// Command for `kind` derived from the decided state.
///
/// `Start` wakes an engine that reports off, `SetPower` adjusts a running
/// one and `Stop` covers a released accelerator or a zero level.
pub fn engine_command(state: &SystemState, kind: EngineKind, seq: u32) -> EngineCommand {
    let (level, on) = match kind {
        EngineKind::Electric => (state.ev_power_level, state.ev_on),
        EngineKind::Combustion => (state.iec_power_level, state.iec_on),
    };
    let command = if state.accelerator && level > 0.0 {
        if on {
            CommandType::SetPower
        } else {
            CommandType::Start
        }
    } else {
        CommandType::Stop
    };
    EngineCommand::request(kind, command, seq, state.speed, level, state.brake)
        .with_accelerator(state.accelerator)
}

/// Record `reply` unless it was applied before. Returns `true` if applied.
fn apply_reply(state: &mut SystemState, reply: &EngineCommand) -> bool {
    let (ack, status) = match reply.engine {
        EngineKind::Electric => (&mut state.ev_ack_seq, &mut state.ev_status),
        EngineKind::Combustion => (&mut state.iec_ack_seq, &mut state.iec_status),
    };
    if reply.seq <= *ack {
        return false;
    }
    *ack = reply.seq;
    *status = reply.status;
    true
}

/// The vehicle management unit.
pub struct Supervisor<S, C> {
    store: S,
    links: [EngineLink<C>; 2],
    controller: PowerModeController,
    watchdog: Watchdog,
    config: SupervisorConfig,
    seq: u32,
    stats: SupervisorStats,
    cycles: CycleStats,
}

impl<S: StateStore, C: MessageChannel> Supervisor<S, C> {
    /// # Errors
    /// Returns `SupervisorError::LinkMismatch` if a link is passed in the
    /// other engine's slot.
    pub fn new(
        store: S,
        electric: EngineLink<C>,
        combustion: EngineLink<C>,
        config: &VmuConfig,
    ) -> Result<Self, SupervisorError> {
        for (expected, found) in [
            (EngineKind::Electric, electric.kind),
            (EngineKind::Combustion, combustion.kind),
        ] {
            if expected != found {
                return Err(SupervisorError::LinkMismatch { expected, found });
            }
        }
        Ok(Self {
            store,
            links: [electric, combustion],
            controller: PowerModeController::new(config.controller),
            watchdog: Watchdog::new(config.supervisor.watchdog_miss_limit),
            config: config.supervisor.clone(),
            seq: 0,
            stats: SupervisorStats::default(),
            cycles: CycleStats::new(),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Sequence number of the last dispatched cycle.
    pub fn seq(&self) -> u32 {
        self.seq
    }

    pub fn stats(&self) -> SupervisorStats {
        self.stats
    }

    pub fn cycle_stats(&self) -> &CycleStats {
        &self.cycles
    }

    pub fn watchdog(&self) -> &Watchdog {
        &self.watchdog
    }

    pub fn controller(&self) -> &PowerModeController {
        &self.controller
    }

    /// Decide this cycle's split and send one command to each engine.
    pub fn dispatch(&mut self) -> Result<Decision, SupervisorError> {
        self.seq = self.seq.wrapping_add(1);
        let seq = self.seq;
        let coast = self.config.safety_policy == SafetyPolicy::CoastToPark;
        let controller = &mut self.controller;

        let (decision, commands) = self.store.update(|state| {
            if coast && state.safety {
                state.accelerator = false;
            }
            let decision = controller.decide(state);
            let commands = EngineKind::ALL.map(|kind| engine_command(state, kind, seq));
            (decision, commands)
        })?;

        for (link, cmd) in self.links.iter().zip(&commands) {
            if !send_request(link, cmd) {
                self.stats.commands_dropped += 1;
            }
        }
        Ok(decision)
    }

    /// Drain responses, advance the speed model and run the watchdog.
    pub fn collect(&mut self) -> Result<Collected, SupervisorError> {
        let mut drained: [heapless::Vec<EngineCommand, DRAIN_LIMIT>; 2] =
            [heapless::Vec::new(), heapless::Vec::new()];

        for (link, replies) in self.links.iter().zip(drained.iter_mut()) {
            while !replies.is_full() {
                let Some(msg) = link.responses.try_recv()? else {
                    break;
                };
                if !msg.is_reply() || msg.engine != link.kind {
                    debug!("{}: unexpected {:?} on response queue", link.kind, msg.command);
                    self.stats.misrouted += 1;
                    continue;
                }
                // Capacity checked above.
                let _ = replies.push(msg);
            }
        }

        let mut tripped = false;
        for (link, replies) in self.links.iter().zip(&drained) {
            tripped |= self.watchdog.observe(link.kind, replies.len());
        }

        let (applied, raised, safety) = self.store.update(|state| {
            let mut applied = 0;
            for reply in drained.iter().flatten() {
                if apply_reply(state, reply) {
                    applied += 1;
                }
            }
            state.speed = next_speed(state.speed, state.accelerator, state.brake);
            let raised = tripped && !state.safety;
            state.safety |= tripped;
            (applied, raised, state.safety)
        })?;

        let responses = [drained[0].len(), drained[1].len()];
        let total = responses[0] + responses[1];
        self.stats.applied += applied as u64;
        self.stats.stale += (total - applied) as u64;

        if raised {
            error!(
                "watchdog: safety raised (misses electric={} combustion={}, limit {}), policy {:?}",
                self.watchdog.misses(EngineKind::Electric),
                self.watchdog.misses(EngineKind::Combustion),
                self.watchdog.limit(),
                self.config.safety_policy
            );
        }

        Ok(Collected {
            responses,
            applied,
            safety,
        })
    }

    /// Ask both engines to leave their loops.
    pub fn broadcast_end(&mut self) {
        self.seq = self.seq.wrapping_add(1);
        for link in &self.links {
            if send_request(link, &EngineCommand::end(link.kind, self.seq)) {
                info!("{}: end of run sent", link.kind);
            }
        }
    }

    fn log_status(&self) -> Result<(), SupervisorError> {
        let s = self.store.snapshot()?;
        info!(
            "cycle {}: {} speed={:.1} battery={:.1} fuel={:.2} ev={:.3} iec={:.3} gear={} safety={} | {}",
            self.seq,
            s.power_mode,
            s.speed,
            s.battery,
            s.fuel,
            s.ev_power_level,
            s.iec_power_level,
            s.iec_gear,
            s.safety,
            s.debug_message.as_str()
        );
        Ok(())
    }

    /// Run cycles until `flags` stop the process, then broadcast `End`.
    pub fn run(&mut self, flags: &RunFlags) -> Result<CycleStats, SupervisorError> {
        let period = self.config.cycle_time();
        let grace = self.config.response_grace();
        let interval = self.config.status_log_interval;
        let mut was_paused = false;

        info!(
            "Supervisor loop: cycle={}ms grace={}ms watchdog={} policy={:?}",
            self.config.cycle_time_ms,
            self.config.response_grace_ms,
            self.watchdog.limit(),
            self.config.safety_policy
        );

        while flags.is_running() {
            if flags.is_paused() {
                if !was_paused {
                    info!("Supervisor paused");
                    was_paused = true;
                }
                thread::sleep(period);
                continue;
            }
            if was_paused {
                info!("Supervisor resumed");
                was_paused = false;
            }

            let start = Instant::now();
            self.dispatch()?;
            thread::sleep(grace);
            self.collect()?;
            let work = start.elapsed();

            if self.cycles.record(work, period) {
                warn!(
                    "cycle {} overran: {}µs > {}µs",
                    self.seq,
                    work.as_micros(),
                    period.as_micros()
                );
            }
            if interval > 0 && self.cycles.cycle_count % interval == 0 {
                self.log_status()?;
            }

            if let Some(remaining) = period.checked_sub(work) {
                thread::sleep(remaining);
            }
        }

        self.broadcast_end();
        info!(
            "Supervisor stopped after {} cycles: avg={}µs max={}µs overruns={} applied={} stale={} dropped={}",
            self.cycles.cycle_count,
            self.cycles.avg_cycle_ns() / 1_000,
            self.cycles.max_cycle_ns / 1_000,
            self.cycles.overruns,
            self.stats.applied,
            self.stats.stale,
            self.stats.commands_dropped
        );
        Ok(self.cycles.clone())
    }
}

/// Non-blocking send. Returns `false` if the command was dropped.
fn send_request<C: MessageChannel>(link: &EngineLink<C>, cmd: &EngineCommand) -> bool {
    match link.requests.send(cmd) {
        Ok(()) => true,
        Err(ShmError::ChannelFull { name }) => {
            warn!("{}: request queue {name} full, seq={} dropped", link.kind, cmd.seq);
            false
        }
        Err(e) => {
            warn!("{}: failed to send seq={}: {e}", link.kind, cmd.seq);
            false
        }
    }
}
