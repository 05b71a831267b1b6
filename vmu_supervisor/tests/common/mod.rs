//! In-process vehicle: supervisor plus both engine models over memory queues.
//!
//! Each `cycle` runs the supervisor's dispatch, lets each engine handle one
//! request and then collects, which is the same order the processes follow.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use vmu_common::command::EngineKind;
use vmu_common::config::{VehicleConfig, VmuConfig};
use vmu_common::state::SystemState;
use vmu_engines::{EngineRunner, ModelLimits, ModelRegistry};
use vmu_shared_memory::{EngineLink, LocalState, MemoryChannel, StateStore};
use vmu_supervisor::Supervisor;

pub type Store = Arc<LocalState>;

pub struct Rig {
    pub supervisor: Supervisor<Store, MemoryChannel>,
    pub store: Store,
    pub electric: EngineRunner<Store, MemoryChannel>,
    pub combustion: EngineRunner<Store, MemoryChannel>,
}

impl Rig {
    pub fn new(initial: SystemState) -> Self {
        Self::with_config(initial, &VmuConfig::with_service_name("rig"))
    }

    pub fn with_config(initial: SystemState, config: &VmuConfig) -> Self {
        let store = Arc::new(LocalState::new(initial));
        let ev = EngineLink::memory(EngineKind::Electric, 16);
        let iec = EngineLink::memory(EngineKind::Combustion, 16);
        let registry =
            ModelRegistry::with_builtin().with_limits(ModelLimits::from(&config.controller));

        let electric = EngineRunner::new(
            store.clone(),
            ev.clone(),
            registry.create("electric").expect("electric model"),
        )
        .expect("electric runner");
        let combustion = EngineRunner::new(
            store.clone(),
            iec.clone(),
            registry.create("combustion").expect("combustion model"),
        )
        .expect("combustion runner");
        let supervisor = Supervisor::new(store.clone(), ev, iec, config).expect("supervisor");

        Self {
            supervisor,
            store,
            electric,
            combustion,
        }
    }

    /// One full cycle with both engines answering.
    pub fn cycle(&mut self) -> SystemState {
        self.cycle_with(true, true)
    }

    /// One cycle; a `false` engine stays silent.
    pub fn cycle_with(&mut self, electric: bool, combustion: bool) -> SystemState {
        self.supervisor.dispatch().expect("dispatch");
        if electric {
            self.electric.poll_once(Duration::ZERO).expect("electric");
        }
        if combustion {
            self.combustion.poll_once(Duration::ZERO).expect("combustion");
        }
        self.supervisor.collect().expect("collect");
        self.snapshot()
    }

    pub fn snapshot(&self) -> SystemState {
        self.store.snapshot().expect("snapshot")
    }

    /// Operator keeps the accelerator down.
    pub fn hold_accelerator(&self) {
        self.store.update(|s| s.press_accelerator()).expect("pedal");
    }

    pub fn hold_brake(&self) {
        self.store.update(|s| s.press_brake()).expect("pedal");
    }
}

/// Freshly created state with the given reserves.
pub fn vehicle(battery: f64, fuel: f64) -> SystemState {
    SystemState::initial(&VehicleConfig {
        initial_battery: battery,
        initial_fuel: fuel,
    })
}
