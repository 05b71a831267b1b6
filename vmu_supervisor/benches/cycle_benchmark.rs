//! Supervisor cycle benchmarks
//!
//! Decision logic alone, and a full dispatch / engine / collect cycle over
//! in-process queues.

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;
use vmu_common::command::EngineKind;
use vmu_common::config::{VehicleConfig, VmuConfig};
use vmu_common::state::SystemState;
use vmu_engines::{EngineRunner, ModelRegistry};
use vmu_shared_memory::{EngineLink, LocalState, StateStore};
use vmu_supervisor::{PowerModeController, Supervisor};

fn bench_decide(c: &mut Criterion) {
    let mut controller = PowerModeController::default();
    let mut state = SystemState::initial(&VehicleConfig::default());
    state.speed = 80.0;
    state.press_accelerator();

    c.bench_function("controller_decide_hybrid", |b| {
        b.iter(|| black_box(controller.decide(black_box(&mut state))));
    });
}

fn bench_full_cycle(c: &mut Criterion) {
    let store = Arc::new(LocalState::new(SystemState::initial(&VehicleConfig::default())));
    let ev = EngineLink::memory(EngineKind::Electric, 16);
    let iec = EngineLink::memory(EngineKind::Combustion, 16);
    let registry = ModelRegistry::with_builtin();
    let mut electric =
        EngineRunner::new(store.clone(), ev.clone(), registry.create("electric").unwrap()).unwrap();
    let mut combustion =
        EngineRunner::new(store.clone(), iec.clone(), registry.create("combustion").unwrap()).unwrap();
    let mut supervisor =
        Supervisor::new(store.clone(), ev, iec, &VmuConfig::with_service_name("bench")).unwrap();
    store.update(|s| s.press_accelerator()).unwrap();

    c.bench_function("supervisor_cycle_in_process", |b| {
        b.iter(|| {
            supervisor.dispatch().unwrap();
            electric.poll_once(Duration::ZERO).unwrap();
            combustion.poll_once(Duration::ZERO).unwrap();
            black_box(supervisor.collect().unwrap())
        });
    });
}

criterion_group!(benches, bench_decide, bench_full_cycle);
criterion_main!(benches);
