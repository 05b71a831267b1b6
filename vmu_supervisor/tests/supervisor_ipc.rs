//! Supervisor and both engines over real shared memory and POSIX queues

use std::thread;
use std::time::Duration;
use vmu_common::command::EngineKind;
use vmu_common::config::{IpcConfig, VmuConfig};
use vmu_common::lifecycle::RunFlags;
use vmu_common::state::SystemState;
use vmu_engines::{EngineRunner, ModelLimits, ModelRegistry, RunnerStats};
use vmu_shared_memory::{EngineLink, SharedState, StateStore};
use vmu_supervisor::Supervisor;

const POLL: Duration = Duration::from_millis(20);

fn spawn_engine(kind: EngineKind, config: &VmuConfig) -> thread::JoinHandle<RunnerStats> {
    let ipc = config.ipc.clone();
    let limits = ModelLimits::from(&config.controller);
    thread::spawn(move || {
        let store = SharedState::open(&ipc).expect("open state");
        let link = EngineLink::open(kind, &ipc).expect("open queues");
        let model = ModelRegistry::with_builtin()
            .with_limits(limits)
            .create(kind.as_str())
            .expect("model");
        let mut runner = EngineRunner::new(store, link, model).expect("runner");
        runner.run(&RunFlags::new(), POLL, POLL).expect("run")
    })
}

#[test]
fn test_supervisor_drives_engine_processes() {
    let mut config = VmuConfig::with_service_name("ipc-test");
    config.ipc = IpcConfig::with_suffix(&format!("sup_{}", std::process::id()));
    config.supervisor.cycle_time_ms = 20;
    config.supervisor.response_grace_ms = 5;
    config.supervisor.watchdog_miss_limit = 50;
    config.supervisor.status_log_interval = 0;

    let store = SharedState::create(&config.ipc, SystemState::initial(&config.vehicle))
        .expect("create state");
    let electric = EngineLink::create(EngineKind::Electric, &config.ipc).expect("ev queues");
    let combustion = EngineLink::create(EngineKind::Combustion, &config.ipc).expect("iec queues");

    let engines = [
        spawn_engine(EngineKind::Electric, &config),
        spawn_engine(EngineKind::Combustion, &config),
    ];

    let mut supervisor = Supervisor::new(store, electric, combustion, &config).expect("supervisor");
    supervisor.store().update(|s| s.press_accelerator()).unwrap();

    let flags = RunFlags::new();
    let stopper = {
        let flags = flags.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(800));
            flags.request_stop();
        })
    };

    let cycles = supervisor.run(&flags).expect("run");
    stopper.join().unwrap();

    for engine in engines {
        let stats = engine.join().expect("engine thread");
        assert!(stats.handled > 0);
    }

    assert!(cycles.cycle_count >= 10);
    let state = supervisor.store().snapshot().unwrap();
    assert!(state.speed > 0.0);
    assert!(state.ev_ack_seq > 0);
    assert!(state.iec_ack_seq > 0);
    assert!(state.battery < 100.0);
    assert!(!state.safety);
    assert!(state.check_limits().is_ok());
    assert!(supervisor.stats().applied > 0);
}
