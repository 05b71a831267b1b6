//! End-to-end driving scenarios with the real engine models.

mod common;

use common::{Rig, vehicle};
use vmu_common::command::EngineKind;
use vmu_common::consts::{EV_ONLY_SPEED_LIMIT, MIN_SPEED};
use vmu_common::state::{EngineStatus, PowerMode};

#[test]
fn test_electric_only_below_split_point() {
    let mut rig = Rig::new(vehicle(100.0, 100.0));

    let mut state = rig.snapshot();
    for _ in 0..30 {
        rig.hold_accelerator();
        state = rig.cycle();
        assert!(state.speed <= EV_ONLY_SPEED_LIMIT);
        assert!(state.check_limits().is_ok());
    }

    assert_eq!(state.power_mode, PowerMode::ElectricOnly);
    assert!((state.ev_power_level - 1.0).abs() < f64::EPSILON);
    assert!(state.iec_power_level.abs() < f64::EPSILON);
    assert!(state.ev_on);
    assert!(!state.iec_on);
    assert_eq!(state.ev_status, EngineStatus::Running);
    assert!(state.battery < 100.0);
    assert!((state.fuel - 100.0).abs() < f64::EPSILON);
    assert_eq!(state.ev_ack_seq, 30);
}

#[test]
fn test_hybrid_above_split_point() {
    let mut rig = Rig::new(vehicle(100.0, 100.0));
    let mut state = rig.snapshot();
    for _ in 0..60 {
        rig.hold_accelerator();
        state = rig.cycle();
    }
    assert!(state.speed > EV_ONLY_SPEED_LIMIT);
    assert_eq!(state.power_mode, PowerMode::Hybrid);
    assert!(state.ev_on && state.iec_on);
    assert!(state.fuel < 100.0);
    assert!((state.power_sum() - 1.0).abs() < 1e-9);
}

#[test]
fn test_empty_battery_at_standstill_switches_to_combustion() {
    let mut rig = Rig::new(vehicle(0.0, 80.0));

    rig.hold_accelerator();
    let state = rig.cycle();
    assert_eq!(state.power_mode, PowerMode::CombustionOnly);
    assert!(state.ev_power_level.abs() < f64::EPSILON);
    // Accelerator held: the idle motor does not charge.
    assert!(state.battery.abs() < f64::EPSILON);

    let mut fuel = state.fuel;
    for _ in 0..50 {
        rig.hold_accelerator();
        let state = rig.cycle();
        assert_eq!(state.power_mode, PowerMode::CombustionOnly);
        assert!(state.ev_power_level.abs() < f64::EPSILON);
        assert!(state.iec_on);
        assert!(!state.ev_on);
        assert!(state.fuel < fuel);
        fuel = state.fuel;
    }
}

#[test]
fn test_empty_battery_while_moving_ramps_to_combustion() {
    let mut initial = vehicle(0.0, 80.0);
    initial.speed = 60.0;
    initial.ev_power_level = 0.5;
    initial.iec_power_level = 0.5;
    initial.power_mode = PowerMode::Hybrid;
    let mut rig = Rig::new(initial);

    let mut reached = None;
    for cycle in 1..=150 {
        rig.hold_accelerator();
        let state = rig.cycle();
        if state.power_mode == PowerMode::CombustionOnly {
            assert!(state.ev_power_level.abs() < f64::EPSILON);
            reached = Some(cycle);
            break;
        }
        assert_eq!(state.power_mode, PowerMode::Hybrid);
        assert!(state.transition_in_progress_iec);
    }
    // One cycle to latch, then 0.5 / 0.005 ramp steps.
    assert_eq!(reached, Some(101));
}

#[test]
fn test_depleted_vehicle_coasts_to_rest() {
    let mut initial = vehicle(0.0, 0.0);
    initial.speed = 30.0;
    let mut rig = Rig::new(initial);

    let mut previous = rig.snapshot().speed;
    for _ in 0..150 {
        rig.hold_accelerator();
        let state = rig.cycle();
        assert!(!state.accelerator);
        assert_eq!(state.power_mode, PowerMode::ChargingIdle);
        assert!(state.speed <= previous);
        assert!(!state.ev_on && !state.iec_on);
        previous = state.speed;
    }
    assert!((previous - MIN_SPEED).abs() < f64::EPSILON);

    // At rest the battery recharges but the stop holds.
    let state = rig.snapshot();
    assert!(state.battery > 0.0);
    assert!(rig.supervisor.controller().is_depleted_stop());
}

#[test]
fn test_silent_electric_engine_raises_sticky_safety() {
    let mut rig = Rig::new(vehicle(100.0, 100.0));

    for _ in 0..4 {
        let state = rig.cycle_with(false, true);
        assert!(!state.safety);
    }
    let state = rig.cycle_with(false, true);
    assert!(state.safety);
    assert_eq!(rig.supervisor.watchdog().misses(EngineKind::Electric), 5);
    assert_eq!(rig.supervisor.watchdog().misses(EngineKind::Combustion), 0);

    let state = rig.cycle();
    assert!(state.safety);
    assert_eq!(state.ev_ack_seq, 1);
    assert_eq!(rig.supervisor.watchdog().misses(EngineKind::Electric), 0);
}

#[test]
fn test_regenerative_braking_from_40() {
    let mut initial = vehicle(60.0, 80.0);
    initial.speed = 40.0;
    initial.ev_power_level = 0.5;
    initial.iec_power_level = 0.5;
    initial.ev_on = true;
    initial.iec_on = true;
    initial.power_mode = PowerMode::Hybrid;
    let mut rig = Rig::new(initial);

    let mut previous = rig.snapshot();
    let mut cycles = 0;
    while previous.speed > MIN_SPEED {
        rig.hold_brake();
        let state = rig.cycle();
        cycles += 1;
        assert_eq!(state.power_mode, PowerMode::RegenerativeBraking);
        assert!(state.speed < previous.speed);
        assert!(state.battery >= previous.battery);
        assert!(!state.ev_on && !state.iec_on);
        previous = state;
    }
    assert_eq!(cycles, 20);
    assert_eq!(previous.ev_status, EngineStatus::Regenerating);

    rig.hold_brake();
    let state = rig.cycle();
    assert_eq!(state.power_mode, PowerMode::Parked);
    assert!((state.speed - MIN_SPEED).abs() < f64::EPSILON);
    assert!(state.battery >= previous.battery);
}

#[test]
fn test_release_at_standstill_charges() {
    let mut rig = Rig::new(vehicle(50.0, 80.0));
    let state = rig.cycle();
    assert_eq!(state.power_mode, PowerMode::ChargingIdle);
    assert_eq!(state.ev_status, EngineStatus::Charging);
    assert!(state.battery > 50.0);
}
