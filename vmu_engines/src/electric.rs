//! Electric motor and traction battery.
//!
//! Battery drains in proportion to the commanded level while driving,
//! charges while stationary and recovers energy under braking. Battery and
//! fuel are read from the shared state each cycle, so the shared state stays
//! the single source of truth.

use crate::model::{EngineModel, ModelLimits};
use crate::thermal::ThermalModel;
use vmu_common::command::{EngineCommand, EngineKind, EngineReport};
use vmu_common::consts::{
    EV_CHARGE_RATE, EV_DRAIN_RATE, EV_REGEN_RATE, MAX_BATTERY, MAX_SPEED, MIN_SPEED,
};
use vmu_common::physics::ev_rpm;
use vmu_common::state::{EngineStatus, SystemState};

/// Electric drive simulation.
#[derive(Debug, Clone)]
pub struct ElectricModel {
    thermal: ThermalModel,
    limits: ModelLimits,
}

/// Registry factory.
pub fn factory(limits: ModelLimits) -> Box<dyn EngineModel> {
    Box::new(ElectricModel::with_limits(limits))
}

impl ElectricModel {
    pub fn new() -> Self {
        Self::with_limits(ModelLimits::default())
    }

    pub fn with_limits(limits: ModelLimits) -> Self {
        Self {
            thermal: ThermalModel::electric(),
            limits,
        }
    }
}

impl Default for ElectricModel {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineModel for ElectricModel {
    fn kind(&self) -> EngineKind {
        EngineKind::Electric
    }

    fn name(&self) -> &'static str {
        "electric"
    }

    fn apply(
        &mut self,
        cmd: &EngineCommand,
        state: &mut SystemState,
    ) -> (EngineReport, EngineStatus) {
        let level = cmd.power_level.clamp(0.0, 1.0);
        let speed = state.speed;
        let active = cmd.command.demands_power() && level > 0.0 && state.battery > 0.0;

        let (rpm, status) = if active {
            state.battery -= level * EV_DRAIN_RATE;
            let mut rpm = ev_rpm(level, speed);
            if state.fuel <= self.limits.fuel_critical {
                // No combustion backup: protect the motor.
                rpm = rpm.min(self.limits.ev_max_rpm);
            }
            (rpm, EngineStatus::Running)
        } else if cmd.braking && speed > MIN_SPEED {
            state.battery += EV_REGEN_RATE * speed / MAX_SPEED;
            (0.0, EngineStatus::Regenerating)
        } else if speed <= MIN_SPEED && !cmd.accelerating && state.battery < MAX_BATTERY {
            state.battery += EV_CHARGE_RATE;
            (0.0, EngineStatus::Charging)
        } else if state.battery <= 0.0 {
            (0.0, EngineStatus::Depleted)
        } else {
            (0.0, EngineStatus::Idle)
        };

        state.battery = state.battery.clamp(0.0, MAX_BATTERY);
        state.rpm_ev = rpm;
        state.ev_on = active;
        state.temp_ev = self.thermal.step(active, level);

        let report = EngineReport::Electric {
            battery: state.battery,
            rpm,
            active,
            temperature: state.temp_ev,
        };
        (report, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmu_common::command::CommandType;
    use vmu_common::config::VehicleConfig;
    use vmu_common::consts::EV_MAX_RPM;
    use vmu_common::physics::wheel_rpm;

    fn command(command: CommandType, level: f64, braking: bool) -> EngineCommand {
        EngineCommand::request(EngineKind::Electric, command, 1, 0.0, level, braking)
    }

    fn state_at(speed: f64, battery: f64) -> SystemState {
        let mut state = SystemState::initial(&VehicleConfig::default());
        state.speed = speed;
        state.battery = battery;
        state
    }

    #[test]
    fn test_drains_in_proportion_to_level() {
        let mut model = ElectricModel::new();
        let mut state = state_at(30.0, 80.0);
        let (report, status) = model.apply(&command(CommandType::SetPower, 0.5, false), &mut state);

        assert_eq!(status, EngineStatus::Running);
        assert!(state.ev_on);
        assert!((state.battery - (80.0 - 0.5 * EV_DRAIN_RATE)).abs() < 1e-12);
        let expected_rpm = 0.5 * wheel_rpm(30.0) * 9.0;
        assert!((state.rpm_ev - expected_rpm).abs() < 1e-9);
        assert!(report.is_active());
    }

    #[test]
    fn test_stop_while_stationary_charges() {
        let mut model = ElectricModel::new();
        let mut state = state_at(0.0, 50.0);
        let (_, status) = model.apply(&command(CommandType::Stop, 1.0, false), &mut state);

        assert_eq!(status, EngineStatus::Charging);
        assert!(!state.ev_on);
        assert!(state.rpm_ev.abs() < f64::EPSILON);
        assert!((state.battery - (50.0 + EV_CHARGE_RATE)).abs() < 1e-12);
    }

    #[test]
    fn test_no_charging_while_accelerator_held() {
        let mut model = ElectricModel::new();
        let mut state = state_at(0.0, 50.0);
        let cmd = command(CommandType::Stop, 0.0, false).with_accelerator(true);
        let (_, status) = model.apply(&cmd, &mut state);

        assert_eq!(status, EngineStatus::Idle);
        assert!((state.battery - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_charge_stops_at_capacity() {
        let mut model = ElectricModel::new();
        let mut state = state_at(0.0, MAX_BATTERY - 0.01);
        model.apply(&command(CommandType::Stop, 0.0, false), &mut state);
        assert!((state.battery - MAX_BATTERY).abs() < f64::EPSILON);

        let (_, status) = model.apply(&command(CommandType::Stop, 0.0, false), &mut state);
        assert_eq!(status, EngineStatus::Idle);
    }

    #[test]
    fn test_regenerates_while_braking() {
        let mut model = ElectricModel::new();
        let mut state = state_at(100.0, 50.0);
        let (_, status) = model.apply(&command(CommandType::Stop, 0.0, true), &mut state);

        assert_eq!(status, EngineStatus::Regenerating);
        assert!((state.battery - (50.0 + EV_REGEN_RATE * 0.5)).abs() < 1e-12);
    }

    #[test]
    fn test_empty_battery_cannot_drive() {
        let mut model = ElectricModel::new();
        let mut state = state_at(20.0, 0.0);
        let (report, status) = model.apply(&command(CommandType::Start, 1.0, false), &mut state);

        assert_eq!(status, EngineStatus::Depleted);
        assert!(!report.is_active());
        assert!(state.battery.abs() < f64::EPSILON);
    }

    #[test]
    fn test_battery_never_negative() {
        let mut model = ElectricModel::new();
        let mut state = state_at(20.0, 0.005);
        model.apply(&command(CommandType::SetPower, 1.0, false), &mut state);
        assert!(state.battery >= 0.0);
    }

    #[test]
    fn test_rpm_capped_without_fuel() {
        let mut model = ElectricModel::new();
        let mut state = state_at(150.0, 90.0);
        state.fuel = 0.0;
        model.apply(&command(CommandType::SetPower, 1.0, false), &mut state);
        assert!((state.rpm_ev - EV_MAX_RPM).abs() < f64::EPSILON);

        state.fuel = 50.0;
        model.apply(&command(CommandType::SetPower, 1.0, false), &mut state);
        assert!(state.rpm_ev > EV_MAX_RPM);
    }

    #[test]
    fn test_configured_rpm_cap_and_fuel_threshold() {
        let mut model = ElectricModel::with_limits(ModelLimits {
            fuel_critical: 5.0,
            ev_max_rpm: 2_000.0,
        });
        let mut state = state_at(150.0, 90.0);
        state.fuel = 3.0;
        model.apply(&command(CommandType::SetPower, 1.0, false), &mut state);
        assert!((state.rpm_ev - 2_000.0).abs() < f64::EPSILON);

        state.fuel = 6.0;
        model.apply(&command(CommandType::SetPower, 1.0, false), &mut state);
        assert!(state.rpm_ev > 2_000.0);
    }

    #[test]
    fn test_heats_only_when_active() {
        let mut model = ElectricModel::new();
        let mut state = state_at(30.0, 80.0);
        model.apply(&command(CommandType::SetPower, 1.0, false), &mut state);
        let warm = state.temp_ev;
        assert!(warm > 25.0);
        model.apply(&command(CommandType::Stop, 0.0, false), &mut state);
        assert!(state.temp_ev < warm);
    }
}
