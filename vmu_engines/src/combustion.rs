//! Combustion engine, gearbox and tank.

use crate::model::{EngineModel, ModelLimits};
use crate::thermal::ThermalModel;
use vmu_common::command::{EngineCommand, EngineKind, EngineReport};
use vmu_common::consts::{FINAL_DRIVE_RATIO, FUEL_RATE, MAX_FUEL};
use vmu_common::physics::{gear_for_speed, wheel_rpm};
use vmu_common::state::{EngineStatus, SystemState};

/// Combustion drive simulation.
#[derive(Debug, Clone)]
pub struct CombustionModel {
    thermal: ThermalModel,
    limits: ModelLimits,
}

/// Registry factory.
pub fn factory(limits: ModelLimits) -> Box<dyn EngineModel> {
    Box::new(CombustionModel::with_limits(limits))
}

impl CombustionModel {
    pub fn new() -> Self {
        Self::with_limits(ModelLimits::default())
    }

    pub fn with_limits(limits: ModelLimits) -> Self {
        Self {
            thermal: ThermalModel::combustion(),
            limits,
        }
    }
}

impl Default for CombustionModel {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineModel for CombustionModel {
    fn kind(&self) -> EngineKind {
        EngineKind::Combustion
    }

    fn name(&self) -> &'static str {
        "combustion"
    }

    fn apply(
        &mut self,
        cmd: &EngineCommand,
        state: &mut SystemState,
    ) -> (EngineReport, EngineStatus) {
        let level = cmd.power_level.clamp(0.0, 1.0);
        let speed = state.speed;
        let (gear, ratio) = gear_for_speed(speed);
        let fuel_empty = state.fuel <= self.limits.fuel_critical;
        let active = cmd.command.demands_power() && level > 0.0 && !fuel_empty;

        let rpm = if active {
            state.fuel = (state.fuel - level * speed * FUEL_RATE).clamp(0.0, MAX_FUEL);
            wheel_rpm(speed) * ratio * FINAL_DRIVE_RATIO
        } else {
            0.0
        };

        let status = if active {
            EngineStatus::Running
        } else if fuel_empty {
            EngineStatus::Depleted
        } else {
            EngineStatus::Idle
        };

        state.iec_gear = gear;
        state.rpm_iec = rpm;
        state.iec_on = active;
        state.temp_iec = self.thermal.step(active, level);

        let report = EngineReport::Combustion {
            fuel: state.fuel,
            gear,
            rpm,
            active,
            temperature: state.temp_iec,
        };
        (report, status)
    }
}
