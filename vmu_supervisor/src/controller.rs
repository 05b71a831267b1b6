//! Power-mode state machine.
//!
//! Runs once per cycle under the state lock and decides the power mode and
//! the electric / combustion split. Mode changes that would move the
//! commanded power discontinuously go through a ramp: a transition latch is
//! set and each cycle moves the levels by at most `ramp_step` until the
//! target is reached, which clears the latch.
//!
//! Rules are evaluated in order and the first match wins:
//!
//! | # | Condition | Effect |
//! |---|-----------|--------|
//! | 1 | battery and fuel empty | accelerator off until the battery is full |
//! | 2 | brake, or stationary without pedal | mode only, split untouched |
//! | 3 | fuel empty, battery left | start electric ramp (falls through) |
//! | 4 | combustion latch, battery full or fuel empty | swap to electric ramp (falls through) |
//! | 5 | combustion latch | ramp toward combustion only |
//! | 6 | electric latch | ramp toward electric or the cruise split |
//! | 7 | above split, battery ok | hybrid cruise |
//! | 8 | below split, battery ok | electric cruise |
//! | 9 | battery critical, fuel left | start combustion ramp |
//! | 10 | otherwise | hold |

use tracing::trace;
use vmu_common::config::ControllerConfig;
use vmu_common::consts::MIN_SPEED;
use vmu_common::physics::ev_rpm;
use vmu_common::state::{PowerMode, SystemState};

/// Levels closer than this to a target count as arrived.
const LEVEL_EPSILON: f64 = 1e-9;

/// Rule that decided the last cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Battery and fuel exhausted; waiting for a full charge.
    DepletedStop,
    /// Brake pressed.
    Braking,
    /// Stationary with no pedal pressed.
    Stationary,
    /// Combustion ramp in progress.
    RampToCombustion,
    /// Combustion ramp finished; latch held until the battery recovers.
    CombustionLatched,
    /// Electric ramp in progress.
    RampToElectric,
    /// Electric ramp reached its target and cleared the latch.
    RampComplete,
    /// Fuel empty above the split point: accelerator forced off.
    FuelCutoff,
    /// Hybrid cruising with the speed-proportional split.
    HybridCruise,
    /// Electric-only cruising.
    ElectricCruise,
    /// Combustion latch just set.
    EnterCombustion,
    /// Nothing applied; split held.
    Hold,
}

/// Move `current` toward `target` by at most `step`.
fn step_toward(current: f64, target: f64, step: f64) -> f64 {
    let delta = target - current;
    if delta.abs() <= step {
        target
    } else {
        current + step.copysign(delta)
    }
}

/// Power-mode decision logic with its private depleted-stop latch.
#[derive(Debug, Clone)]
pub struct PowerModeController {
    config: ControllerConfig,
    depleted_stop: bool,
}

impl PowerModeController {
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            config,
            depleted_stop: false,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// `true` while the vehicle is held by the depleted-stop rule.
    pub fn is_depleted_stop(&self) -> bool {
        self.depleted_stop
    }

    /// Electric share of the cruise split above the split point.
    fn cruise_split(&self, speed: f64) -> f64 {
        if speed <= self.config.split_speed {
            1.0
        } else {
            self.config.split_speed / speed
        }
    }

    /// Run one decision against `state`.
    pub fn decide(&mut self, state: &mut SystemState) -> Decision {
        let decision = self.evaluate(state);
        state.ev_power_level = state.ev_power_level.clamp(0.0, 1.0);
        state.iec_power_level = state.iec_power_level.clamp(0.0, 1.0);
        trace!(
            ?decision,
            mode = %state.power_mode,
            ev = state.ev_power_level,
            iec = state.iec_power_level,
            "{}",
            state.debug_message.as_str()
        );
        decision
    }

    fn evaluate(&mut self, s: &mut SystemState) -> Decision {
        let c = self.config;
        let fuel_empty = s.fuel <= c.fuel_critical;
        let battery_empty = s.battery <= 0.0;
        let stationary = s.speed <= MIN_SPEED;
        let above_split = s.speed > c.split_speed;

        // 1. Depleted stop.
        if battery_empty && fuel_empty {
            self.depleted_stop = true;
        }
        if self.depleted_stop {
            if s.battery >= c.charge_full {
                self.depleted_stop = false;
            } else {
                s.accelerator = false;
                s.power_mode = PowerMode::ChargingIdle;
                s.debug_message.format(format_args!("depleted stop, charging {:.1}%", s.battery));
                return Decision::DepletedStop;
            }
        }

        // 2. Pedal overlays.
        if s.brake {
            s.power_mode = if stationary {
                PowerMode::Parked
            } else {
                PowerMode::RegenerativeBraking
            };
            s.debug_message.format(format_args!("brake at {:.1} km/h", s.speed));
            return Decision::Braking;
        }
        if stationary && !s.accelerator {
            s.power_mode = if s.battery < c.charge_full {
                PowerMode::ChargingIdle
            } else {
                PowerMode::Parked
            };
            s.debug_message.format(format_args!("standstill, battery {:.1}%", s.battery));
            return Decision::Stationary;
        }

        // 3. Out of fuel: head for electric.
        if fuel_empty
            && !battery_empty
            && !s.transition_in_progress_ev
            && s.ev_power_level < 1.0
        {
            s.transition_in_progress_ev = true;
        }

        // 4. Combustion no longer wanted or possible.
        if s.transition_in_progress_iec && (s.battery >= c.charge_full || fuel_empty) {
            s.transition_in_progress_iec = false;
            s.transition_in_progress_ev = true;
        }

        // 5. Combustion ramp.
        if s.transition_in_progress_iec {
            s.ev_power_level = (s.ev_power_level - c.ramp_step).max(0.0);
            s.iec_power_level = (s.iec_power_level + c.ramp_step).min(1.0);
            if s.iec_power_level >= 1.0 - LEVEL_EPSILON {
                s.iec_power_level = 1.0;
                s.ev_power_level = 0.0;
                s.power_mode = PowerMode::CombustionOnly;
                s.debug_message.format(format_args!("combustion only, battery {:.1}%", s.battery));
                return Decision::CombustionLatched;
            }
            s.power_mode = PowerMode::Hybrid;
            s.debug_message.format(format_args!(
                "ramp to combustion ev={:.3} iec={:.3}",
                s.ev_power_level, s.iec_power_level
            ));
            return Decision::RampToCombustion;
        }

        // 6. Electric ramp.
        if s.transition_in_progress_ev {
            return self.ramp_electric(s, fuel_empty, above_split);
        }

        // 7. Hybrid cruise.
        if above_split && s.battery >= c.battery_critical && !fuel_empty {
            s.ev_power_level = self.cruise_split(s.speed);
            s.iec_power_level = 1.0 - s.ev_power_level;
            s.power_mode = PowerMode::Hybrid;
            s.debug_message.format(format_args!(
                "hybrid {:.1} km/h ev={:.3} iec={:.3}",
                s.speed, s.ev_power_level, s.iec_power_level
            ));
            return Decision::HybridCruise;
        }

        // 8. Electric cruise.
        if !above_split && s.battery > c.battery_critical {
            s.ev_power_level = 1.0;
            s.iec_power_level = 0.0;
            s.power_mode = PowerMode::ElectricOnly;
            s.debug_message.format(format_args!("electric {:.1} km/h", s.speed));
            return Decision::ElectricCruise;
        }

        // 9. Battery critical: combustion takes over.
        if s.battery <= c.battery_critical && !fuel_empty {
            s.transition_in_progress_iec = true;
            if stationary {
                s.ev_power_level = 0.0;
                s.iec_power_level = 1.0;
                s.power_mode = PowerMode::CombustionOnly;
            } else {
                s.power_mode = PowerMode::Hybrid;
            }
            s.debug_message.format(format_args!("battery critical {:.1}%, combustion", s.battery));
            return Decision::EnterCombustion;
        }

        // 10. Hold.
        if fuel_empty && above_split {
            s.accelerator = false;
            s.debug_message.format(format_args!("no fuel at {:.1} km/h, coasting", s.speed));
            return Decision::FuelCutoff;
        }
        s.debug_message.format(format_args!(
            "hold ev={:.3} iec={:.3}",
            s.ev_power_level, s.iec_power_level
        ));
        Decision::Hold
    }

    fn ramp_electric(&self, s: &mut SystemState, fuel_empty: bool, above_split: bool) -> Decision {
        let c = self.config;

        if s.ev_power_level >= 1.0 - LEVEL_EPSILON {
            return Self::complete_electric(s);
        }

        if fuel_empty {
            if above_split {
                // Too fast for the motor alone: coast down first.
                s.accelerator = false;
                s.debug_message.format(format_args!("no fuel at {:.1} km/h, coasting", s.speed));
                return Decision::FuelCutoff;
            }
            s.ev_power_level = (s.ev_power_level + c.ramp_step).min(1.0);
            s.iec_power_level = (s.iec_power_level - c.ramp_step).max(0.0);
            if s.ev_power_level >= 1.0 - LEVEL_EPSILON {
                return Self::complete_electric(s);
            }
            s.power_mode = PowerMode::Hybrid;
            s.debug_message.format(format_args!("ramp to electric ev={:.3}", s.ev_power_level));
            return Decision::RampToElectric;
        }

        if !above_split {
            let next = (s.ev_power_level + c.ramp_step).min(1.0);
            let full_rpm = ev_rpm(1.0, s.speed);
            if full_rpm > 0.0 && ev_rpm(next, s.speed) > c.ev_max_rpm {
                // Stop at the cap; a level already past it is held, never lowered.
                s.ev_power_level = (c.ev_max_rpm / full_rpm).max(s.ev_power_level);
                s.iec_power_level = 1.0 - s.ev_power_level;
                s.transition_in_progress_ev = false;
                s.power_mode = PowerMode::Hybrid;
                s.debug_message.format(format_args!(
                    "electric rpm capped at ev={:.3}",
                    s.ev_power_level
                ));
                return Decision::RampComplete;
            }
            s.ev_power_level = next;
            s.iec_power_level = (s.iec_power_level - c.ramp_step).max(0.0);
            if s.ev_power_level >= 1.0 - LEVEL_EPSILON {
                return Self::complete_electric(s);
            }
            s.power_mode = PowerMode::Hybrid;
            s.debug_message.format(format_args!("ramp to electric ev={:.3}", s.ev_power_level));
            return Decision::RampToElectric;
        }

        let target = self.cruise_split(s.speed);
        s.ev_power_level = step_toward(s.ev_power_level, target, c.ramp_step);
        s.iec_power_level = step_toward(s.iec_power_level, 1.0 - target, c.ramp_step);
        s.power_mode = PowerMode::Hybrid;
        if (s.ev_power_level - target).abs() <= LEVEL_EPSILON {
            s.transition_in_progress_ev = false;
            s.debug_message.format(format_args!("hybrid split reached ev={:.3}", s.ev_power_level));
            return Decision::RampComplete;
        }
        s.debug_message.format(format_args!(
            "ramp to split ev={:.3} target={:.3}",
            s.ev_power_level, target
        ));
        Decision::RampToElectric
    }

    fn complete_electric(s: &mut SystemState) -> Decision {
        s.ev_power_level = 1.0;
        s.iec_power_level = 0.0;
        s.transition_in_progress_ev = false;
        s.power_mode = PowerMode::ElectricOnly;
        s.debug_message.format(format_args!("electric ramp complete"));
        Decision::RampComplete
    }
}

impl Default for PowerModeController {
    fn default() -> Self {
        Self::new(ControllerConfig::default())
    }
}
