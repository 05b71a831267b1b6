//! First-order engine temperature model.

use vmu_common::consts::{
    AMBIENT_TEMP, COOL_FACTOR, EV_HEAT_RATE, EV_MAX_TEMP, IEC_HEAT_RATE, IEC_MAX_TEMP,
};

/// Heats linearly with load, cools exponentially toward ambient.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermalModel {
    temperature: f64,
    heat_rate: f64,
    max_temp: f64,
}

impl ThermalModel {
    /// Electric motor profile.
    pub const fn electric() -> Self {
        Self::new(EV_HEAT_RATE, EV_MAX_TEMP)
    }

    /// Combustion engine profile.
    pub const fn combustion() -> Self {
        Self::new(IEC_HEAT_RATE, IEC_MAX_TEMP)
    }

    /// Starts at ambient.
    pub const fn new(heat_rate: f64, max_temp: f64) -> Self {
        Self {
            temperature: AMBIENT_TEMP,
            heat_rate,
            max_temp,
        }
    }

    /// Current temperature [°C].
    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Advance one cycle. Returns the new temperature.
    pub fn step(&mut self, active: bool, level: f64) -> f64 {
        if active {
            self.temperature += self.heat_rate * level.clamp(0.0, 1.0);
        } else {
            self.temperature -= (self.temperature - AMBIENT_TEMP) * COOL_FACTOR;
        }
        self.temperature = self.temperature.clamp(AMBIENT_TEMP, self.max_temp);
        self.temperature
    }
}
