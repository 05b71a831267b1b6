//! Engine model trait and registry.
//!
//! A model turns one request into updates of `SystemState` plus a report.
//! It runs inside the state lock, so it must not block.

use crate::error::EngineError;
use std::collections::HashMap;
use vmu_common::command::{EngineCommand, EngineKind, EngineReport};
use vmu_common::config::ControllerConfig;
use vmu_common::consts::{EV_MAX_RPM, FUEL_CRITICAL_THRESHOLD};
use vmu_common::state::{EngineStatus, SystemState};

/// Thresholds the models must share with the supervisor's controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelLimits {
    /// Fuel at or below this counts as an empty tank [%].
    pub fuel_critical: f64,
    /// Electric RPM ceiling applied while the tank is empty.
    pub ev_max_rpm: f64,
}

impl Default for ModelLimits {
    fn default() -> Self {
        Self {
            fuel_critical: FUEL_CRITICAL_THRESHOLD,
            ev_max_rpm: EV_MAX_RPM,
        }
    }
}

impl From<&ControllerConfig> for ModelLimits {
    fn from(config: &ControllerConfig) -> Self {
        Self {
            fuel_critical: config.fuel_critical,
            ev_max_rpm: config.ev_max_rpm,
        }
    }
}

/// Pluggable engine simulation.
pub trait EngineModel: Send {
    /// Engine this model simulates.
    fn kind(&self) -> EngineKind;

    /// Registry name.
    fn name(&self) -> &'static str;

    /// Apply one request (never `End`) to the shared state.
    fn apply(
        &mut self,
        cmd: &EngineCommand,
        state: &mut SystemState,
    ) -> (EngineReport, EngineStatus);
}

/// Factory function type for creating model instances.
pub type ModelFactory = fn(ModelLimits) -> Box<dyn EngineModel>;

/// Name-keyed model factories.
pub struct ModelRegistry {
    factories: HashMap<&'static str, ModelFactory>,
    limits: ModelLimits,
}

impl ModelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            limits: ModelLimits::default(),
        }
    }

    /// Registry holding the electric and combustion models.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry
            .factories
            .insert(EngineKind::Electric.as_str(), crate::electric::factory);
        registry
            .factories
            .insert(EngineKind::Combustion.as_str(), crate::combustion::factory);
        registry
    }

    /// Limits handed to every model created from now on.
    pub fn with_limits(mut self, limits: ModelLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Register a model factory.
    ///
    /// # Errors
    /// Returns `EngineError::DuplicateModel` if the name is taken.
    pub fn register(
        &mut self,
        name: &'static str,
        factory: ModelFactory,
    ) -> Result<(), EngineError> {
        if self.factories.contains_key(name) {
            return Err(EngineError::DuplicateModel(name));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Create a model instance by name.
    ///
    /// # Errors
    /// Returns `EngineError::ModelNotFound` if no model has that name.
    pub fn create(&self, name: &str) -> Result<Box<dyn EngineModel>, EngineError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| EngineError::ModelNotFound(name.to_string()))?;
        Ok(factory(self.limits))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}
