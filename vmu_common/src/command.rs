//! Engine command protocol.
//!
//! One [`EngineCommand`] travels supervisor → engine on the engine's request
//! queue, and the engine answers with a copy tagged
//! [`Direction::ToSupervisor`] on its response queue. `seq` correlates the
//! two legs.

use crate::state::EngineStatus;
use core::fmt;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Which simulator a message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineKind {
    /// Electric motor and battery.
    Electric,
    /// Internal combustion engine and tank.
    Combustion,
}

impl EngineKind {
    /// Both engines, in dispatch order.
    pub const ALL: [Self; 2] = [Self::Electric, Self::Combustion];

    /// Name used on the command line and in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Electric => "electric",
            Self::Combustion => "combustion",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown engine name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown engine {0:?} (expected \"electric\" or \"combustion\")")]
pub struct UnknownEngine(pub String);

impl FromStr for EngineKind {
    type Err = UnknownEngine;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "electric" | "ev" => Ok(Self::Electric),
            "combustion" | "iec" => Ok(Self::Combustion),
            _ => Err(UnknownEngine(s.to_string())),
        }
    }
}

/// Command verb. Encoded on the wire as its integer code.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum CommandType {
    Start = 0,
    Stop = 1,
    SetPower = 2,
    End = 3,
}

/// Integer code outside `0..=3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown command code {0}")]
pub struct UnknownCommand(pub u8);

impl CommandType {
    /// Decode an integer command code.
    pub const fn from_u8(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Start),
            1 => Some(Self::Stop),
            2 => Some(Self::SetPower),
            3 => Some(Self::End),
            _ => None,
        }
    }

    /// `Start` and `SetPower` ask the engine to deliver power.
    pub const fn demands_power(self) -> bool {
        matches!(self, Self::Start | Self::SetPower)
    }
}

impl TryFrom<u8> for CommandType {
    type Error = UnknownCommand;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::from_u8(code).ok_or(UnknownCommand(code))
    }
}

impl From<CommandType> for u8 {
    fn from(command: CommandType) -> Self {
        command as u8
    }
}

/// Leg of the exchange a message is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Supervisor → engine.
    ToEngine,
    /// Engine → supervisor.
    ToSupervisor,
}

/// Engine-specific results carried on the return leg.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EngineReport {
    /// Request leg, nothing reported yet.
    Pending,
    Electric {
        battery: f64,
        rpm: f64,
        active: bool,
        temperature: f64,
    },
    Combustion {
        fuel: f64,
        gear: u8,
        rpm: f64,
        active: bool,
        temperature: f64,
    },
}

impl EngineReport {
    /// Whether the engine was delivering power.
    pub const fn is_active(&self) -> bool {
        match self {
            Self::Pending => false,
            Self::Electric { active, .. } | Self::Combustion { active, .. } => *active,
        }
    }
}

/// Message exchanged between the supervisor and one engine simulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineCommand {
    pub engine: EngineKind,
    pub command: CommandType,
    pub direction: Direction,
    /// Correlation id (supervisor cycle number).
    pub seq: u32,
    /// Vehicle speed when the command was issued [km/h].
    pub target_velocity: f64,
    /// Requested share of power [0, 1].
    pub power_level: f64,
    /// Brake pedal state when the command was issued.
    pub braking: bool,
    /// Accelerator pedal state when the command was issued.
    pub accelerating: bool,
    pub report: EngineReport,
    pub status: EngineStatus,
}

impl EngineCommand {
    /// Build a request for `engine`.
    pub fn request(
        engine: EngineKind,
        command: CommandType,
        seq: u32,
        target_velocity: f64,
        power_level: f64,
        braking: bool,
    ) -> Self {
        Self {
            engine,
            command,
            direction: Direction::ToEngine,
            seq,
            target_velocity,
            power_level: power_level.clamp(0.0, 1.0),
            braking,
            accelerating: false,
            report: EngineReport::Pending,
            status: EngineStatus::Idle,
        }
    }

    /// Same request with the accelerator state attached.
    pub fn with_accelerator(self, pressed: bool) -> Self {
        Self {
            accelerating: pressed,
            ..self
        }
    }

    /// Shutdown request.
    pub fn end(engine: EngineKind, seq: u32) -> Self {
        Self::request(engine, CommandType::End, seq, 0.0, 0.0, false)
    }

    /// Turn this request into its reply.
    pub fn reply(&self, report: EngineReport, status: EngineStatus) -> Self {
        Self {
            direction: Direction::ToSupervisor,
            report,
            status,
            ..*self
        }
    }

    /// Tagged for the supervisor.
    pub fn is_reply(&self) -> bool {
        self.direction == Direction::ToSupervisor
    }
}
