//! Sensor references for the control loop.
//!
//! A [`SensorKind`] names a scalar quantity on the apparatus. The runtime
//! resolves it through a [`SensorPort`] implementation, which may be real
//! hardware or the simulated plant.

use crate::actuator::FlowPath;
use ft_config::Subcomponent;
use ft_core::{PointId, Real};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to a measured quantity on the apparatus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SensorKind {
    /// Die temperature of a load subcomponent (°C).
    ComponentTemperature { component: Subcomponent },

    /// Ferrofluid flow rate on a loop path (normalised, 1.0 = nominal).
    FlowRate { path: FlowPath },

    /// Field strength of the magnet at a thermal point (T).
    MagnetStrength { point: PointId },

    /// Temperature of the magnet at a thermal point (°C).
    MagnetTemperature { point: PointId },

    /// Terminal voltage of the generator modules at a thermal point (V).
    GeneratorVoltage { point: PointId },

    /// Battery capacity as reported by the pack's health gauge (Wh).
    BatteryCapacity,

    /// Ambient waste heat available to the first thermal point (W).
    AmbientWasteHeat,
}

impl SensorKind {
    pub fn temperature(component: Subcomponent) -> Self {
        Self::ComponentTemperature { component }
    }

    pub fn flow(path: FlowPath) -> Self {
        Self::FlowRate { path }
    }

    /// The thermal point this reading belongs to, if any.
    pub fn point(&self) -> Option<PointId> {
        match self {
            Self::MagnetStrength { point }
            | Self::MagnetTemperature { point }
            | Self::GeneratorVoltage { point } => Some(*point),
            _ => None,
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ComponentTemperature { component } => write!(f, "{component} temperature"),
            Self::FlowRate { path } => write!(f, "{path} flow rate"),
            Self::MagnetStrength { point } => write!(f, "magnet strength at {point}"),
            Self::MagnetTemperature { point } => write!(f, "magnet temperature at {point}"),
            Self::GeneratorVoltage { point } => write!(f, "generator voltage at {point}"),
            Self::BatteryCapacity => f.write_str("battery capacity"),
            Self::AmbientWasteHeat => f.write_str("ambient waste heat"),
        }
    }
}

/// Trait for types that can provide sensor readings.
///
/// Reads are synchronous and bounded: an implementation must answer within
/// the cycle. The core applies no retry beyond what each component codes.
pub trait SensorPort {
    /// Current value of the referenced quantity.
    fn read(&mut self, kind: SensorKind) -> Real;
}
