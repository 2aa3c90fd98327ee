//! Actuation and recovery commands issued by the control loop.
//!
//! Commands are fire-and-forget; recovery actions report success as a
//! boolean. Implementations must return within the cycle.

use ft_config::Subcomponent;
use ft_core::{PointId, Real};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ferrofluid loop path currently carrying the flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowPath {
    #[default]
    Primary,
    Secondary,
}

impl fmt::Display for FlowPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Secondary => f.write_str("secondary"),
        }
    }
}

/// Command interface to the physical apparatus.
pub trait ActuatorPort {
    /// Set the flow-control valve feeding a thermal point.
    fn adjust_valve(&mut self, point: PointId, target: Real);

    /// Route the ferrofluid loop through another path.
    fn switch_flow_path(&mut self, path: FlowPath);

    /// Energise the magnet at a point toward the given strength (T).
    fn charge_magnet(&mut self, point: PointId, strength_t: Real);

    /// Stop charging the magnet at a point.
    fn discharge_magnet(&mut self, point: PointId);

    /// Burn surplus power in the dissipation sink.
    fn dissipate_excess(&mut self, power_w: Real);

    /// Send surplus power out through the export port.
    fn redirect_power(&mut self, power_w: Real);

    /// Switch the boot supply to AC; returns the delivered watts.
    fn draw_ac_power(&mut self, efficiency: Real) -> Real;

    /// Recovery: reset the generator modules at a point.
    fn reset_generator(&mut self, point: PointId) -> bool;

    /// Recovery: flush the ferrofluid loop on a path.
    fn flush_flow(&mut self, path: FlowPath) -> bool;

    /// Recovery: reset the charger of the magnet at a point.
    fn reset_magnet_charger(&mut self, point: PointId) -> bool;

    /// Recovery: run the forced-cooling cycle for a subcomponent.
    fn force_cooling(&mut self, component: Subcomponent) -> bool;
}
