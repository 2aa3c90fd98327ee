//! Ferrofluid flow regulation and magnet control.
//!
//! Each thermal point has an electromagnet that pulls ferrofluid through it.
//! Magnet strength tracks the heat the point must move. The loop flow rate is
//! smoothed into a trend; a sagging trend raises the valve target, and flow
//! below minimum is retried, rerouted, then raised as a fault.

use crate::context::CycleContext;
use crate::error::PlantResult;
use crate::fault::RecoveryOutcome;
use crate::status::FaultKind;
use ft_config::{FlowDef, MagnetDef, PlantProfile};
use ft_controls::{Ema, FlowPath, SensorKind};
use ft_core::{PointId, Real, non_negative, unit_ratio};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Magnet {
    pub point: PointId,
    pub strength_t: Real,
    pub temperature_c: Real,
    pub charger_active: bool,
    pub power_w: Real,
}

#[derive(Debug, Clone)]
pub struct FerrofluidLoop {
    pub flow_rate: Real,
    trend: Ema,
    pub flow_target: Real,
    pub active_path: FlowPath,
}

impl FerrofluidLoop {
    pub fn trend(&self) -> Real {
        self.trend.value()
    }
}

/// Outcome of one flow-monitoring pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowReport {
    pub flow_rate: Real,
    pub flow_trend: Real,
    pub flow_target: Real,
    pub active_path: FlowPath,
    pub magnet_power_w: Real,
    /// False when flow or a magnet stayed out of bounds after recovery.
    pub ok: bool,
}

#[derive(Debug, Clone)]
pub struct FlowRegulator {
    flow: FlowDef,
    magnet: MagnetDef,
    max_heat_w: Real,
    magnets: Vec<Magnet>,
    fluid: FerrofluidLoop,
}

impl FlowRegulator {
    pub fn from_profile(profile: &PlantProfile) -> PlantResult<Self> {
        let magnet = profile.magnet.clone();
        let magnets = (0..profile.point_count())
            .map(|i| Magnet {
                point: PointId::from_index(i as u32),
                strength_t: magnet.min_strength_t,
                temperature_c: 0.0,
                charger_active: false,
                power_w: 0.0,
            })
            .collect();
        let flow = profile.flow.clone();
        let fluid = FerrofluidLoop {
            flow_rate: flow.initial_flow,
            trend: Ema::new(flow.trend_alpha, flow.initial_flow)?,
            flow_target: flow.initial_flow,
            active_path: FlowPath::Primary,
        };
        Ok(Self {
            flow,
            magnet,
            max_heat_w: profile.generator.max_heat_w,
            magnets,
            fluid,
        })
    }

    pub fn magnets(&self) -> &[Magnet] {
        &self.magnets
    }

    pub fn fluid(&self) -> &FerrofluidLoop {
        &self.fluid
    }

    pub fn flow_rate(&self) -> Real {
        self.fluid.flow_rate
    }

    pub fn magnet_power_w(&self) -> Real {
        self.magnets.iter().map(|m| m.power_w).sum()
    }

    /// Strength the magnet at a point should hold for a given heat demand.
    pub fn target_strength(&self, heat_demand_w: Real) -> Real {
        let m = &self.magnet;
        m.min_strength_t
            + (m.max_strength_t - m.min_strength_t) * unit_ratio(heat_demand_w, self.max_heat_w)
    }

    /// Set the magnet at `point` for the heat it must move.
    ///
    /// Returns false if the magnet could not hold minimum strength and its
    /// charger reset failed.
    pub fn adjust_magnet(
        &mut self,
        point: PointId,
        heat_demand_w: Real,
        ctx: &mut CycleContext<'_>,
    ) -> bool {
        let mut strength = self.target_strength(heat_demand_w);
        let limits = &self.magnet;
        let Some(magnet) = self.magnets.get_mut(point.slot()) else {
            return false;
        };
        let mut power = strength * limits.watts_per_tesla;

        let temperature = ctx.read(SensorKind::MagnetTemperature { point });
        magnet.temperature_c = temperature;
        if temperature > limits.temperature_limit_c {
            strength *= limits.derate_factor;
            power *= limits.derate_factor;
            magnet.charger_active = false;
            ctx.actuators.discharge_magnet(point);
            ctx.warn(format!(
                "magnet at {point} at {temperature:.1} °C over {:.1} °C limit, derated to {strength:.3} T",
                limits.temperature_limit_c
            ));
        } else {
            magnet.charger_active = true;
            ctx.actuators.charge_magnet(point, strength);
            // A charger that cannot hold the field reads back short.
            let measured = ctx.read(SensorKind::MagnetStrength { point });
            if measured.is_finite() && measured < limits.min_strength_t {
                ctx.log.diagnostic(format!(
                    "magnet at {point} holds {measured:.3} T of {strength:.3} T commanded"
                ));
                strength = measured.max(0.0);
            }
        }
        magnet.strength_t = strength;
        magnet.power_w = power;

        if strength >= limits.min_strength_t {
            return true;
        }
        match ctx.raise(FaultKind::MagnetFailure { point }) {
            RecoveryOutcome::Recovered => {
                magnet.strength_t = limits.min_strength_t;
                magnet.power_w = limits.min_strength_t * limits.watts_per_tesla;
                true
            }
            RecoveryOutcome::Unrecovered | RecoveryOutcome::Escalated => false,
        }
    }

    /// Adjust every magnet, then check and correct the loop flow.
    pub fn monitor_flow(&mut self, point_heats: &[Real], ctx: &mut CycleContext<'_>) -> FlowReport {
        let mut ok = true;
        for i in 0..self.magnets.len() {
            let heat = point_heats.get(i).copied().unwrap_or(0.0);
            ok &= self.adjust_magnet(PointId::from_index(i as u32), heat, ctx);
        }

        let mut path = self.fluid.active_path;
        let mut flow = self.read_flow(path, ctx);
        let trend = self.fluid.trend.update(flow);

        if trend < self.flow.low_trend_threshold {
            let boosted = (self.fluid.flow_target + self.flow.boost_step).min(self.flow.max_flow_target);
            if boosted > self.fluid.flow_target {
                self.fluid.flow_target = boosted;
                ctx.log.diagnostic(format!(
                    "flow trend {trend:.3} below {:.3}, raising target to {boosted:.3}",
                    self.flow.low_trend_threshold
                ));
                self.command_valves(ctx);
            }
        }

        if flow < self.flow.min_flow {
            ctx.warn(format!(
                "flow {flow:.3} below minimum {:.3} on {path} path, retrying",
                self.flow.min_flow
            ));
            self.command_valves(ctx);
            flow = self.read_flow(path, ctx);

            if flow < self.flow.min_flow && path == FlowPath::Primary {
                path = FlowPath::Secondary;
                self.fluid.active_path = path;
                ctx.actuators.switch_flow_path(path);
                ctx.log.status(format!("flow switched to {path} path"));
                flow = self.read_flow(path, ctx);
            }

            if flow < self.flow.min_flow {
                match ctx.raise(FaultKind::LowFlow { path }) {
                    RecoveryOutcome::Recovered => flow = self.read_flow(path, ctx),
                    RecoveryOutcome::Unrecovered | RecoveryOutcome::Escalated => ok = false,
                }
            }
        }

        self.fluid.flow_rate = flow;
        FlowReport {
            flow_rate: flow,
            flow_trend: self.fluid.trend(),
            flow_target: self.fluid.flow_target,
            active_path: path,
            magnet_power_w: self.magnet_power_w(),
            ok,
        }
    }

    fn read_flow(&self, path: FlowPath, ctx: &mut CycleContext<'_>) -> Real {
        non_negative(ctx.read(SensorKind::flow(path)))
    }

    fn command_valves(&self, ctx: &mut CycleContext<'_>) {
        for magnet in &self.magnets {
            ctx.actuators.adjust_valve(magnet.point, self.fluid.flow_target);
        }
    }
}
