//! Thermoelectric generator bank.
//!
//! Each thermal point carries a group of generator modules. Output follows a
//! fixed efficiency chain and falls continuously to zero as either the flow
//! rate or the point heat drops below its minimum, so the bank keeps
//! producing partial power instead of cutting out.

use crate::context::CycleContext;
use crate::error::{PlantError, PlantResult};
use crate::fault::RecoveryOutcome;
use crate::status::FaultKind;
use ft_config::{GeneratorDef, PlantProfile};
use ft_controls::SensorKind;
use ft_core::{PointId, Real, non_negative, unit_ratio};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ceiling on the output fraction kept after a generator reset.
pub const MAX_RECOVERY_FACTOR: Real = 0.9;

/// Nominal output per module used to scale post-reset output (W).
pub const RECOVERY_WATTS_PER_MODULE: Real = 100.0;

/// Split of a heat flow into useful power and waste heat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatSplit {
    pub power_output_w: Real,
    pub waste_heat_w: Real,
}

/// `power = heat * efficiency`, `waste = heat - power`.
pub fn split_heat(heat_w: Real, efficiency: Real) -> HeatSplit {
    let heat = non_negative(heat_w);
    let power = heat * efficiency.clamp(0.0, 1.0);
    HeatSplit {
        power_output_w: power,
        waste_heat_w: heat - power,
    }
}

/// Fraction of nominal output kept after a successful generator reset.
pub fn recovery_factor(nominal_w: Real, module_count: u32) -> Real {
    if module_count == 0 {
        return 0.0;
    }
    (non_negative(nominal_w) / (module_count as Real * RECOVERY_WATTS_PER_MODULE))
        .min(MAX_RECOVERY_FACTOR)
}

/// Why an estimate ran below nominal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GenerationWarning {
    LowFlow { flow_rate: Real, min_flow: Real },
    LowHeat { heat_w: Real, min_heat_w: Real },
    HeatClamped { heat_w: Real, max_heat_w: Real },
}

impl fmt::Display for GenerationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LowFlow {
                flow_rate,
                min_flow,
            } => write!(
                f,
                "flow {flow_rate:.3} below minimum {min_flow:.3}, generating partial power"
            ),
            Self::LowHeat { heat_w, min_heat_w } => write!(
                f,
                "heat {heat_w:.2} W below minimum {min_heat_w:.2} W, generating partial power"
            ),
            Self::HeatClamped { heat_w, max_heat_w } => {
                write!(f, "heat {heat_w:.2} W clamped to maximum {max_heat_w:.2} W")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PowerEstimate {
    pub power_w: Real,
    pub warnings: Vec<GenerationWarning>,
}

/// Efficiency chain shared by every point.
#[derive(Debug, Clone)]
pub struct GeneratorModel {
    def: GeneratorDef,
    min_flow: Real,
}

impl GeneratorModel {
    pub fn new(def: GeneratorDef, min_flow: Real) -> Self {
        Self { def, min_flow }
    }

    pub fn def(&self) -> &GeneratorDef {
        &self.def
    }

    /// Pure output estimate for one point.
    pub fn compute_generator_power(
        &self,
        point_heat_w: Real,
        point_loss: Real,
        module_count: u32,
        efficiency: Real,
        flow_rate: Real,
    ) -> PowerEstimate {
        let d = &self.def;
        let mut warnings = Vec::new();
        let heat = non_negative(point_heat_w);
        let flow = non_negative(flow_rate);

        let flow_factor = unit_ratio(flow, self.min_flow);
        if flow < self.min_flow {
            warnings.push(GenerationWarning::LowFlow {
                flow_rate: flow,
                min_flow: self.min_flow,
            });
        }
        let heat_factor = unit_ratio(heat, d.min_heat_w);
        if heat < d.min_heat_w {
            warnings.push(GenerationWarning::LowHeat {
                heat_w: heat,
                min_heat_w: d.min_heat_w,
            });
        }
        let clamped = if heat > d.max_heat_w {
            warnings.push(GenerationWarning::HeatClamped {
                heat_w: heat,
                max_heat_w: d.max_heat_w,
            });
            d.max_heat_w
        } else {
            heat
        };

        let power_w = clamped
            * d.magnet_pull_efficiency
            * point_loss
            * d.heat_to_generator_efficiency
            * efficiency
            * d.regulator_efficiency
            * d.cooling_efficiency
            * module_count as Real
            * flow_factor
            * heat_factor;

        PowerEstimate { power_w, warnings }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorHealth {
    #[default]
    Healthy,
    /// Running at reduced output after a reset.
    Degraded,
    Failed,
}

/// Generator modules at one thermal point.
#[derive(Debug, Clone)]
pub struct Generator {
    pub point: PointId,
    pub module_count: u32,
    pub module_efficiency: Real,
    pub loss_fraction: Real,
    pub health: GeneratorHealth,
    pub last_power_w: Real,
}

#[derive(Debug, Clone)]
pub struct GeneratorBank {
    model: GeneratorModel,
    generators: Vec<Generator>,
}

impl GeneratorBank {
    pub fn from_profile(profile: &PlantProfile) -> PlantResult<Self> {
        if profile.thermal.points.is_empty() {
            return Err(PlantError::InvalidArg {
                what: "generator bank needs at least one point",
            });
        }
        let generators = profile
            .thermal
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| Generator {
                point: PointId::from_index(i as u32),
                module_count: p.module_count,
                module_efficiency: p.module_efficiency,
                loss_fraction: p.loss_fraction,
                health: GeneratorHealth::Healthy,
                last_power_w: 0.0,
            })
            .collect();
        Ok(Self {
            model: GeneratorModel::new(profile.generator.clone(), profile.flow.min_flow),
            generators,
        })
    }

    pub fn model(&self) -> &GeneratorModel {
        &self.model
    }

    pub fn generators(&self) -> &[Generator] {
        &self.generators
    }

    pub fn total_power_w(&self) -> Real {
        self.generators.iter().map(|g| g.last_power_w).sum()
    }

    /// Run one point: estimate, health-check, and recover if needed.
    ///
    /// The health check requires the module voltage to reach its minimum and,
    /// when the point has at least its minimum heat, the output to exceed the
    /// recovery threshold. Below minimum heat the point is expected to run at
    /// partial power and only the voltage is checked.
    pub fn generate(
        &mut self,
        point: PointId,
        point_heat_w: Real,
        flow_rate: Real,
        ctx: &mut CycleContext<'_>,
    ) -> Real {
        let Some(generator) = self.generators.get_mut(point.slot()) else {
            return 0.0;
        };
        let d = self.model.def();
        let estimate = self.model.compute_generator_power(
            point_heat_w,
            generator.loss_fraction,
            generator.module_count,
            generator.module_efficiency,
            flow_rate,
        );
        for warning in &estimate.warnings {
            ctx.warn(format!("generator at {point}: {warning}"));
        }

        let voltage = ctx.read(SensorKind::GeneratorVoltage { point });
        let voltage_ok = voltage >= d.min_healthy_voltage_v;
        let power_ok =
            point_heat_w < d.min_heat_w || estimate.power_w > d.recovery_threshold_w;

        let power = if voltage_ok && power_ok {
            generator.health = GeneratorHealth::Healthy;
            estimate.power_w
        } else {
            ctx.log.diagnostic(format!(
                "generator at {point} unhealthy: {voltage:.2} V (min {:.2} V), {:.2} W (threshold {:.2} W)",
                d.min_healthy_voltage_v, estimate.power_w, d.recovery_threshold_w
            ));
            match ctx.raise(FaultKind::GeneratorFailure { point }) {
                RecoveryOutcome::Recovered => {
                    generator.health = GeneratorHealth::Degraded;
                    estimate.power_w * recovery_factor(estimate.power_w, generator.module_count)
                }
                RecoveryOutcome::Unrecovered | RecoveryOutcome::Escalated => {
                    generator.health = GeneratorHealth::Failed;
                    0.0
                }
            }
        };
        generator.last_power_w = power;
        power
    }

    /// Run every point in chain order; returns per-point output.
    pub fn generate_all(
        &mut self,
        point_heats: &[Real],
        flow_rate: Real,
        ctx: &mut CycleContext<'_>,
    ) -> Vec<Real> {
        (0..self.generators.len())
            .map(|i| {
                let heat = point_heats.get(i).copied().unwrap_or(0.0);
                self.generate(PointId::from_index(i as u32), heat, flow_rate, ctx)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ActuatorCall, Harness, RecordingActuators};
    use ft_config::presets;
    use ft_controls::LogTag;
    use proptest::prelude::*;

    fn bank() -> GeneratorBank {
        GeneratorBank::from_profile(&presets::compact()).unwrap()
    }

    #[test]
    fn split_heat_conserves_energy() {
        let split = split_heat(51.3, 0.4);
        assert!((split.power_output_w - 20.52).abs() < 1e-9);
        assert!((split.waste_heat_w - 30.78).abs() < 1e-9);
    }

    #[test]
    fn zero_heat_gives_zero_power_with_warning() {
        let bank = bank();
        let est = bank
            .model()
            .compute_generator_power(0.0, 0.9, 6, 0.08, 1.0);
        assert_eq!(est.power_w, 0.0);
        assert!(matches!(
            est.warnings.as_slice(),
            [GenerationWarning::LowHeat { .. }]
        ));
    }

    #[test]
    fn zero_heat_point_raises_no_fault() {
        let mut bank = bank();
        let mut h = Harness::new();
        let power = bank.generate(PointId::from_index(0), 0.0, 1.0, &mut h.ctx());

        assert_eq!(power, 0.0);
        assert!(h.faults.status().is_warning());
        assert_eq!(h.actuators.recoveries(), 0);
        assert!(h.log.contains(LogTag::Warning, "below minimum"));
    }

    #[test]
    fn half_flow_halves_output() {
        let bank = bank();
        let model = bank.model();
        let full = model.compute_generator_power(40.0, 0.9, 6, 0.08, 0.4);
        let half = model.compute_generator_power(40.0, 0.9, 6, 0.08, 0.2);
        assert!((half.power_w - full.power_w * 0.5).abs() < 1e-9);
        assert!(full.warnings.is_empty());
    }

    #[test]
    fn excess_heat_is_clamped() {
        let bank = bank();
        let model = bank.model();
        let at_max = model.compute_generator_power(120.0, 0.9, 6, 0.08, 1.0);
        let above = model.compute_generator_power(500.0, 0.9, 6, 0.08, 1.0);
        assert_eq!(at_max.power_w, above.power_w);
        assert!(matches!(
            above.warnings.as_slice(),
            [GenerationWarning::HeatClamped { .. }]
        ));
    }

    #[test]
    fn healthy_point_reports_estimate() {
        let mut bank = bank();
        let mut h = Harness::new();
        let power = bank.generate(PointId::from_index(0), 42.0, 1.0, &mut h.ctx());

        let expected = bank
            .model()
            .compute_generator_power(42.0, 0.9, 6, 0.08, 1.0)
            .power_w;
        assert!((power - expected).abs() < 1e-12);
        assert_eq!(bank.generators()[0].health, GeneratorHealth::Healthy);
        assert!(h.faults.status().is_operational());
    }

    #[test]
    fn low_voltage_recovers_at_reduced_output() {
        let mut bank = bank();
        let mut h = Harness::new();
        let point = PointId::from_index(0);
        h.sensors.set(SensorKind::GeneratorVoltage { point }, 0.1);

        let power = bank.generate(point, 42.0, 1.0, &mut h.ctx());

        let nominal = bank
            .model()
            .compute_generator_power(42.0, 0.9, 6, 0.08, 1.0)
            .power_w;
        assert!((power - nominal * recovery_factor(nominal, 6)).abs() < 1e-12);
        assert!(power < nominal);
        assert_eq!(bank.generators()[0].health, GeneratorHealth::Degraded);
        assert_eq!(h.actuators.calls, vec![ActuatorCall::ResetGenerator(point)]);
    }

    #[test]
    fn failed_resets_escalate_and_zero_output() {
        let mut bank = bank();
        let mut h = Harness::with_actuators(RecordingActuators::new().with_recovery(false));
        let point = PointId::from_index(1);
        h.sensors.set(SensorKind::GeneratorVoltage { point }, 0.0);

        let power = bank.generate(point, 40.0, 1.0, &mut h.ctx());

        assert_eq!(power, 0.0);
        assert_eq!(bank.generators()[1].health, GeneratorHealth::Failed);
        assert!(h.faults.status().is_critical());
    }

    #[test]
    fn generate_all_covers_every_point() {
        let mut bank = bank();
        let mut h = Harness::new();
        let out = bank.generate_all(&[42.0, 41.0], 1.0, &mut h.ctx());
        assert_eq!(out.len(), 2);
        assert!((bank.total_power_w() - out.iter().sum::<Real>()).abs() < 1e-12);
    }

    #[test]
    fn recovery_factor_is_capped() {
        assert_eq!(recovery_factor(10_000.0, 1), MAX_RECOVERY_FACTOR);
        assert!((recovery_factor(60.0, 6) - 0.1).abs() < 1e-12);
        assert_eq!(recovery_factor(5.0, 0), 0.0);
    }

    proptest! {
        #[test]
        fn split_heat_sums_to_input(heat in 0.0..1000.0f64, eff in 0.0..1.0f64) {
            let s = split_heat(heat, eff);
            prop_assert!((s.power_output_w + s.waste_heat_w - heat).abs() < 1e-9);
            prop_assert!(s.power_output_w >= 0.0 && s.waste_heat_w >= 0.0);
        }

        #[test]
        fn output_is_non_negative_and_monotone_in_flow(
            heat in 0.0..200.0f64,
            flow in 0.0..1.5f64,
            extra in 0.0..0.5f64,
        ) {
            let bank = bank();
            let model = bank.model();
            let lo = model.compute_generator_power(heat, 0.9, 6, 0.08, flow).power_w;
            let hi = model.compute_generator_power(heat, 0.9, 6, 0.08, flow + extra).power_w;
            prop_assert!(lo >= 0.0);
            prop_assert!(hi + 1e-12 >= lo);
        }
    }
}
