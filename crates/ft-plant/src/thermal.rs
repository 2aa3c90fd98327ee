//! Thermal chain: heat available at each point along the ferrofluid loop.
//!
//! Point 1 receives CPU heat plus ambient waste heat, scaled by the flow
//! rate. Each later point receives what the previous point carries over,
//! pushed along by the flow, plus GPU heat at its injection point, and loses
//! part of it on arrival.

use crate::error::PlantResult;
use ft_config::ThermalDef;
use ft_core::{Real, ensure_fraction, non_negative};
use serde::{Deserialize, Serialize};

/// Power drawn by the processors this cycle plus ambient waste heat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HeatInputs {
    pub cpu_power_w: Real,
    pub gpu_power_w: Real,
    pub waste_heat_w: Real,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermalStage {
    pub carryover_fraction: Real,
    pub loss_fraction: Real,
}

#[derive(Debug, Clone)]
pub struct ThermalChain {
    heat_factor: Real,
    flow_push_efficiency: Real,
    gpu_injection: Option<usize>,
    stages: Vec<ThermalStage>,
}

impl ThermalChain {
    pub fn from_def(def: &ThermalDef) -> PlantResult<Self> {
        let stages = def
            .points
            .iter()
            .map(|p| -> PlantResult<ThermalStage> {
                Ok(ThermalStage {
                    carryover_fraction: ensure_fraction(
                        p.carryover_fraction,
                        "carryover_fraction",
                    )?,
                    loss_fraction: ensure_fraction(p.loss_fraction, "loss_fraction")?,
                })
            })
            .collect::<PlantResult<Vec<_>>>()?;
        Ok(Self {
            heat_factor: def.heat_factor,
            flow_push_efficiency: ensure_fraction(
                def.flow_push_efficiency,
                "flow_push_efficiency",
            )?,
            gpu_injection: def.gpu_injection_point,
            stages,
        })
    }

    pub fn point_count(&self) -> usize {
        self.stages.len()
    }

    pub fn stages(&self) -> &[ThermalStage] {
        &self.stages
    }

    pub fn heat_factor(&self) -> Real {
        self.heat_factor
    }

    pub fn gpu_injection(&self) -> Option<usize> {
        self.gpu_injection
    }

    /// Heat the processors shed into the loop, before any chain losses.
    pub fn total_heat(&self, inputs: &HeatInputs) -> Real {
        (non_negative(inputs.cpu_power_w) + non_negative(inputs.gpu_power_w)) * self.heat_factor
    }

    /// Heat each point holds this cycle, in chain order.
    ///
    /// Negative or non-finite inputs count as zero. GPU heat is dropped when
    /// the chain has no injection point.
    pub fn compute_point_heats(&self, inputs: &HeatInputs, flow_rate: Real) -> Vec<Real> {
        let cpu_heat = non_negative(inputs.cpu_power_w) * self.heat_factor;
        let gpu_heat = non_negative(inputs.gpu_power_w) * self.heat_factor;
        let flow = non_negative(flow_rate);

        let mut heats = Vec::with_capacity(self.stages.len());
        if self.stages.is_empty() {
            return heats;
        }

        let mut heat = (cpu_heat + non_negative(inputs.waste_heat_w)) * flow;
        heats.push(heat);
        for i in 1..self.stages.len() {
            let mut arriving =
                heat * self.stages[i - 1].carryover_fraction * self.flow_push_efficiency;
            if self.gpu_injection == Some(i) {
                arriving += gpu_heat;
            }
            heat = arriving * self.stages[i].loss_fraction;
            heats.push(heat);
        }
        heats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ft_config::presets;
    use proptest::prelude::*;

    fn compact() -> ThermalChain {
        ThermalChain::from_def(&presets::compact().thermal).unwrap()
    }

    #[test]
    fn full_load_heat_matches_overhead() {
        let chain = compact();
        let inputs = HeatInputs {
            cpu_power_w: 35.0,
            gpu_power_w: 10.0,
            waste_heat_w: 0.0,
        };
        assert!((chain.total_heat(&inputs) - 54.0).abs() < 1e-9);
    }

    #[test]
    fn first_point_sees_cpu_and_waste_heat() {
        let chain = compact();
        let inputs = HeatInputs {
            cpu_power_w: 35.0,
            gpu_power_w: 10.0,
            waste_heat_w: 3.0,
        };
        let heats = chain.compute_point_heats(&inputs, 0.5);
        assert!((heats[0] - (42.0 + 3.0) * 0.5).abs() < 1e-9);
    }

    #[test]
    fn gpu_heat_joins_at_injection_point() {
        let chain = compact();
        let inputs = HeatInputs {
            cpu_power_w: 35.0,
            gpu_power_w: 10.0,
            waste_heat_w: 0.0,
        };
        let heats = chain.compute_point_heats(&inputs, 1.0);
        assert_eq!(heats.len(), 2);

        let stages = chain.stages();
        let expected = (42.0 * stages[0].carryover_fraction * 0.95 + 12.0)
            * stages[1].loss_fraction;
        assert!((heats[1] - expected).abs() < 1e-9);
    }

    #[test]
    fn zero_flow_starves_the_chain_except_injection() {
        let chain = compact();
        let inputs = HeatInputs {
            cpu_power_w: 35.0,
            gpu_power_w: 10.0,
            waste_heat_w: 5.0,
        };
        let heats = chain.compute_point_heats(&inputs, 0.0);
        assert_eq!(heats[0], 0.0);
        assert!((heats[1] - 12.0 * chain.stages()[1].loss_fraction).abs() < 1e-9);
    }

    #[test]
    fn negative_inputs_count_as_zero() {
        let chain = compact();
        let inputs = HeatInputs {
            cpu_power_w: -5.0,
            gpu_power_w: Real::NAN,
            waste_heat_w: -1.0,
        };
        let heats = chain.compute_point_heats(&inputs, 1.0);
        assert!(heats.iter().all(|h| *h == 0.0));
    }

    proptest! {
        #[test]
        fn heat_never_grows_without_injection(
            cpu in 0.0..500.0f64,
            waste in 0.0..100.0f64,
            flow in 0.0..1.5f64,
        ) {
            let chain = ThermalChain::from_def(&presets::tower().thermal).unwrap();
            let inputs = HeatInputs { cpu_power_w: cpu, gpu_power_w: 0.0, waste_heat_w: waste };
            let heats = chain.compute_point_heats(&inputs, flow);
            for pair in heats.windows(2) {
                prop_assert!(pair[1] <= pair[0] + 1e-9);
            }
            prop_assert!(heats.iter().all(|h| *h >= 0.0));
        }
    }
}
