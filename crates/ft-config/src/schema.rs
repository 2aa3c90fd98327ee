//! Hardware profile schema definitions.
//!
//! One [`PlantProfile`] describes a complete apparatus: the ordered thermal
//! chain, the generator efficiency chain, the ferrofluid loop and its magnets,
//! the storage bank, the load modes, and the loop timing. The control
//! algorithm itself never changes between profiles.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlantProfile {
    pub version: u32,
    pub name: String,
    pub thermal: ThermalDef,
    pub generator: GeneratorDef,
    pub flow: FlowDef,
    pub magnet: MagnetDef,
    pub storage: StorageDef,
    pub load: LoadDef,
    pub thermal_limits: ThermalLimitsDef,
    pub schedule: ScheduleDef,
}

impl PlantProfile {
    pub fn point_count(&self) -> usize {
        self.thermal.points.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThermalDef {
    /// CPU/GPU power to heat conversion overhead (1.2 = 20%).
    #[serde(default = "default_heat_factor")]
    pub heat_factor: f64,
    pub flow_push_efficiency: f64,
    /// 0-based index of the point where GPU heat joins the chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_injection_point: Option<usize>,
    pub points: Vec<ThermalPointDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThermalPointDef {
    /// Fraction of this point's heat carried to the next point.
    pub carryover_fraction: f64,
    /// Fraction of heat retained on arrival at this point.
    pub loss_fraction: f64,
    pub module_count: u32,
    pub module_efficiency: f64,
}

fn default_heat_factor() -> f64 {
    1.2
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneratorDef {
    pub magnet_pull_efficiency: f64,
    pub heat_to_generator_efficiency: f64,
    pub regulator_efficiency: f64,
    pub cooling_efficiency: f64,
    pub min_heat_w: f64,
    pub max_heat_w: f64,
    pub recovery_threshold_w: f64,
    pub min_healthy_voltage_v: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlowDef {
    pub min_flow: f64,
    pub initial_flow: f64,
    #[serde(default = "default_trend_alpha")]
    pub trend_alpha: f64,
    pub low_trend_threshold: f64,
    pub boost_step: f64,
    pub max_flow_target: f64,
}

fn default_trend_alpha() -> f64 {
    0.1
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MagnetDef {
    pub min_strength_t: f64,
    pub max_strength_t: f64,
    pub temperature_limit_c: f64,
    #[serde(default = "default_derate_factor")]
    pub derate_factor: f64,
    pub watts_per_tesla: f64,
}

fn default_derate_factor() -> f64 {
    0.9
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageDef {
    pub capacity_wh: f64,
    pub initial_level_wh: f64,
    /// Level below which storage is never drawn. Zero on bare-battery profiles.
    #[serde(default)]
    pub reserve_floor_wh: f64,
    pub degradation_threshold_wh: f64,
    pub charge_efficiency: f64,
    pub breaker_efficiency: f64,
    pub max_discharge_w: f64,
    pub dissipation_sink_w: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_port_w: Option<f64>,
    #[serde(default = "default_poll_every")]
    pub battery_poll_every_cycles: u64,
}

fn default_poll_every() -> u64 {
    10
}

impl StorageDef {
    /// Capacity above the reserve floor.
    pub fn usable_wh(&self) -> f64 {
        (self.capacity_wh - self.reserve_floor_wh).max(0.0)
    }
}

/// Stable identifier for a powered subcomponent of the computing load.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Subcomponent {
    Cpu,
    Gpu,
    Memory,
    Storage,
    Display,
    Peripherals,
}

impl Subcomponent {
    pub fn label(self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Gpu => "gpu",
            Self::Memory => "memory",
            Self::Storage => "storage",
            Self::Display => "display",
            Self::Peripherals => "peripherals",
        }
    }

    /// Whether throttling and the scaled-mode power split apply.
    pub fn is_processor(self) -> bool {
        matches!(self, Self::Cpu | Self::Gpu)
    }
}

impl fmt::Display for Subcomponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrawDef {
    pub component: Subcomponent,
    pub watts: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoadModeDef {
    pub name: String,
    pub draws: Vec<DrawDef>,
}

impl LoadModeDef {
    pub fn total_w(&self) -> f64 {
        self.draws.iter().map(|d| d.watts).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoadDef {
    pub full_mode: LoadModeDef,
    pub idle_mode: LoadModeDef,
    /// Fraction of the full-mode total that still admits the scaled mode.
    pub partial_threshold: f64,
    /// CPU share of the scaled-mode processor budget; GPU gets the rest.
    pub cpu_share: f64,
    pub cpu_max_w: f64,
    pub gpu_max_w: f64,
    pub min_storage_threshold_wh: f64,
    /// Fractions of usable capacity.
    pub throttle_enter_fraction: f64,
    pub throttle_exit_fraction: f64,
    #[serde(default = "default_throttle_factor")]
    pub throttle_factor: f64,
}

fn default_throttle_factor() -> f64 {
    0.5
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThermalLimitsDef {
    pub cpu_overheat_c: f64,
    pub gpu_overheat_c: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleDef {
    pub cycle_time_s: f64,
    pub fault_cycle_time_s: f64,
    pub boot_energy_wh: f64,
    pub ac_efficiency: f64,
}
