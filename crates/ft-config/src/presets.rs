//! Built-in hardware profiles.
//!
//! `compact` is the two-point laptop-class build with a bare battery;
//! `tower` is the four-point desktop build with a reserve floor and an
//! export port.

use crate::schema::*;
use crate::validate::LATEST_VERSION;
use crate::{ConfigError, ConfigResult};

pub const PRESET_NAMES: &[&str] = &["compact", "tower"];

pub fn preset(name: &str) -> ConfigResult<PlantProfile> {
    match name {
        "compact" => Ok(compact()),
        "tower" => Ok(tower()),
        other => Err(ConfigError::UnknownPreset {
            name: other.to_string(),
        }),
    }
}

fn draw(component: Subcomponent, watts: f64) -> DrawDef {
    DrawDef { component, watts }
}

fn point(carryover: f64, loss: f64, modules: u32, efficiency: f64) -> ThermalPointDef {
    ThermalPointDef {
        carryover_fraction: carryover,
        loss_fraction: loss,
        module_count: modules,
        module_efficiency: efficiency,
    }
}

pub fn compact() -> PlantProfile {
    PlantProfile {
        version: LATEST_VERSION,
        name: "compact".to_string(),
        thermal: ThermalDef {
            heat_factor: 1.2,
            flow_push_efficiency: 0.95,
            gpu_injection_point: Some(1),
            points: vec![point(0.85, 0.9, 6, 0.08), point(0.8, 0.9, 4, 0.07)],
        },
        generator: GeneratorDef {
            magnet_pull_efficiency: 0.95,
            heat_to_generator_efficiency: 0.9,
            regulator_efficiency: 0.93,
            cooling_efficiency: 0.92,
            min_heat_w: 5.0,
            max_heat_w: 120.0,
            recovery_threshold_w: 0.2,
            min_healthy_voltage_v: 0.5,
        },
        flow: FlowDef {
            min_flow: 0.4,
            initial_flow: 1.0,
            trend_alpha: 0.1,
            low_trend_threshold: 0.6,
            boost_step: 0.05,
            max_flow_target: 1.3,
        },
        magnet: MagnetDef {
            min_strength_t: 0.2,
            max_strength_t: 0.8,
            temperature_limit_c: 70.0,
            derate_factor: 0.9,
            watts_per_tesla: 2.0,
        },
        storage: StorageDef {
            capacity_wh: 60.0,
            initial_level_wh: 45.0,
            reserve_floor_wh: 0.0,
            degradation_threshold_wh: 48.0,
            charge_efficiency: 0.9,
            breaker_efficiency: 0.97,
            max_discharge_w: 60.0,
            dissipation_sink_w: 25.0,
            export_port_w: None,
            battery_poll_every_cycles: 10,
        },
        load: LoadDef {
            full_mode: LoadModeDef {
                name: "full".to_string(),
                draws: vec![
                    draw(Subcomponent::Cpu, 35.0),
                    draw(Subcomponent::Gpu, 10.0),
                    draw(Subcomponent::Memory, 4.0),
                    draw(Subcomponent::Storage, 2.0),
                    draw(Subcomponent::Display, 6.0),
                    draw(Subcomponent::Peripherals, 3.0),
                ],
            },
            idle_mode: LoadModeDef {
                name: "idle".to_string(),
                draws: vec![
                    draw(Subcomponent::Cpu, 5.0),
                    draw(Subcomponent::Gpu, 1.0),
                    draw(Subcomponent::Memory, 2.0),
                    draw(Subcomponent::Storage, 1.0),
                    draw(Subcomponent::Display, 2.0),
                    draw(Subcomponent::Peripherals, 1.0),
                ],
            },
            partial_threshold: 0.6,
            cpu_share: 0.67,
            cpu_max_w: 35.0,
            gpu_max_w: 10.0,
            min_storage_threshold_wh: 3.0,
            throttle_enter_fraction: 0.3,
            throttle_exit_fraction: 0.5,
            throttle_factor: 0.5,
        },
        thermal_limits: ThermalLimitsDef {
            cpu_overheat_c: 95.0,
            gpu_overheat_c: 90.0,
        },
        schedule: ScheduleDef {
            cycle_time_s: 1.0,
            fault_cycle_time_s: 5.0,
            boot_energy_wh: 0.5,
            ac_efficiency: 0.88,
        },
    }
}

pub fn tower() -> PlantProfile {
    PlantProfile {
        version: LATEST_VERSION,
        name: "tower".to_string(),
        thermal: ThermalDef {
            heat_factor: 1.2,
            flow_push_efficiency: 0.93,
            gpu_injection_point: Some(1),
            points: vec![
                point(0.85, 0.92, 12, 0.07),
                point(0.82, 0.9, 12, 0.07),
                point(0.8, 0.9, 8, 0.06),
                point(0.75, 0.88, 8, 0.06),
            ],
        },
        generator: GeneratorDef {
            magnet_pull_efficiency: 0.94,
            heat_to_generator_efficiency: 0.88,
            regulator_efficiency: 0.94,
            cooling_efficiency: 0.9,
            min_heat_w: 10.0,
            max_heat_w: 600.0,
            recovery_threshold_w: 1.0,
            min_healthy_voltage_v: 1.0,
        },
        flow: FlowDef {
            min_flow: 0.45,
            initial_flow: 1.0,
            trend_alpha: 0.1,
            low_trend_threshold: 0.65,
            boost_step: 0.05,
            max_flow_target: 1.4,
        },
        magnet: MagnetDef {
            min_strength_t: 0.3,
            max_strength_t: 1.2,
            temperature_limit_c: 75.0,
            derate_factor: 0.9,
            watts_per_tesla: 3.0,
        },
        storage: StorageDef {
            capacity_wh: 500.0,
            initial_level_wh: 350.0,
            reserve_floor_wh: 50.0,
            degradation_threshold_wh: 450.0,
            charge_efficiency: 0.92,
            breaker_efficiency: 0.96,
            max_discharge_w: 450.0,
            dissipation_sink_w: 100.0,
            export_port_w: Some(150.0),
            battery_poll_every_cycles: 20,
        },
        load: LoadDef {
            full_mode: LoadModeDef {
                name: "full".to_string(),
                draws: vec![
                    draw(Subcomponent::Cpu, 125.0),
                    draw(Subcomponent::Gpu, 250.0),
                    draw(Subcomponent::Memory, 12.0),
                    draw(Subcomponent::Storage, 8.0),
                    draw(Subcomponent::Peripherals, 10.0),
                ],
            },
            idle_mode: LoadModeDef {
                name: "idle".to_string(),
                draws: vec![
                    draw(Subcomponent::Cpu, 15.0),
                    draw(Subcomponent::Gpu, 12.0),
                    draw(Subcomponent::Memory, 6.0),
                    draw(Subcomponent::Storage, 3.0),
                    draw(Subcomponent::Peripherals, 4.0),
                ],
            },
            partial_threshold: 0.6,
            cpu_share: 0.67,
            cpu_max_w: 125.0,
            gpu_max_w: 250.0,
            min_storage_threshold_wh: 25.0,
            throttle_enter_fraction: 0.3,
            throttle_exit_fraction: 0.5,
            throttle_factor: 0.5,
        },
        thermal_limits: ThermalLimitsDef {
            cpu_overheat_c: 100.0,
            gpu_overheat_c: 88.0,
        },
        schedule: ScheduleDef {
            cycle_time_s: 1.0,
            fault_cycle_time_s: 4.0,
            boot_energy_wh: 2.0,
            ac_efficiency: 0.9,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_lookup() {
        assert_eq!(preset("tower").unwrap().point_count(), 4);
        assert_eq!(preset("compact").unwrap().point_count(), 2);
        assert!(matches!(
            preset("mainframe"),
            Err(ConfigError::UnknownPreset { .. })
        ));
    }

    #[test]
    fn full_mode_totals() {
        assert_eq!(compact().load.full_mode.total_w(), 60.0);
        assert_eq!(tower().load.full_mode.total_w(), 405.0);
    }
}
