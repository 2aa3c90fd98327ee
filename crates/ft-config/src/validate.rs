//! Profile validation logic.

use crate::schema::{LoadModeDef, PlantProfile, ThermalDef};
use std::collections::HashSet;

/// Latest profile schema version understood by this crate.
pub const LATEST_VERSION: u32 = 1;

/// Longest cycle or fault-cycle interval a profile may ask for, one day.
pub const MAX_CYCLE_TIME_S: f64 = 86_400.0;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: impl Into<String>, value: f64, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.into(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// `(0, 1]`
fn fraction(field: impl Into<String>, v: f64) -> Result<(), ValidationError> {
    if v.is_finite() && v > 0.0 && v <= 1.0 {
        Ok(())
    } else {
        Err(invalid(field, v, "must be in (0, 1]"))
    }
}

/// `(0, 1)`
fn efficiency(field: impl Into<String>, v: f64) -> Result<(), ValidationError> {
    if v.is_finite() && v > 0.0 && v < 1.0 {
        Ok(())
    } else {
        Err(invalid(field, v, "must be in (0, 1)"))
    }
}

fn positive(field: impl Into<String>, v: f64) -> Result<(), ValidationError> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, v, "must be positive"))
    }
}

fn finite(field: impl Into<String>, v: f64) -> Result<(), ValidationError> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(invalid(field, v, "must be finite"))
    }
}

fn cycle_time(field: impl Into<String>, v: f64) -> Result<(), ValidationError> {
    if v.is_finite() && v > 0.0 && v <= MAX_CYCLE_TIME_S {
        Ok(())
    } else {
        Err(invalid(field, v, "must be in (0, 86400] seconds"))
    }
}

fn non_negative(field: impl Into<String>, v: f64) -> Result<(), ValidationError> {
    if v.is_finite() && v >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, v, "must be non-negative"))
    }
}

pub fn validate_profile(profile: &PlantProfile) -> Result<(), ValidationError> {
    if profile.version == 0 || profile.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: profile.version,
        });
    }

    validate_thermal(&profile.thermal)?;

    let g = &profile.generator;
    fraction("generator.magnet_pull_efficiency", g.magnet_pull_efficiency)?;
    fraction(
        "generator.heat_to_generator_efficiency",
        g.heat_to_generator_efficiency,
    )?;
    fraction("generator.regulator_efficiency", g.regulator_efficiency)?;
    fraction("generator.cooling_efficiency", g.cooling_efficiency)?;
    positive("generator.min_heat_w", g.min_heat_w)?;
    if g.max_heat_w <= g.min_heat_w {
        return Err(invalid(
            "generator.max_heat_w",
            g.max_heat_w,
            "must exceed min_heat_w",
        ));
    }
    non_negative("generator.recovery_threshold_w", g.recovery_threshold_w)?;
    non_negative("generator.min_healthy_voltage_v", g.min_healthy_voltage_v)?;

    let f = &profile.flow;
    positive("flow.min_flow", f.min_flow)?;
    non_negative("flow.initial_flow", f.initial_flow)?;
    fraction("flow.trend_alpha", f.trend_alpha)?;
    non_negative("flow.low_trend_threshold", f.low_trend_threshold)?;
    non_negative("flow.boost_step", f.boost_step)?;
    if f.max_flow_target < f.initial_flow {
        return Err(invalid(
            "flow.max_flow_target",
            f.max_flow_target,
            "must not be below initial_flow",
        ));
    }

    let m = &profile.magnet;
    non_negative("magnet.min_strength_t", m.min_strength_t)?;
    if m.max_strength_t <= m.min_strength_t {
        return Err(invalid(
            "magnet.max_strength_t",
            m.max_strength_t,
            "must exceed min_strength_t",
        ));
    }
    fraction("magnet.derate_factor", m.derate_factor)?;
    non_negative("magnet.watts_per_tesla", m.watts_per_tesla)?;

    let s = &profile.storage;
    positive("storage.capacity_wh", s.capacity_wh)?;
    if !(0.0..=s.capacity_wh).contains(&s.initial_level_wh) {
        return Err(invalid(
            "storage.initial_level_wh",
            s.initial_level_wh,
            "must be within [0, capacity_wh]",
        ));
    }
    if !(0.0..s.capacity_wh).contains(&s.reserve_floor_wh) {
        return Err(invalid(
            "storage.reserve_floor_wh",
            s.reserve_floor_wh,
            "must be within [0, capacity_wh)",
        ));
    }
    non_negative("storage.degradation_threshold_wh", s.degradation_threshold_wh)?;
    efficiency("storage.charge_efficiency", s.charge_efficiency)?;
    fraction("storage.breaker_efficiency", s.breaker_efficiency)?;
    non_negative("storage.max_discharge_w", s.max_discharge_w)?;
    non_negative("storage.dissipation_sink_w", s.dissipation_sink_w)?;
    if let Some(port) = s.export_port_w {
        non_negative("storage.export_port_w", port)?;
    }
    if s.battery_poll_every_cycles == 0 {
        return Err(invalid(
            "storage.battery_poll_every_cycles",
            0.0,
            "must be at least 1",
        ));
    }

    let l = &profile.load;
    validate_mode(&l.full_mode, "load.full_mode")?;
    validate_mode(&l.idle_mode, "load.idle_mode")?;
    for required in [
        crate::schema::Subcomponent::Cpu,
        crate::schema::Subcomponent::Gpu,
    ] {
        if !l.full_mode.draws.iter().any(|d| d.component == required) {
            return Err(ValidationError::MissingReference {
                id: required.to_string(),
                context: "load.full_mode draws".to_string(),
            });
        }
    }
    if l.idle_mode.total_w() > l.full_mode.total_w() {
        return Err(invalid(
            "load.idle_mode",
            l.idle_mode.total_w(),
            "idle draw must not exceed full draw",
        ));
    }
    if !(0.5..=0.7).contains(&l.partial_threshold) {
        return Err(invalid(
            "load.partial_threshold",
            l.partial_threshold,
            "must be within [0.5, 0.7]",
        ));
    }
    efficiency("load.cpu_share", l.cpu_share)?;
    positive("load.cpu_max_w", l.cpu_max_w)?;
    positive("load.gpu_max_w", l.gpu_max_w)?;
    non_negative("load.min_storage_threshold_wh", l.min_storage_threshold_wh)?;
    efficiency("load.throttle_enter_fraction", l.throttle_enter_fraction)?;
    efficiency("load.throttle_exit_fraction", l.throttle_exit_fraction)?;
    if l.throttle_exit_fraction <= l.throttle_enter_fraction {
        return Err(invalid(
            "load.throttle_exit_fraction",
            l.throttle_exit_fraction,
            "must exceed throttle_enter_fraction",
        ));
    }
    fraction("load.throttle_factor", l.throttle_factor)?;

    let schedule = &profile.schedule;
    cycle_time("schedule.cycle_time_s", schedule.cycle_time_s)?;
    cycle_time("schedule.fault_cycle_time_s", schedule.fault_cycle_time_s)?;
    if schedule.fault_cycle_time_s < schedule.cycle_time_s {
        return Err(invalid(
            "schedule.fault_cycle_time_s",
            schedule.fault_cycle_time_s,
            "must not be shorter than cycle_time_s",
        ));
    }
    non_negative("schedule.boot_energy_wh", schedule.boot_energy_wh)?;
    fraction("schedule.ac_efficiency", schedule.ac_efficiency)?;

    let limits = &profile.thermal_limits;
    finite("thermal_limits.cpu_overheat_c", limits.cpu_overheat_c)?;
    finite("thermal_limits.gpu_overheat_c", limits.gpu_overheat_c)?;

    Ok(())
}

fn validate_thermal(thermal: &ThermalDef) -> Result<(), ValidationError> {
    if thermal.points.is_empty() {
        return Err(invalid("thermal.points", 0.0, "at least one point required"));
    }
    if !(thermal.heat_factor.is_finite() && thermal.heat_factor >= 1.0) {
        return Err(invalid(
            "thermal.heat_factor",
            thermal.heat_factor,
            "must be at least 1.0",
        ));
    }
    fraction("thermal.flow_push_efficiency", thermal.flow_push_efficiency)?;

    if let Some(gpu) = thermal.gpu_injection_point {
        // Point 0 receives CPU heat; GPU heat joins further down the chain.
        if gpu == 0 || gpu >= thermal.points.len() {
            return Err(invalid(
                "thermal.gpu_injection_point",
                gpu as f64,
                "must name a point after the first",
            ));
        }
    }

    for (i, point) in thermal.points.iter().enumerate() {
        fraction(
            format!("thermal.points[{i}].carryover_fraction"),
            point.carryover_fraction,
        )?;
        fraction(
            format!("thermal.points[{i}].loss_fraction"),
            point.loss_fraction,
        )?;
        if point.module_count == 0 {
            return Err(invalid(
                format!("thermal.points[{i}].module_count"),
                0.0,
                "must be at least 1",
            ));
        }
        efficiency(
            format!("thermal.points[{i}].module_efficiency"),
            point.module_efficiency,
        )?;
    }
    Ok(())
}

fn validate_mode(mode: &LoadModeDef, context: &str) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for draw in &mode.draws {
        if !seen.insert(draw.component) {
            return Err(ValidationError::DuplicateId {
                id: draw.component.to_string(),
                context: format!("{context} '{}'", mode.name),
            });
        }
        non_negative(format!("{context}.{}", draw.component), draw.watts)?;
    }
    Ok(())
}
