//! Computing-load mode selection and processor throttling.

use crate::context::CycleContext;
use crate::error::{PlantError, PlantResult};
use crate::status::{FaultKind, SystemStatus};
use crate::storage::StorageBank;
use ft_config::{LoadDef, LoadModeDef, PlantProfile, Subcomponent, ThermalLimitsDef};
use ft_controls::{HysteresisBand, LogSink, SensorKind};
use ft_core::{Real, non_negative};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeKind {
    Idle,
    Scaled,
    Full,
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Scaled => f.write_str("scaled"),
            Self::Full => f.write_str("full"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentDraw {
    pub component: Subcomponent,
    pub watts: Real,
}

/// A named set of subcomponent power draws.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadMode {
    pub kind: ModeKind,
    pub name: String,
    pub draws: Vec<ComponentDraw>,
}

impl LoadMode {
    fn from_def(kind: ModeKind, def: &LoadModeDef) -> Self {
        Self {
            kind,
            name: def.name.clone(),
            draws: def
                .draws
                .iter()
                .map(|d| ComponentDraw {
                    component: d.component,
                    watts: d.watts,
                })
                .collect(),
        }
    }

    pub fn total_w(&self) -> Real {
        self.draws.iter().map(|d| d.watts).sum()
    }

    pub fn draw_w(&self, component: Subcomponent) -> Real {
        self.draws
            .iter()
            .filter(|d| d.component == component)
            .map(|d| d.watts)
            .sum()
    }

    pub fn cpu_w(&self) -> Real {
        self.draw_w(Subcomponent::Cpu)
    }

    pub fn gpu_w(&self) -> Real {
        self.draw_w(Subcomponent::Gpu)
    }

    pub fn is_idle(&self) -> bool {
        self.kind == ModeKind::Idle
    }

    fn scale_component(&mut self, component: Subcomponent, factor: Real) {
        for d in self.draws.iter_mut().filter(|d| d.component == component) {
            d.watts *= factor;
        }
    }
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.1} W)", self.name, self.total_w())
    }
}

#[derive(Debug, Clone)]
pub struct LoadController {
    params: LoadDef,
    limits: ThermalLimitsDef,
    full: LoadMode,
    idle: LoadMode,
    band: HysteresisBand,
    reserve_floor_wh: Real,
    usable_wh: Real,
    current: LoadMode,
    cpu_throttled: bool,
    gpu_throttled: bool,
}

impl LoadController {
    pub fn from_profile(profile: &PlantProfile) -> PlantResult<Self> {
        let params = profile.load.clone();
        if !params.full_mode.draws.iter().any(|d| d.component.is_processor()) {
            return Err(PlantError::InvalidArg {
                what: "full mode has no processor draw",
            });
        }
        let band = HysteresisBand::new(params.throttle_enter_fraction, params.throttle_exit_fraction)?;
        let full = LoadMode::from_def(ModeKind::Full, &params.full_mode);
        let idle = LoadMode::from_def(ModeKind::Idle, &params.idle_mode);
        Ok(Self {
            limits: profile.thermal_limits.clone(),
            current: idle.clone(),
            full,
            idle,
            band,
            reserve_floor_wh: profile.storage.reserve_floor_wh,
            usable_wh: profile.storage.usable_wh(),
            params,
            cpu_throttled: false,
            gpu_throttled: false,
        })
    }

    pub fn current(&self) -> &LoadMode {
        &self.current
    }

    pub fn full(&self) -> &LoadMode {
        &self.full
    }

    pub fn idle(&self) -> &LoadMode {
        &self.idle
    }

    pub fn min_storage_threshold_wh(&self) -> Real {
        self.params.min_storage_threshold_wh
    }

    pub fn is_throttled(&self, component: Subcomponent) -> bool {
        match component {
            Subcomponent::Cpu => self.cpu_throttled,
            Subcomponent::Gpu => self.gpu_throttled,
            _ => false,
        }
    }

    /// Follow capacity changes reported by the battery gauge.
    pub fn track_capacity(&mut self, bank: &StorageBank) {
        self.reserve_floor_wh = bank.reserve_floor_wh;
        self.usable_wh = bank.usable_wh();
    }

    /// Pick the load mode for the coming interval.
    ///
    /// Any Fault or Critical status forces Idle. Otherwise the ladder is
    /// evaluated in order: storage at or below the minimum threshold gives
    /// Idle; enough power for the full mode gives Full; at least the partial
    /// threshold gives Scaled; anything less gives Idle.
    pub fn select_mode(
        &self,
        storage_level_wh: Real,
        available_power_w: Real,
        current: &LoadMode,
        status: &SystemStatus,
    ) -> LoadMode {
        let kind = if status.blocks_load() || storage_level_wh <= self.params.min_storage_threshold_wh
        {
            ModeKind::Idle
        } else if available_power_w >= self.full.total_w() {
            ModeKind::Full
        } else if available_power_w >= self.params.partial_threshold * self.full.total_w() {
            ModeKind::Scaled
        } else {
            ModeKind::Idle
        };

        match kind {
            ModeKind::Scaled => self.scaled_mode(available_power_w),
            k if k == current.kind => current.clone(),
            ModeKind::Full => self.full.clone(),
            ModeKind::Idle => self.idle.clone(),
        }
    }

    /// Full mode with the processors cut down to what `available_w` leaves
    /// after every other draw, split by the CPU share and capped at each
    /// processor's hardware maximum.
    pub fn scaled_mode(&self, available_w: Real) -> LoadMode {
        let base_w: Real = self
            .full
            .draws
            .iter()
            .filter(|d| !d.component.is_processor())
            .map(|d| d.watts)
            .sum();
        let budget = non_negative(available_w - base_w);
        let cpu_w = (budget * self.params.cpu_share).min(self.params.cpu_max_w);
        let gpu_w = (budget * (1.0 - self.params.cpu_share)).min(self.params.gpu_max_w);

        let draws = self
            .full
            .draws
            .iter()
            .map(|d| ComponentDraw {
                component: d.component,
                watts: match d.component {
                    Subcomponent::Cpu => cpu_w,
                    Subcomponent::Gpu => gpu_w,
                    _ => d.watts,
                },
            })
            .collect();
        LoadMode {
            kind: ModeKind::Scaled,
            name: format!("{} (scaled)", self.full.name),
            draws,
        }
    }

    /// Switch to `mode`, logging the transition if the kind changes.
    pub fn apply_mode(&mut self, mode: LoadMode, log: &mut dyn LogSink) {
        if mode.kind != self.current.kind {
            log.status(format!("load mode {} -> {}", self.current, mode));
        }
        self.current = mode;
    }

    /// Next throttle state for a processor given the storage level.
    ///
    /// Only CPU and GPU throttle. The level is compared as a fraction of
    /// usable capacity above the reserve floor; entering and leaving use
    /// different fractions so the state does not chatter at the boundary.
    pub fn throttle(&self, component: Subcomponent, storage_level_wh: Real, throttled: bool) -> bool {
        if !component.is_processor() {
            return false;
        }
        let fraction = if self.usable_wh > 0.0 {
            (storage_level_wh - self.reserve_floor_wh) / self.usable_wh
        } else {
            0.0
        };
        self.band.next(fraction, throttled)
    }

    pub fn update_throttles(&mut self, storage_level_wh: Real, log: &mut dyn LogSink) {
        for component in [Subcomponent::Cpu, Subcomponent::Gpu] {
            let was = self.is_throttled(component);
            let now = self.throttle(component, storage_level_wh, was);
            if now != was {
                self.set_throttled(component, now);
                let state = if now { "throttled" } else { "released" };
                log.status(format!(
                    "{component} {state} at {storage_level_wh:.2} Wh stored"
                ));
            }
        }
    }

    fn set_throttled(&mut self, component: Subcomponent, throttled: bool) {
        match component {
            Subcomponent::Cpu => self.cpu_throttled = throttled,
            Subcomponent::Gpu => self.gpu_throttled = throttled,
            _ => {}
        }
    }

    pub fn overheat_limit_c(&self, component: Subcomponent) -> Option<Real> {
        match component {
            Subcomponent::Cpu => Some(self.limits.cpu_overheat_c),
            Subcomponent::Gpu => Some(self.limits.gpu_overheat_c),
            _ => None,
        }
    }

    /// Check processor temperatures; an overheated processor raises a fault
    /// (recovered by forced cooling) and is throttled either way.
    ///
    /// Returns whether any processor was over its limit.
    pub fn check_temperatures(&mut self, ctx: &mut CycleContext<'_>) -> bool {
        let mut any = false;
        for component in [Subcomponent::Cpu, Subcomponent::Gpu] {
            let Some(limit) = self.overheat_limit_c(component) else {
                continue;
            };
            let temperature = ctx.read(SensorKind::temperature(component));
            if temperature <= limit {
                continue;
            }
            any = true;
            ctx.log.diagnostic(format!(
                "{component} at {temperature:.1} °C over {limit:.1} °C limit"
            ));
            ctx.raise(FaultKind::Overheat { component });
            if !self.is_throttled(component) {
                self.set_throttled(component, true);
                ctx.log.status(format!("{component} throttled for cooling"));
            }
        }
        any
    }

    /// Current mode with throttling applied.
    pub fn effective_mode(&self) -> LoadMode {
        let mut mode = self.current.clone();
        for component in [Subcomponent::Cpu, Subcomponent::Gpu] {
            if self.is_throttled(component) {
                mode.scale_component(component, self.params.throttle_factor);
            }
        }
        mode
    }

    pub fn consumption_w(&self) -> Real {
        self.effective_mode().total_w()
    }
}
