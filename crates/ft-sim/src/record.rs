//! Per-cycle and per-run records.

use crate::error::SimResult;
use ft_controls::FlowPath;
use ft_core::Real;
use ft_plant::{BootSource, ModeKind, SystemStatus};
use serde::{Deserialize, Serialize};

/// Snapshot of one control cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub status: SystemStatus,
    pub mode: ModeKind,
    pub mode_name: String,
    pub cpu_throttled: bool,
    pub gpu_throttled: bool,
    /// Processor draw after throttling.
    pub cpu_w: Real,
    pub gpu_w: Real,
    pub point_heat_w: Vec<Real>,
    pub point_power_w: Vec<Real>,
    pub generated_w: Real,
    pub magnet_power_w: Real,
    pub flow_rate: Real,
    pub flow_trend: Real,
    pub active_path: FlowPath,
    pub consumption_w: Real,
    pub breaker_output_w: Real,
    /// Surplus (positive) or covered deficit (negative).
    pub net_w: Real,
    pub storage_level_wh: Real,
    pub storage_capacity_wh: Real,
    pub exported_w: Real,
    pub dissipated_w: Real,
    pub curtailed_w: Real,
    /// Energy accounting interval for this cycle.
    pub interval_s: Real,
}

impl CycleReport {
    /// One-line self-sufficiency summary.
    pub fn summary(&self) -> String {
        let balance = if self.net_w >= 0.0 {
            format!("excess {:.2} W", self.net_w)
        } else {
            format!("deficit {:.2} W", -self.net_w)
        };
        format!(
            "cycle {}: generated {:.2} W, consumed {:.2} W, {balance}, storage {:.2}/{:.2} Wh, mode {}, status {}",
            self.cycle,
            self.generated_w,
            self.consumption_w,
            self.storage_level_wh,
            self.storage_capacity_wh,
            self.mode,
            self.status
        )
    }
}

/// Notification passed to a progress callback.
#[derive(Debug, Clone, Copy)]
pub enum CycleEvent<'a> {
    Started { cycle: u64 },
    Finished { report: &'a CycleReport },
}

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub profile: String,
    pub boot: BootSource,
    pub cycles_run: u64,
    pub reports: Vec<CycleReport>,
    pub final_status: SystemStatus,
    pub final_level_wh: Real,
    /// Set when the run ended on a Critical status.
    pub shutdown_reason: Option<String>,
}

impl RunRecord {
    pub fn to_json(&self) -> SimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn halted(&self) -> bool {
        self.shutdown_reason.is_some()
    }

    pub fn last_report(&self) -> Option<&CycleReport> {
        self.reports.last()
    }
}
