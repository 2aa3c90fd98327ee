//! Energy storage arbitration.
//!
//! Generated power passes the breaker, then each cycle settles against the
//! load: a deficit draws from storage above the reserve floor, a surplus
//! charges storage and whatever does not fit goes to the export port, then to
//! the dissipation sink, and is curtailed beyond that.

use crate::context::CycleContext;
use crate::error::PlantResult;
use crate::status::FaultKind;
use ft_config::StorageDef;
use ft_controls::{PollSchedule, SensorKind};
use ft_core::{Real, energy_wh, non_negative, power_w};
use serde::{Deserialize, Serialize};

/// Residual below which a shortfall or curtailment is treated as zero.
const ENERGY_EPSILON_WH: Real = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageBank {
    pub level_wh: Real,
    pub capacity_wh: Real,
    pub reserve_floor_wh: Real,
    pub degradation_threshold_wh: Real,
    pub charge_efficiency: Real,
}

impl StorageBank {
    /// Energy that may be drawn now.
    pub fn available_wh(&self) -> Real {
        (self.level_wh - self.reserve_floor_wh).max(0.0)
    }

    /// Capacity above the reserve floor.
    pub fn usable_wh(&self) -> Real {
        (self.capacity_wh - self.reserve_floor_wh).max(0.0)
    }

    pub fn room_wh(&self) -> Real {
        (self.capacity_wh - self.level_wh).max(0.0)
    }

    pub fn state_of_charge(&self) -> Real {
        if self.capacity_wh > 0.0 {
            self.level_wh / self.capacity_wh
        } else {
            0.0
        }
    }

    fn clamp_level(&mut self) {
        self.level_wh = self.level_wh.clamp(0.0, self.capacity_wh.max(0.0));
    }
}

/// Where the boot energy came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum BootSource {
    Storage { energy_wh: Real },
    Ac { power_w: Real },
}

/// Result of one cycle's energy settlement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub breaker_output_w: Real,
    pub consumption_w: Real,
    /// Surplus (positive) or deficit actually covered (negative).
    pub net_w: Real,
    pub level_wh: Real,
    pub stored_wh: Real,
    pub drawn_wh: Real,
    /// Energy reaching the load from storage, after discharge losses.
    pub delivered_wh: Real,
    pub exported_w: Real,
    pub dissipated_w: Real,
    pub curtailed_w: Real,
    /// Storage could not cover the deficit; the load must drop to Idle.
    pub shortfall: bool,
}

#[derive(Debug, Clone)]
pub struct StorageArbiter {
    bank: StorageBank,
    breaker_efficiency: Real,
    max_discharge_w: Real,
    dissipation_sink_w: Real,
    export_port_w: Option<Real>,
    poll: PollSchedule,
}

impl StorageArbiter {
    pub fn from_def(def: &StorageDef) -> PlantResult<Self> {
        Ok(Self {
            bank: StorageBank {
                level_wh: def.initial_level_wh,
                capacity_wh: def.capacity_wh,
                reserve_floor_wh: def.reserve_floor_wh,
                degradation_threshold_wh: def.degradation_threshold_wh,
                charge_efficiency: def.charge_efficiency,
            },
            breaker_efficiency: def.breaker_efficiency,
            max_discharge_w: def.max_discharge_w,
            dissipation_sink_w: def.dissipation_sink_w,
            export_port_w: def.export_port_w,
            poll: PollSchedule::new(def.battery_poll_every_cycles)?,
        })
    }

    pub fn bank(&self) -> &StorageBank {
        &self.bank
    }

    pub fn level_wh(&self) -> Real {
        self.bank.level_wh
    }

    pub fn breaker_output_w(&self, generated_w: Real) -> Real {
        non_negative(generated_w) * self.breaker_efficiency
    }

    /// Power the load could draw this cycle: breaker output plus what storage
    /// can discharge over the interval.
    pub fn available_power_w(&self, breaker_output_w: Real, interval_s: Real) -> Real {
        let from_storage = power_w(self.bank.available_wh(), interval_s);
        breaker_output_w + from_storage.min(self.max_discharge_w)
    }

    /// Pay for booting the controller, from storage if it can, else from AC.
    pub fn boot(
        &mut self,
        boot_energy_wh: Real,
        ac_efficiency: Real,
        ctx: &mut CycleContext<'_>,
    ) -> BootSource {
        if self.bank.available_wh() < boot_energy_wh {
            let power = ctx.actuators.draw_ac_power(ac_efficiency);
            ctx.log.status(format!(
                "stored energy {:.3} Wh below boot energy {boot_energy_wh:.3} Wh, booting from AC at {power:.1} W",
                self.bank.available_wh()
            ));
            BootSource::Ac { power_w: power }
        } else {
            self.bank.level_wh -= boot_energy_wh;
            ctx.log.status(format!(
                "booted from storage using {boot_energy_wh:.3} Wh, {:.3} Wh remaining",
                self.bank.level_wh
            ));
            BootSource::Storage {
                energy_wh: boot_energy_wh,
            }
        }
    }

    /// Poll the battery health gauge if it is due this cycle.
    ///
    /// Reported capacity only ever lowers the bank's capacity. Returns
    /// whether a poll happened.
    pub fn poll_battery(&mut self, cycle: u64, ctx: &mut CycleContext<'_>) -> bool {
        if !self.poll.due(cycle) {
            return false;
        }
        let reported = ctx.read(SensorKind::BatteryCapacity);
        if reported.is_finite() && reported >= 0.0 && reported < self.bank.capacity_wh {
            ctx.log.diagnostic(format!(
                "battery capacity fell from {:.3} Wh to {reported:.3} Wh",
                self.bank.capacity_wh
            ));
            self.bank.capacity_wh = reported;
            self.bank.reserve_floor_wh = self.bank.reserve_floor_wh.min(reported);
            self.bank.clamp_level();
        }
        if self.bank.capacity_wh < self.bank.degradation_threshold_wh {
            ctx.warn(format!(
                "battery degraded: capacity {:.3} Wh below threshold {:.3} Wh, continuing at reduced capacity",
                self.bank.capacity_wh, self.bank.degradation_threshold_wh
            ));
        }
        true
    }

    /// Settle generation against consumption for one interval.
    ///
    /// `idle_draw_w` is what the Idle mode would need; it sizes the
    /// LowStorage fault raised on a shortfall.
    pub fn settle(
        &mut self,
        generated_w: Real,
        consumption_w: Real,
        idle_draw_w: Real,
        interval_s: Real,
        ctx: &mut CycleContext<'_>,
    ) -> Settlement {
        let breaker = self.breaker_output_w(generated_w);
        let consumption = non_negative(consumption_w);
        let mut out = Settlement {
            breaker_output_w: breaker,
            consumption_w: consumption,
            ..Settlement::default()
        };

        if breaker < consumption {
            let deficit_w = consumption - breaker;
            let needed_wh = energy_wh(deficit_w, interval_s);
            let available_wh = self.bank.available_wh();
            let drawn_wh = needed_wh.min(available_wh);
            self.bank.level_wh -= drawn_wh;
            out.drawn_wh = drawn_wh;
            out.delivered_wh = drawn_wh * self.bank.charge_efficiency;

            if needed_wh - drawn_wh > ENERGY_EPSILON_WH {
                out.shortfall = true;
                out.net_w = if drawn_wh > 0.0 {
                    -power_w(drawn_wh, interval_s)
                } else {
                    0.0
                };
                ctx.log.diagnostic(format!(
                    "storage shortfall: needed {needed_wh:.4} Wh, had {available_wh:.4} Wh above floor"
                ));
                ctx.raise(FaultKind::LowStorage {
                    available_wh,
                    idle_need_wh: energy_wh(non_negative(idle_draw_w), interval_s),
                });
            } else {
                out.net_w = -deficit_w;
            }
        } else if breaker > consumption {
            let excess_w = breaker - consumption;
            let excess_wh = energy_wh(excess_w, interval_s);
            let eff = self.bank.charge_efficiency;
            let stored_wh = (excess_wh * eff).min(self.bank.room_wh()).max(0.0);
            self.bank.level_wh += stored_wh;
            out.stored_wh = stored_wh;
            out.net_w = excess_w;

            let absorbed_wh = if eff > 0.0 { stored_wh / eff } else { 0.0 };
            let surplus_wh = (excess_wh - absorbed_wh).max(0.0);
            if surplus_wh > ENERGY_EPSILON_WH {
                self.route_surplus(power_w(surplus_wh, interval_s), &mut out, ctx);
            }
        }

        self.bank.clamp_level();
        out.level_wh = self.bank.level_wh;
        out
    }

    fn route_surplus(&self, surplus_w: Real, out: &mut Settlement, ctx: &mut CycleContext<'_>) {
        let exported = surplus_w.min(self.export_port_w.unwrap_or(0.0));
        if exported > 0.0 {
            ctx.actuators.redirect_power(exported);
        }
        let remaining = surplus_w - exported;
        let dissipated = remaining.min(self.dissipation_sink_w);
        if dissipated > 0.0 {
            ctx.actuators.dissipate_excess(dissipated);
        }
        let curtailed = remaining - dissipated;
        if curtailed > 1e-9 {
            ctx.warn(format!(
                "surplus {surplus_w:.2} W exceeds export and dissipation capacity, curtailing {curtailed:.2} W"
            ));
        }
        out.exported_w = exported;
        out.dissipated_w = dissipated;
        out.curtailed_w = curtailed.max(0.0);
    }
}
