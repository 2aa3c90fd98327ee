//! The fixed-cycle control loop.
//!
//! The scheduler owns the plant controller and its collaborators and runs
//! every component once per cycle in a fixed order. It is the only place
//! that decides whether the loop keeps running.

use crate::clock::Sleeper;
use crate::error::{SimError, SimResult};
use crate::record::{CycleEvent, CycleReport, RunRecord};
use ft_controls::{ActuatorPort, LogSink, SensorKind, SensorPort};
use ft_core::Real;
use ft_plant::{BootSource, CycleContext, HeatInputs, PlantController, SystemStatus};
use std::time::Duration;

/// Options for a scheduler run.
#[derive(Clone, Debug)]
pub struct SchedulerOptions {
    /// Stop after this many cycles. `None` runs until Critical.
    pub max_cycles: Option<u64>,
    /// Keep every N-th cycle report (the last one is always kept).
    pub record_every: u64,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            max_cycles: Some(100),
            record_every: 1,
        }
    }
}

pub struct Scheduler<S, A, L, C> {
    plant: PlantController,
    sensors: S,
    actuators: A,
    log: L,
    sleeper: C,
    cycle: u64,
    elapsed_s: Real,
    last_generated_w: Real,
    boot: Option<BootSource>,
}

impl<S, A, L, C> Scheduler<S, A, L, C>
where
    S: SensorPort,
    A: ActuatorPort,
    L: LogSink,
    C: Sleeper,
{
    pub fn new(plant: PlantController, sensors: S, actuators: A, log: L, sleeper: C) -> Self {
        let elapsed_s = plant.schedule.cycle_time_s;
        Self {
            plant,
            sensors,
            actuators,
            log,
            sleeper,
            cycle: 0,
            elapsed_s,
            last_generated_w: 0.0,
            boot: None,
        }
    }

    pub fn plant(&self) -> &PlantController {
        &self.plant
    }

    pub fn sensors(&self) -> &S {
        &self.sensors
    }

    pub fn actuators(&self) -> &A {
        &self.actuators
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    pub fn sleeper(&self) -> &C {
        &self.sleeper
    }

    pub fn status(&self) -> &SystemStatus {
        self.plant.status()
    }

    /// Cycles completed so far.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn into_parts(self) -> (PlantController, S, A, L, C) {
        (
            self.plant,
            self.sensors,
            self.actuators,
            self.log,
            self.sleeper,
        )
    }

    /// Pay the boot energy once. Later calls return the first result.
    pub fn boot(&mut self) -> BootSource {
        if let Some(boot) = self.boot {
            return boot;
        }
        let PlantController {
            storage,
            faults,
            schedule,
            ..
        } = &mut self.plant;
        let mut ctx = CycleContext::new(
            &mut self.sensors,
            &mut self.actuators,
            &mut self.log,
            faults,
        );
        let boot = storage.boot(schedule.boot_energy_wh, schedule.ac_efficiency, &mut ctx);
        self.boot = Some(boot);
        boot
    }

    /// Run one control cycle without sleeping.
    pub fn step(&mut self) -> CycleReport {
        let cycle = self.cycle;
        let interval_s = self.elapsed_s;
        let PlantController {
            chain,
            generators,
            flow,
            storage,
            load,
            faults,
            ..
        } = &mut self.plant;
        faults.begin_cycle();
        let mut ctx = CycleContext::new(
            &mut self.sensors,
            &mut self.actuators,
            &mut self.log,
            faults,
        );

        // Battery health poll.
        if storage.poll_battery(cycle, &mut ctx) {
            load.track_capacity(storage.bank());
        }

        // Pre-select on last cycle's generation.
        let level = storage.level_wh();
        let expected = storage.breaker_output_w(self.last_generated_w);
        let available = storage.available_power_w(expected, interval_s);
        let mode = load.select_mode(level, available, load.current(), ctx.status());
        load.apply_mode(mode, &mut *ctx.log);

        load.update_throttles(level, &mut *ctx.log);
        load.check_temperatures(&mut ctx);

        let running = load.effective_mode();
        let inputs = HeatInputs {
            cpu_power_w: running.cpu_w(),
            gpu_power_w: running.gpu_w(),
            waste_heat_w: ctx.read(SensorKind::AmbientWasteHeat),
        };
        let point_heat_w = chain.compute_point_heats(&inputs, flow.flow_rate());
        let flow_report = flow.monitor_flow(&point_heat_w, &mut ctx);
        let point_power_w = generators.generate_all(&point_heat_w, flow_report.flow_rate, &mut ctx);
        let generated_w: Real = point_power_w.iter().sum();

        // Final selection on this cycle's generation, net of magnet draw.
        let breaker = storage.breaker_output_w(generated_w);
        let available =
            storage.available_power_w(breaker, interval_s) - flow_report.magnet_power_w;
        let mode = load.select_mode(storage.level_wh(), available, load.current(), ctx.status());
        load.apply_mode(mode, &mut *ctx.log);

        let consumption_w = load.consumption_w() + flow_report.magnet_power_w;
        let settlement = storage.settle(
            generated_w,
            consumption_w,
            load.idle().total_w(),
            interval_s,
            &mut ctx,
        );

        // Low-storage check.
        if settlement.shortfall {
            let idle = load.idle().clone();
            load.apply_mode(idle, &mut *ctx.log);
        } else if storage.level_wh() <= load.min_storage_threshold_wh() {
            ctx.warn(format!(
                "storage {:.3} Wh at or below minimum {:.3} Wh",
                storage.level_wh(),
                load.min_storage_threshold_wh()
            ));
        }

        let drawn = load.effective_mode();
        let report = CycleReport {
            cycle,
            status: ctx.status().clone(),
            mode: load.current().kind,
            mode_name: load.current().name.clone(),
            cpu_throttled: load.is_throttled(ft_config::Subcomponent::Cpu),
            gpu_throttled: load.is_throttled(ft_config::Subcomponent::Gpu),
            cpu_w: drawn.cpu_w(),
            gpu_w: drawn.gpu_w(),
            point_heat_w,
            point_power_w,
            generated_w,
            magnet_power_w: flow_report.magnet_power_w,
            flow_rate: flow_report.flow_rate,
            flow_trend: flow_report.flow_trend,
            active_path: flow_report.active_path,
            consumption_w: settlement.consumption_w,
            breaker_output_w: settlement.breaker_output_w,
            net_w: settlement.net_w,
            storage_level_wh: settlement.level_wh,
            storage_capacity_wh: storage.bank().capacity_wh,
            exported_w: settlement.exported_w,
            dissipated_w: settlement.dissipated_w,
            curtailed_w: settlement.curtailed_w,
            interval_s,
        };
        ctx.log.status(report.summary());
        ctx.log.diagnostic(format!(
            "cycle {cycle}: flow {:.3} (trend {:.3}, target {:.3}) on {} path, magnets {:.2} W",
            flow_report.flow_rate,
            flow_report.flow_trend,
            flow_report.flow_target,
            flow_report.active_path,
            flow_report.magnet_power_w
        ));

        self.last_generated_w = generated_w;
        self.cycle += 1;
        report
    }

    pub fn run(&mut self, opts: &SchedulerOptions) -> SimResult<RunRecord> {
        self.run_with_progress(opts, None)
    }

    /// Boot, then cycle until Critical or `max_cycles`.
    pub fn run_with_progress(
        &mut self,
        opts: &SchedulerOptions,
        mut progress: Option<&mut dyn FnMut(CycleEvent<'_>)>,
    ) -> SimResult<RunRecord> {
        if opts.max_cycles == Some(0) {
            return Err(SimError::InvalidArg {
                what: "max_cycles must be positive",
            });
        }
        if opts.record_every == 0 {
            return Err(SimError::InvalidArg {
                what: "record_every must be positive",
            });
        }

        let boot = self.boot();
        let first_cycle = self.cycle;
        let mut reports = Vec::new();
        let mut shutdown_reason = None;

        loop {
            if let Some(max) = opts.max_cycles {
                if self.cycle - first_cycle >= max {
                    break;
                }
            }
            if let Some(cb) = progress.as_mut() {
                cb(CycleEvent::Started { cycle: self.cycle });
            }
            let report = self.step();
            if let Some(cb) = progress.as_mut() {
                cb(CycleEvent::Finished { report: &report });
            }

            let halted = match self.plant.status() {
                SystemStatus::Critical(reason) => Some(reason.clone()),
                _ => None,
            };
            let last = halted.is_some()
                || opts
                    .max_cycles
                    .is_some_and(|max| self.cycle - first_cycle >= max);
            if last || report.cycle % opts.record_every == 0 {
                reports.push(report);
            }
            if let Some(reason) = halted {
                self.log.error(format!("shutting down: {reason}"));
                shutdown_reason = Some(reason);
                break;
            }

            let wait_s = self.plant.cycle_interval_s();
            self.elapsed_s = wait_s;
            if !last {
                let wait = Duration::try_from_secs_f64(wait_s).map_err(|_| SimError::InvalidArg {
                    what: "cycle interval is not a representable duration",
                })?;
                self.sleeper.sleep(wait);
            }
        }

        let cycles_run = self.cycle - first_cycle;
        self.log.status(format!(
            "controller stopped after {cycles_run} cycles, status {}",
            self.plant.status()
        ));
        Ok(RunRecord {
            profile: self.plant.name.clone(),
            boot,
            cycles_run,
            reports,
            final_status: self.plant.status().clone(),
            final_level_wh: self.plant.storage.level_wh(),
            shutdown_reason,
        })
    }
}
