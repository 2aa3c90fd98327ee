//! Closed-loop runs against the simulated plant.

use crate::clock::Sleeper;
use crate::error::SimResult;
use crate::injection::Injection;
use crate::plant::{SimPlant, SimTuning};
use crate::record::{CycleEvent, RunRecord};
use crate::scheduler::{Scheduler, SchedulerOptions};
use ft_config::PlantProfile;
use ft_controls::LogSink;
use ft_plant::PlantController;
use tracing::info;

/// Everything a simulated run needs besides the profile.
#[derive(Clone, Debug, Default)]
pub struct SimConfig {
    pub options: SchedulerOptions,
    pub injections: Vec<Injection>,
    pub tuning: SimTuning,
}

impl SimConfig {
    pub fn with_cycles(cycles: u64) -> Self {
        Self {
            options: SchedulerOptions {
                max_cycles: Some(cycles),
                ..SchedulerOptions::default()
            },
            ..Self::default()
        }
    }

    /// Add injections written as `KIND[:ARG]@START[+DURATION]`.
    pub fn inject<I, S>(mut self, specs: I) -> SimResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for spec in specs {
            self.injections.push(spec.as_ref().parse()?);
        }
        Ok(self)
    }
}

/// Run the controller against a simulated plant built from the same profile.
pub fn simulate<L: LogSink, C: Sleeper>(
    profile: &PlantProfile,
    config: &SimConfig,
    log: L,
    sleeper: C,
) -> SimResult<RunRecord> {
    simulate_with_progress(profile, config, log, sleeper, None)
}

/// Like [`simulate`], reporting each cycle to `progress` after the plant
/// has seen it.
pub fn simulate_with_progress<L: LogSink, C: Sleeper>(
    profile: &PlantProfile,
    config: &SimConfig,
    log: L,
    sleeper: C,
    mut progress: Option<&mut dyn FnMut(CycleEvent<'_>)>,
) -> SimResult<RunRecord> {
    let controller = PlantController::from_profile(profile)?;
    let plant = SimPlant::new(profile, config.tuning.clone(), config.injections.clone())?;
    info!(
        profile = %profile.name,
        points = profile.point_count(),
        injections = config.injections.len(),
        "starting simulated run"
    );

    let mut scheduler = Scheduler::new(controller, plant.sensors(), plant.actuators(), log, sleeper);
    let mut observe = |event: CycleEvent<'_>| {
        plant.observe(event);
        if let Some(cb) = progress.as_mut() {
            cb(event);
        }
    };
    let record = scheduler.run_with_progress(&config.options, Some(&mut observe))?;

    info!(
        cycles = record.cycles_run,
        status = %record.final_status,
        level_wh = record.final_level_wh,
        "simulated run finished"
    );
    Ok(record)
}
