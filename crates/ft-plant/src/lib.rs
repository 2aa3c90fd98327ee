//! ft-plant: control components for a ferrofluid heat-recovery loop.
//!
//! Components, each driven once per cycle by a scheduler:
//! - [`ThermalChain`]: heat available at each point along the loop
//! - [`GeneratorBank`]: thermoelectric output per point, with health checks
//! - [`FlowRegulator`]: magnet strength, flow trend and path switching
//! - [`StorageArbiter`]: breaker, storage, export and dissipation accounting
//! - [`LoadController`]: load mode ladder, throttling and overheat checks
//! - [`FaultManager`]: the only writer of [`SystemStatus`]
//!
//! Leaf components never fail at run time. They return degraded values and
//! report conditions through the [`CycleContext`] they are handed.

pub mod context;
pub mod controller;
pub mod error;
pub mod fault;
pub mod flow;
pub mod generator;
pub mod load;
pub mod status;
pub mod storage;
pub mod thermal;

#[cfg(test)]
pub(crate) mod test_support;

pub use context::CycleContext;
pub use controller::PlantController;
pub use error::{PlantError, PlantResult};
pub use fault::{FaultManager, RecoveryOutcome};
pub use flow::{FerrofluidLoop, FlowRegulator, FlowReport, Magnet};
pub use generator::{
    GenerationWarning, Generator, GeneratorBank, GeneratorHealth, GeneratorModel, HeatSplit,
    PowerEstimate, recovery_factor, split_heat,
};
pub use load::{ComponentDraw, LoadController, LoadMode, ModeKind};
pub use status::{FaultKind, SystemStatus};
pub use storage::{BootSource, Settlement, StorageArbiter, StorageBank};
pub use thermal::{HeatInputs, ThermalChain, ThermalStage};
