//! Fixed-cycle control loop and a simulated plant to run it against.
//!
//! Provides:
//! - The scheduler that runs every plant component once per cycle
//! - Per-cycle reports and run records, serializable to JSON
//! - A simulated apparatus with lagging valves and scheduled fault injection
//! - Pluggable end-of-cycle sleeping for real-time or accelerated runs

pub mod actuator;
pub mod clock;
pub mod error;
pub mod injection;
pub mod plant;
pub mod record;
pub mod scheduler;
pub mod sim;

pub use actuator::{FirstOrderActuator, ValveState};
pub use clock::{NoSleep, Sleeper, ThreadSleeper};
pub use error::{SimError, SimResult};
pub use injection::{Injection, InjectionKind, StallScope};
pub use plant::{PlantModel, SimActuators, SimPlant, SimSensors, SimTuning};
pub use record::{CycleEvent, CycleReport, RunRecord};
pub use scheduler::{Scheduler, SchedulerOptions};
pub use sim::{SimConfig, simulate, simulate_with_progress};
