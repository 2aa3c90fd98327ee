//! Collaborator ports and control primitives for ferrotherm.
//!
//! The control core never touches hardware directly. It reads scalars through
//! [`SensorPort`], issues commands and recovery actions through
//! [`ActuatorPort`], and records notable events through [`LogSink`].
//!
//! # Primitives
//!
//! - [`Ema`]: exponential smoothing used for the flow trend
//! - [`HysteresisBand`]: asymmetric enter/exit latch used for throttling
//! - [`PollSchedule`]: every-N-cycles gate used for battery health polling

pub mod actuator;
pub mod error;
pub mod log;
pub mod sampled;
pub mod sensor;
pub mod smoothing;

pub use actuator::{ActuatorPort, FlowPath};
pub use error::{ControlError, ControlResult};
pub use log::{LogEntry, LogSink, LogTag, MemorySink, TeeSink, TracingSink};
pub use sampled::PollSchedule;
pub use sensor::{SensorKind, SensorPort};
pub use smoothing::{Ema, HysteresisBand};
