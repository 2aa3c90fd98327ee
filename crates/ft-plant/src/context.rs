use crate::fault::{FaultManager, RecoveryOutcome};
use crate::status::{FaultKind, SystemStatus};
use ft_controls::{ActuatorPort, LogSink, SensorKind, SensorPort};
use ft_core::Real;

/// Borrowed collaborators for one control cycle.
///
/// Components receive this instead of owning ports, so a single sensor,
/// actuator and log instance serves the whole loop.
pub struct CycleContext<'a> {
    pub sensors: &'a mut dyn SensorPort,
    pub actuators: &'a mut dyn ActuatorPort,
    pub log: &'a mut dyn LogSink,
    pub faults: &'a mut FaultManager,
}

impl<'a> CycleContext<'a> {
    pub fn new(
        sensors: &'a mut dyn SensorPort,
        actuators: &'a mut dyn ActuatorPort,
        log: &'a mut dyn LogSink,
        faults: &'a mut FaultManager,
    ) -> Self {
        Self {
            sensors,
            actuators,
            log,
            faults,
        }
    }

    pub fn read(&mut self, kind: SensorKind) -> Real {
        self.sensors.read(kind)
    }

    pub fn warn(&mut self, reason: String) {
        self.faults.warn(reason, &mut *self.log);
    }

    pub fn raise(&mut self, kind: FaultKind) -> RecoveryOutcome {
        self.faults.raise(kind, &mut *self.actuators, &mut *self.log)
    }

    pub fn status(&self) -> &SystemStatus {
        self.faults.status()
    }
}
