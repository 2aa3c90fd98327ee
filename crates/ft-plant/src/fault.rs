//! Fault raising, recovery and escalation.
//!
//! Components raise a [`FaultKind`] when a blocking condition persists. The
//! manager logs it, dispatches the matching recovery action, and settles the
//! system status:
//!
//! - recovery succeeds: back to Operational (or the fault already pending
//!   this cycle)
//! - a single-attempt recovery fails: the Fault stays and load falls to Idle
//! - a retried recovery fails twice: Critical, and the scheduler stops

use crate::status::{FaultKind, SystemStatus};
use ft_controls::{ActuatorPort, LogSink};

/// What happened to a raised fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    Recovered,
    Unrecovered,
    Escalated,
}

impl RecoveryOutcome {
    pub fn is_recovered(self) -> bool {
        matches!(self, Self::Recovered)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FaultManager {
    status: SystemStatus,
    raised_this_cycle: u32,
    total_raised: u64,
    total_recovered: u64,
}

impl FaultManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> &SystemStatus {
        &self.status
    }

    /// False once the system has gone Critical.
    pub fn is_running(&self) -> bool {
        !self.status.is_critical()
    }

    pub fn raised_this_cycle(&self) -> u32 {
        self.raised_this_cycle
    }

    pub fn total_raised(&self) -> u64 {
        self.total_raised
    }

    pub fn total_recovered(&self) -> u64 {
        self.total_recovered
    }

    /// Clear per-cycle conditions. Critical is sticky.
    pub fn begin_cycle(&mut self) {
        self.raised_this_cycle = 0;
        if !self.status.is_critical() {
            self.status = SystemStatus::Operational;
        }
    }

    /// Record a non-blocking condition. Never downgrades a Fault or Critical.
    pub fn warn(&mut self, reason: String, log: &mut dyn LogSink) {
        if matches!(
            self.status,
            SystemStatus::Operational | SystemStatus::Warning(_)
        ) {
            self.status = SystemStatus::Warning(reason.clone());
        }
        log.warning(reason);
    }

    /// Enter Critical directly, bypassing recovery.
    pub fn halt(&mut self, reason: String, log: &mut dyn LogSink) {
        log.error(format!("critical: {reason}"));
        self.status = SystemStatus::Critical(reason);
    }

    /// Raise a fault and run its recovery action.
    pub fn raise(
        &mut self,
        kind: FaultKind,
        actuators: &mut dyn ActuatorPort,
        log: &mut dyn LogSink,
    ) -> RecoveryOutcome {
        if self.status.is_critical() {
            return RecoveryOutcome::Escalated;
        }

        let prior = std::mem::replace(&mut self.status, SystemStatus::Fault(kind.clone()));
        self.raised_this_cycle += 1;
        self.total_raised += 1;
        log.error(format!("fault raised: {kind}"));

        let attempts = kind.recovery_attempts();
        for attempt in 1..=attempts {
            if recover(&kind, actuators) {
                self.total_recovered += 1;
                // Whatever this cycle reported before the fault still stands.
                self.status = prior;
                log.status(format!(
                    "recovered from {kind} (attempt {attempt}/{attempts})"
                ));
                return RecoveryOutcome::Recovered;
            }
            log.warning(format!(
                "recovery attempt {attempt}/{attempts} for {kind} failed"
            ));
        }

        if attempts > 1 {
            self.halt(
                format!("{kind} persisted after {attempts} recovery attempts"),
                log,
            );
            RecoveryOutcome::Escalated
        } else {
            RecoveryOutcome::Unrecovered
        }
    }
}

fn recover(kind: &FaultKind, actuators: &mut dyn ActuatorPort) -> bool {
    match kind {
        FaultKind::LowFlow { path } => actuators.flush_flow(*path),
        FaultKind::GeneratorFailure { point } => actuators.reset_generator(*point),
        FaultKind::MagnetFailure { point } => actuators.reset_magnet_charger(*point),
        FaultKind::Overheat { component } => actuators.force_cooling(*component),
        // Nothing to actuate: recovered only if storage can still carry Idle.
        FaultKind::LowStorage {
            available_wh,
            idle_need_wh,
        } => available_wh >= idle_need_wh,
    }
}
