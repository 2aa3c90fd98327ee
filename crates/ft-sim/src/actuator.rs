//! Valve actuator with first-order dynamics and rate limiting.

use crate::error::{SimError, SimResult};

/// Position of a flow-control valve, as a fraction of full opening.
#[derive(Clone, Debug, PartialEq)]
pub struct ValveState {
    pub position: f64,
}

/// First-order actuator with rate limiting.
///
/// Dynamics: dpos/dt = (cmd - pos) / tau, clamped to [-rate_limit, rate_limit].
#[derive(Clone, Debug)]
pub struct FirstOrderActuator {
    /// Time constant (seconds)
    pub tau: f64,
    /// Rate limit (1/second), must be positive
    pub rate_limit: f64,
}

impl FirstOrderActuator {
    pub fn new(tau: f64, rate_limit: f64) -> SimResult<Self> {
        if !(tau > 0.0) {
            return Err(SimError::InvalidArg {
                what: "tau must be positive",
            });
        }
        if !(rate_limit > 0.0) {
            return Err(SimError::InvalidArg {
                what: "rate_limit must be positive",
            });
        }
        Ok(Self { tau, rate_limit })
    }

    pub fn dpdt(&self, position: f64, command: f64) -> f64 {
        let raw = (command - position) / self.tau;
        raw.clamp(-self.rate_limit, self.rate_limit)
    }

    /// Advance a valve by `dt` seconds toward `command`.
    ///
    /// Long intervals are split into substeps no longer than `tau` so the
    /// valve settles on the command instead of overshooting it.
    pub fn step(&self, state: &ValveState, dt: f64, command: f64) -> ValveState {
        let command = command.clamp(0.0, 1.0);
        let substeps = (dt / self.tau).ceil().max(1.0) as u32;
        let h = dt / substeps as f64;
        let mut position = state.position;
        for _ in 0..substeps {
            position = (position + self.dpdt(position, command) * h).clamp(0.0, 1.0);
        }
        ValveState { position }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_parameters() {
        assert!(FirstOrderActuator::new(0.0, 1.0).is_err());
        assert!(FirstOrderActuator::new(1.0, -1.0).is_err());
        assert!(FirstOrderActuator::new(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn rate_limiting() {
        let act = FirstOrderActuator::new(1.0, 0.5).unwrap();
        assert!((act.dpdt(0.0, 1.0) - 0.5).abs() < 1e-10);
    }

    #[test]
    fn valve_lags_command() {
        let act = FirstOrderActuator::new(2.0, 0.2).unwrap();
        let state = act.step(&ValveState { position: 0.5 }, 1.0, 1.0);
        assert!(state.position > 0.5);
        assert!(state.position <= 0.7 + 1e-12);
    }

    #[test]
    fn long_interval_settles_without_overshoot() {
        let act = FirstOrderActuator::new(0.5, 10.0).unwrap();
        let state = act.step(&ValveState { position: 0.2 }, 30.0, 0.8);
        assert!(state.position <= 0.8 + 1e-9);
        assert!((state.position - 0.8).abs() < 1e-3);
    }

    #[test]
    fn position_clamped() {
        let act = FirstOrderActuator::new(0.01, 100.0).unwrap();
        let up = act.step(&ValveState { position: 0.5 }, 0.1, 2.0);
        assert!(up.position <= 1.0);
        let down = act.step(&ValveState { position: 0.5 }, 0.1, -1.0);
        assert!(down.position >= 0.0);
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn step_stays_open_range_and_approaches_command(
            start in 0.0..=1.0f64,
            command in -0.5..1.5f64,
            dt in 0.01..20.0f64,
        ) {
            let act = FirstOrderActuator::new(2.0, 0.25).unwrap();
            let next = act.step(&ValveState { position: start }, dt, command);
            prop_assert!((0.0..=1.0).contains(&next.position));
            let target = command.clamp(0.0, 1.0);
            prop_assert!((next.position - target).abs() <= (start - target).abs() + 1e-12);
        }
    }
}
