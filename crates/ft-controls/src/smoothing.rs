//! Smoothing and latching primitives.

use crate::error::{ControlError, ControlResult};
use ft_core::Real;
use serde::{Deserialize, Serialize};

/// Exponential moving average.
///
/// Update: `value = (1 - alpha) * value + alpha * sample`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ema {
    alpha: Real,
    value: Real,
}

impl Ema {
    /// Create a smoother seeded with `initial`.
    ///
    /// # Errors
    ///
    /// Returns error if `alpha` is not in `(0, 1]`.
    pub fn new(alpha: Real, initial: Real) -> ControlResult<Self> {
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(ControlError::InvalidArg {
                what: "alpha must be in (0, 1]",
            });
        }
        Ok(Self {
            alpha,
            value: initial,
        })
    }

    /// Fold a new sample in and return the smoothed value.
    pub fn update(&mut self, sample: Real) -> Real {
        self.value = (1.0 - self.alpha) * self.value + self.alpha * sample;
        self.value
    }

    pub fn value(&self) -> Real {
        self.value
    }

    pub fn alpha(&self) -> Real {
        self.alpha
    }
}

/// Asymmetric latch on a falling quantity.
///
/// Latches when the value falls to `enter_at` or below; releases only once
/// it climbs to `exit_at` or above. Between the two the previous state holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HysteresisBand {
    pub enter_at: Real,
    pub exit_at: Real,
}

impl HysteresisBand {
    /// # Errors
    ///
    /// Returns error unless `enter_at < exit_at`.
    pub fn new(enter_at: Real, exit_at: Real) -> ControlResult<Self> {
        if !(enter_at < exit_at) {
            return Err(ControlError::InvalidArg {
                what: "enter_at must be below exit_at",
            });
        }
        Ok(Self { enter_at, exit_at })
    }

    /// Next latch state given the current value and the previous state.
    pub fn next(&self, value: Real, latched: bool) -> bool {
        if latched {
            value < self.exit_at
        } else {
            value <= self.enter_at
        }
    }
}
