//! Cycle timing primitives.
//!
//! Some work runs only every N cycles.

use crate::error::{ControlError, ControlResult};
use serde::{Deserialize, Serialize};

/// Gate that opens on the first cycle and every `every` cycles after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSchedule {
    every: u64,
}

impl PollSchedule {
    pub fn new(every: u64) -> ControlResult<Self> {
        if every == 0 {
            return Err(ControlError::InvalidArg {
                what: "poll period must be at least one cycle",
            });
        }
        Ok(Self { every })
    }

    /// Whether work is due on 0-based cycle `cycle`.
    pub fn due(&self, cycle: u64) -> bool {
        cycle % self.every == 0
    }

    pub fn every(&self) -> u64 {
        self.every
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_schedule_gates_cycles() {
        let poll = PollSchedule::new(10).unwrap();
        assert!(poll.due(0));
        assert!(!poll.due(1));
        assert!(!poll.due(9));
        assert!(poll.due(10));
        assert!(poll.due(20));
        assert!(PollSchedule::new(0).is_err());
    }
}
