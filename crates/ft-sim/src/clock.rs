//! End-of-cycle waiting.
//!
//! The sleep is the only suspension point of the loop. It goes through
//! [`Sleeper`] so runs can be accelerated or driven from tests.

use std::time::Duration;

pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

/// Blocks the thread for the requested time.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Returns immediately, accumulating the time that would have passed.
#[derive(Debug, Default, Clone)]
pub struct NoSleep {
    slept: Duration,
    calls: u64,
}

impl NoSleep {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> Duration {
        self.slept
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl Sleeper for NoSleep {
    fn sleep(&mut self, duration: Duration) {
        self.slept += duration;
        self.calls += 1;
    }
}

impl<T: Sleeper + ?Sized> Sleeper for &mut T {
    fn sleep(&mut self, duration: Duration) {
        (**self).sleep(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_sleep_accumulates() {
        let mut s = NoSleep::new();
        s.sleep(Duration::from_secs(1));
        s.sleep(Duration::from_millis(500));
        assert_eq!(s.total(), Duration::from_millis(1500));
        assert_eq!(s.calls(), 2);
    }
}
