//! Monotonic nanosecond clock, injectable for testing.

use std::time::Instant;

/// Clock providing nanosecond precision timestamps that may be used to measure
/// differences in time. Values are monotonic and have no defined epoch.
pub trait NanoClock: Send + Sync {
    /// Returns the current clock value in nanoseconds.
    fn nanos(&self) -> u64;
}

/// Production clock backed by [`Instant`].
#[derive(Debug)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl NanoClock for MonotonicClock {
    fn nanos(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }
}
