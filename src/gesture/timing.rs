//! Duration rules for compiled gestures.

use crate::config::Config;

/// Provides the distance between two 2D points.
pub fn distance(from: (f32, f32), to: (f32, f32)) -> f32 {
    distance_squared(from, to).sqrt()
}

/// Provides the squared distance between two 2D points.
pub fn distance_squared(from: (f32, f32), to: (f32, f32)) -> f32 {
    let dx = from.0 - to.0;
    let dy = from.1 - to.1;
    dx * dx + dy * dy
}

/// Converts distances into gesture durations using the platform fling
/// velocity range.
#[derive(Clone, Copy, Debug)]
pub struct GestureTiming {
    /// Milliseconds per pixel at the minimum fling velocity.
    min_fling_ms_per_px: f32,
    /// Milliseconds per pixel at the maximum fling velocity.
    max_fling_ms_per_px: f32,
    pub long_touch_threshold_ms: u64,
    pub max_gesture_duration_ms: u64,
}

impl GestureTiming {
    pub fn new(
        min_fling_velocity: f32,
        max_fling_velocity: f32,
        long_touch_threshold_ms: u64,
        max_gesture_duration_ms: u64,
    ) -> Self {
        Self {
            min_fling_ms_per_px: (1.0 / min_fling_velocity) * 1000.0,
            max_fling_ms_per_px: (1.0 / max_fling_velocity) * 1000.0,
            long_touch_threshold_ms,
            max_gesture_duration_ms,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.min_fling_velocity,
            config.max_fling_velocity,
            config.long_touch_threshold_ms,
            config.max_gesture_duration_ms,
        )
    }

    /// Time in milliseconds for a gesture between the given points to read as
    /// a drag and not a fling: just slower than the minimum fling velocity.
    pub fn drag_time_between(&self, from: (f32, f32), to: (f32, f32)) -> u64 {
        let min_fling_time = (distance(from, to) * self.min_fling_ms_per_px) as i64;
        (min_fling_time - 10).max(1) as u64
    }

    /// Time in milliseconds for a gesture between the given points to read as
    /// a fling.
    pub fn fling_time_between(&self, from: (f32, f32), to: (f32, f32)) -> u64 {
        ((distance(from, to) * self.max_fling_ms_per_px) as u64).max(1)
    }
}
