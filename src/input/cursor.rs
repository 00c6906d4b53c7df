//! Pointer position integration.

use tracing::trace;

/// Integrates filtered axis deflection into a bounded 2D pointer position.
///
/// Velocity is expressed in pixels per nanosecond and scaled so that a fully
/// deflected stick traverses the shorter viewport axis in `traversal_seconds`.
/// Timestamps come from the caller; the integrator holds no clock.
#[derive(Clone, Debug)]
pub struct CursorIntegrator {
    width: f32,
    height: f32,
    x: f32,
    y: f32,
    base_velocity: f32,
    fast_multiplier: f32,
    gap_threshold_ns: u64,
    last_update_ns: Option<u64>,
}

impl CursorIntegrator {
    pub fn new(
        width: f32,
        height: f32,
        traversal_seconds: f32,
        fast_multiplier: f32,
        gap_threshold_ms: u64,
    ) -> Self {
        let short_axis = if width < height { width } else { height };
        let pixels_per_second = short_axis / traversal_seconds;

        Self {
            width,
            height,
            // Pointer starts centered.
            x: width * 0.5,
            y: height * 0.5,
            base_velocity: pixels_per_second / 1e9,
            fast_multiplier,
            gap_threshold_ns: gap_threshold_ms * 1_000_000,
            last_update_ns: None,
        }
    }

    /// The current pointer X coordinate in pixels.
    pub fn x(&self) -> f32 {
        self.x
    }

    /// The current pointer Y coordinate in pixels.
    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    /// Applies one integration step. Returns the accepted position, or `None`
    /// when the step only re-anchors the timestamp: the first sample of a
    /// movement, and any sample after a gap long enough to indicate an
    /// intentional pause in input.
    pub fn tick(
        &mut self,
        x_deflection: f32,
        y_deflection: f32,
        is_fast: bool,
        now_ns: u64,
    ) -> Option<(f32, f32)> {
        let elapsed = self.last_update_ns.map(|last| now_ns - last).unwrap_or(0);
        self.last_update_ns = Some(now_ns);

        if elapsed > self.gap_threshold_ns || elapsed == 0 {
            return None;
        }

        let velocity = if is_fast {
            self.base_velocity * self.fast_multiplier
        } else {
            self.base_velocity
        };

        let dx = x_deflection * elapsed as f32 * velocity;
        let dy = y_deflection * elapsed as f32 * velocity;

        self.x = (self.x + dx).clamp(0.0, self.width);
        self.y = (self.y + dy).clamp(0.0, self.height);

        trace!(x = self.x, y = self.y, "pointer moved");
        Some((self.x, self.y))
    }

    /// Forgets the last update timestamp so the next tick starts a fresh
    /// movement.
    pub fn reset_timing(&mut self) {
        self.last_update_ns = None;
    }
}
