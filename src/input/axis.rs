//! Analog axis filtering and axis-to-button synthesis.

use crate::input::button::ButtonCode;
use tracing::debug;

/// Opaque identifier for one analog axis of an input device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AxisId(pub u16);

impl AxisId {
    pub const LEFT_X: AxisId = AxisId(0);
    pub const LEFT_Y: AxisId = AxisId(1);
    pub const RIGHT_X: AxisId = AxisId(2);
    pub const RIGHT_Y: AxisId = AxisId(3);
    pub const LEFT_TRIGGER: AxisId = AxisId(4);
    pub const RIGHT_TRIGGER: AxisId = AxisId(5);
    pub const HAT_X: AxisId = AxisId(6);
    pub const HAT_Y: AxisId = AxisId(7);
}

/// Deadzone and noise filter for one analog axis.
///
/// Filtering is two stage: raw samples within `fuzz` of the previous raw value
/// are rejected outright, and only then is the deadzone (`flat`) applied to
/// produce the corrected deflection. Rejecting noise first keeps a stick that
/// dwells just outside the deadzone boundary from hair-triggering updates.
#[derive(Clone, Debug)]
pub struct AxisFilter {
    axis: AxisId,
    flat: f32,
    fuzz: f32,
    raw_value: f32,
    deflection: f32,
}

impl AxisFilter {
    pub fn new(axis: AxisId, flat: f32, fuzz: f32) -> Self {
        Self {
            axis,
            flat,
            fuzz,
            raw_value: 0.0,
            deflection: 0.0,
        }
    }

    pub fn axis(&self) -> AxisId {
        self.axis
    }

    /// The filtered deflection of this axis, between -1 and 1.
    pub fn deflection(&self) -> f32 {
        self.deflection
    }

    /// Feeds one raw sample. Returns true if the deflection was substantively
    /// modified.
    pub fn update(&mut self, value: f32) -> bool {
        if (value - self.raw_value).abs() <= self.fuzz {
            return false;
        }
        self.raw_value = value;

        let corrected = if self.raw_value.abs() < self.flat {
            0.0
        } else {
            self.raw_value
        };
        if corrected == self.deflection {
            return false;
        }

        debug!(axis = self.axis.0, deflection = corrected, "axis deflection changed");
        self.deflection = corrected;
        true
    }
}

/// Maps a filtered axis onto one or two binary button signals.
///
/// Triggers and hat axes behave like buttons downstream. With
/// `latch_until_zero` set, a pressed side stays pressed until the deflection
/// returns to zero or reverses sign; passing back through the threshold alone
/// does not release it. Gesture dispatch downstream is sensitive to spurious
/// release/press bounces, which is what the latch suppresses.
#[derive(Clone, Debug)]
pub struct AxisButtonMapper {
    filter: AxisFilter,
    positive_code: ButtonCode,
    negative_code: Option<ButtonCode>,
    press_threshold: f32,
    latch_until_zero: bool,
    positive_pressed: bool,
    negative_pressed: bool,
}

impl AxisButtonMapper {
    pub fn new(
        filter: AxisFilter,
        positive_code: ButtonCode,
        negative_code: Option<ButtonCode>,
        press_threshold: f32,
        latch_until_zero: bool,
    ) -> Self {
        Self {
            filter,
            positive_code,
            negative_code,
            press_threshold,
            latch_until_zero,
            positive_pressed: false,
            negative_pressed: false,
        }
    }

    pub fn axis(&self) -> AxisId {
        self.filter.axis()
    }

    pub fn positive_code(&self) -> ButtonCode {
        self.positive_code
    }

    pub fn negative_code(&self) -> Option<ButtonCode> {
        self.negative_code
    }

    pub fn is_positive_pressed(&self) -> bool {
        self.positive_pressed
    }

    pub fn is_negative_pressed(&self) -> bool {
        self.negative_pressed
    }

    /// Feeds one raw sample and updates whether this axis represents a pressed
    /// button. Returns true if the positive or negative press states changed.
    pub fn update(&mut self, value: f32) -> bool {
        if !self.filter.update(value) {
            return false;
        }

        let deflection = self.filter.deflection();
        let mut changed = false;

        let past_positive = deflection >= self.press_threshold;
        if !self.positive_pressed {
            if past_positive {
                self.positive_pressed = true;
                changed = true;
            }
        } else if self.latch_until_zero {
            if deflection <= 0.0 {
                self.positive_pressed = false;
                changed = true;
            }
        } else if !past_positive {
            self.positive_pressed = false;
            changed = true;
        }

        if self.negative_code.is_some() {
            let past_negative = deflection <= -self.press_threshold;
            if !self.negative_pressed {
                if past_negative {
                    self.negative_pressed = true;
                    changed = true;
                }
            } else if self.latch_until_zero {
                if deflection >= 0.0 {
                    self.negative_pressed = false;
                    changed = true;
                }
            } else if !past_negative {
                self.negative_pressed = false;
                changed = true;
            }
        }

        changed
    }
}
