//! Gesture episode classification and assembly.
//!
//! A gesture episode spans one primary-button press and release. While the
//! episode is live the pointer movement is classified as touch, long touch,
//! drag or fling; on release the episode is compiled into a [`Gesture`] of
//! timed path segments and handed to the collaborator, which owns actual
//! dispatch.

pub mod builder;
pub mod timing;

pub use builder::GestureBuilder;
pub use timing::GestureTiming;

/// Logical gesture actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureAction {
    Touch,
    LongTouch,
    Drag,
    Fling,
}

/// One timed straight-line segment of a completed gesture.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureStroke {
    pub from: (f32, f32),
    pub to: (f32, f32),
    /// Offset of this segment from the start of the gesture, milliseconds.
    pub start_offset_ms: u64,
    pub duration_ms: u64,
    /// The touch point stays down after this segment.
    pub continues: bool,
}

/// A finite, ordered description of one completed gesture episode.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Gesture {
    pub strokes: Vec<GestureStroke>,
}

impl Gesture {
    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    /// Total duration covered by the strokes, milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.strokes
            .last()
            .map(|stroke| stroke.start_offset_ms + stroke.duration_ms)
            .unwrap_or(0)
    }
}
