//! Compiles one pointer episode into a classified, timed gesture.

use crate::gesture::timing::{self, GestureTiming};
use crate::gesture::{Gesture, GestureAction, GestureStroke};
use tracing::debug;

/// Classifies a live pointer episode and assembles its [`Gesture`].
///
/// Classification is recomputed on demand from the episode's last segment
/// endpoint and the current pointer position, so it can regress: a pointer
/// that wanders past the drag threshold and returns to its origin reads as a
/// touch again.
#[derive(Clone, Debug)]
pub struct GestureBuilder {
    start: (f32, f32),
    start_ns: u64,
    /// Endpoint and timestamp of the most recently compiled segment.
    last_event: (f32, f32),
    last_event_ns: u64,

    live_action: GestureAction,

    /// Forces a drag gesture to be treated as a fling.
    drag_is_fling: bool,

    drag_distance_squared: f32,
    fling_distance_squared: f32,
    use_distance_based_fling: bool,
    timing: GestureTiming,

    strokes: Vec<GestureStroke>,
}

impl GestureBuilder {
    pub fn new(
        start: (f32, f32),
        start_ns: u64,
        drag_distance_px: f32,
        fling_distance_px: f32,
        use_distance_based_fling: bool,
        timing: GestureTiming,
    ) -> Self {
        Self {
            start,
            start_ns,
            last_event: start,
            last_event_ns: start_ns,
            live_action: GestureAction::Touch,
            drag_is_fling: false,
            drag_distance_squared: drag_distance_px * drag_distance_px,
            fling_distance_squared: fling_distance_px * fling_distance_px,
            use_distance_based_fling,
            timing,
            strokes: Vec::new(),
        }
    }

    pub fn drag_is_fling(&self) -> bool {
        self.drag_is_fling
    }

    /// Toggles the forced drag-to-fling conversion for this episode.
    pub fn toggle_drag_is_fling(&mut self) {
        self.drag_is_fling = !self.drag_is_fling;
    }

    /// Classifies the episode for the given pointer position and time.
    ///
    /// The distance-based fling check runs before the forced-fling toggle;
    /// both paths are deliberately independent.
    pub fn classify(&self, position: (f32, f32), now_ns: u64) -> GestureAction {
        let distance_squared = timing::distance_squared(self.last_event, position);

        if self.use_distance_based_fling && distance_squared >= self.fling_distance_squared {
            return GestureAction::Fling;
        }

        if distance_squared >= self.drag_distance_squared {
            if self.drag_is_fling {
                return GestureAction::Fling;
            }
            return GestureAction::Drag;
        }

        if self.elapsed_ms(now_ns) >= self.timing.long_touch_threshold_ms {
            return GestureAction::LongTouch;
        }
        GestureAction::Touch
    }

    /// The logical action currently represented by this episode.
    pub fn action(&self, now_ns: u64) -> GestureAction {
        if self.live_action == GestureAction::Touch
            && self.elapsed_ms(now_ns) >= self.timing.long_touch_threshold_ms
        {
            return GestureAction::LongTouch;
        }
        self.live_action
    }

    /// Reports a pointer move, refreshing the live classification.
    pub fn cursor_move(&mut self, position: (f32, f32), now_ns: u64) {
        self.live_action = self.classify(position, now_ns);
    }

    /// Closes the segment from the last endpoint to `position`.
    ///
    /// Drags are timed from the episode origin at just under the minimum
    /// fling velocity so slower movement reads as a bounded, believable drag;
    /// flings at the maximum fling velocity; touches take their real elapsed
    /// time, clamped into `[1, max_gesture_duration]`.
    pub fn end_segment(&mut self, position: (f32, f32), now_ns: u64, continues: bool) {
        let duration_ms = match self.classify(position, now_ns) {
            GestureAction::Drag => self.timing.drag_time_between(self.start, position),
            GestureAction::Fling => self.timing.fling_time_between(self.start, position),
            GestureAction::Touch | GestureAction::LongTouch => self
                .elapsed_ms(now_ns)
                .clamp(1, self.timing.max_gesture_duration_ms),
        };

        let start_offset_ms = self
            .strokes
            .last()
            .map(|stroke| stroke.start_offset_ms + stroke.duration_ms)
            .unwrap_or(0);

        debug!(
            from = ?self.last_event,
            to = ?position,
            start_offset_ms,
            duration_ms,
            "ending gesture segment"
        );

        self.strokes.push(GestureStroke {
            from: self.last_event,
            to: position,
            start_offset_ms,
            duration_ms,
            continues,
        });

        self.last_event = position;
        self.last_event_ns = now_ns;
    }

    /// Hands over the compiled gesture.
    pub fn finish(self) -> Gesture {
        Gesture {
            strokes: self.strokes,
        }
    }

    fn elapsed_ms(&self, now_ns: u64) -> u64 {
        (now_ns - self.start_ns) / 1_000_000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: u64 = 1_000_000;

    fn builder(use_distance_based_fling: bool) -> GestureBuilder {
        GestureBuilder::new(
            (0.0, 0.0),
            0,
            20.0,
            150.0,
            use_distance_based_fling,
            GestureTiming::new(50.0, 8000.0, 500, 59_999),
        )
    }

    #[test]
    fn motionless_episode_is_a_touch() {
        let sut = builder(false);
        assert_eq!(sut.classify((0.0, 0.0), 100 * MS), GestureAction::Touch);
    }

    #[test]
    fn motionless_episode_promotes_to_long_touch() {
        let sut = builder(false);
        assert_eq!(sut.classify((0.0, 0.0), 600 * MS), GestureAction::LongTouch);
        assert_eq!(sut.action(600 * MS), GestureAction::LongTouch);
    }

    #[test]
    fn movement_below_drag_threshold_is_a_touch() {
        let sut = builder(false);
        assert_eq!(sut.classify((0.0, 19.0), 100 * MS), GestureAction::Touch);
    }

    #[test]
    fn movement_at_drag_threshold_is_a_drag() {
        let sut = builder(false);
        assert_eq!(sut.classify((0.0, 20.0), 100 * MS), GestureAction::Drag);
    }

    #[test]
    fn distance_based_strategy_reports_fling_at_fling_threshold() {
        let sut = builder(true);
        assert_eq!(sut.classify((0.0, 150.0), 100 * MS), GestureAction::Fling);
    }

    #[test]
    fn without_distance_strategy_large_movement_is_a_drag() {
        let sut = builder(false);
        assert_eq!(sut.classify((0.0, 150.0), 100 * MS), GestureAction::Drag);
    }

    #[test]
    fn forced_fling_converts_drags_only() {
        let mut sut = builder(false);
        sut.toggle_drag_is_fling();

        assert_eq!(sut.classify((0.0, 20.0), 100 * MS), GestureAction::Fling);
        assert_eq!(sut.classify((0.0, 5.0), 100 * MS), GestureAction::Touch);
    }

    #[test]
    fn classification_can_regress_to_touch() {
        let mut sut = builder(false);
        sut.cursor_move((0.0, 30.0), 100 * MS);
        assert_eq!(sut.action(100 * MS), GestureAction::Drag);

        sut.cursor_move((0.0, 1.0), 200 * MS);
        assert_eq!(sut.action(200 * MS), GestureAction::Touch);
    }

    #[test]
    fn touch_segment_duration_is_elapsed_time() {
        let mut sut = builder(false);
        sut.end_segment((0.0, 0.0), 250 * MS, false);

        let gesture = sut.finish();
        assert_eq!(gesture.strokes.len(), 1);
        assert_eq!(gesture.strokes[0].duration_ms, 250);
        assert_eq!(gesture.strokes[0].from, (0.0, 0.0));
        assert_eq!(gesture.strokes[0].to, (0.0, 0.0));
        assert!(!gesture.strokes[0].continues);
    }

    #[test]
    fn touch_segment_duration_is_clamped_to_max() {
        let mut sut = builder(false);
        sut.end_segment((0.0, 0.0), 90_000 * MS, false);

        assert_eq!(sut.finish().strokes[0].duration_ms, 59_999);
    }

    #[test]
    fn instantaneous_release_still_lasts_one_millisecond() {
        let mut sut = builder(false);
        sut.end_segment((0.0, 0.0), 0, false);

        assert_eq!(sut.finish().strokes[0].duration_ms, 1);
    }

    #[test]
    fn drag_segment_duration_derives_from_distance() {
        let mut sut = builder(false);
        sut.end_segment((100.0, 0.0), 100 * MS, false);

        // 100 px at the 50 px/s minimum fling velocity, minus the 10 ms guard.
        assert_eq!(sut.finish().strokes[0].duration_ms, 1990);
    }

    #[test]
    fn fling_segment_duration_derives_from_distance() {
        let mut sut = builder(true);
        sut.end_segment((200.0, 0.0), 100 * MS, false);

        // 200 px at the 8000 px/s maximum fling velocity.
        assert_eq!(sut.finish().strokes[0].duration_ms, 25);
    }

    #[test]
    fn continuation_segments_accumulate_offsets() {
        let mut sut = builder(false);
        sut.end_segment((0.0, 0.0), 100 * MS, true);
        sut.end_segment((0.0, 5.0), 300 * MS, false);

        let gesture = sut.finish();
        assert_eq!(gesture.strokes.len(), 2);
        assert!(gesture.strokes[0].continues);
        assert_eq!(gesture.strokes[1].from, (0.0, 0.0));
        assert_eq!(gesture.strokes[1].to, (0.0, 5.0));
        assert_eq!(gesture.strokes[1].start_offset_ms, 100);
        assert_eq!(gesture.duration_ms(), 100 + gesture.strokes[1].duration_ms);
    }
}
