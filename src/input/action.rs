//! Logical actions emitted by the button processor.

use std::fmt;

/// Logical actions that may be emitted by a joystick cursor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    /// Requests that the joystick cursor be enabled/disabled.
    ToggleEnabled,

    /// The primary button has been fully depressed.
    PrimaryPress,
    /// The primary button has been fully released.
    PrimaryRelease,

    /// The fast-cursor button has been fully depressed.
    FastCursorPress,
    /// The fast-cursor button has been fully released.
    FastCursorRelease,

    /// Global "home" action.
    Home,
    /// Global "back" action.
    Back,
    /// Global "recents" action.
    Recents,
    /// Dpad-center style activation of the focused element.
    Activate,

    DpadUp,
    DpadDown,
    DpadLeft,
    DpadRight,

    /// Requests that a swipe or fling be applied from the current cursor position.
    SwipeUp,
    SwipeDown,
    SwipeLeft,
    SwipeRight,

    /// Requests that the cursor be moved to the next display.
    CycleDisplayForward,
    /// Requests that the cursor be moved to the previous display.
    CycleDisplayBackward,

    /// Requests that a drag gesture be toggled to a fling or vice-versa.
    ToggleGesture,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
