//! Raw button codes and composable virtual buttons.

use std::collections::{BTreeSet, HashMap};

/// Opaque identifier for a physical or synthesized button.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ButtonCode(pub u16);

impl ButtonCode {
    pub const A: ButtonCode = ButtonCode(0);
    pub const B: ButtonCode = ButtonCode(1);
    pub const X: ButtonCode = ButtonCode(2);
    pub const Y: ButtonCode = ButtonCode(3);
    pub const L1: ButtonCode = ButtonCode(4);
    pub const L2: ButtonCode = ButtonCode(5);
    pub const R1: ButtonCode = ButtonCode(6);
    pub const R2: ButtonCode = ButtonCode(7);
    pub const SELECT: ButtonCode = ButtonCode(8);
    pub const START: ButtonCode = ButtonCode(9);
    pub const THUMBL: ButtonCode = ButtonCode(10);
    pub const THUMBR: ButtonCode = ButtonCode(11);
    pub const MODE: ButtonCode = ButtonCode(12);
    pub const DPAD_UP: ButtonCode = ButtonCode(13);
    pub const DPAD_DOWN: ButtonCode = ButtonCode(14);
    pub const DPAD_LEFT: ButtonCode = ButtonCode(15);
    pub const DPAD_RIGHT: ButtonCode = ButtonCode(16);

    /// All codes a processor tracks by default.
    pub const KNOWN: [ButtonCode; 17] = [
        Self::A,
        Self::B,
        Self::X,
        Self::Y,
        Self::L1,
        Self::L2,
        Self::R1,
        Self::R2,
        Self::SELECT,
        Self::START,
        Self::THUMBL,
        Self::THUMBR,
        Self::MODE,
        Self::DPAD_UP,
        Self::DPAD_DOWN,
        Self::DPAD_LEFT,
        Self::DPAD_RIGHT,
    ];
}

/// How a virtual button combines its component codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonMode {
    /// Pressed only while every component is pressed.
    Chord,
    /// Pressed while any component is pressed.
    Multiplex,
}

/// Result of feeding a raw-state snapshot to a [`VirtualButton`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ButtonUpdate {
    /// The pressed state flipped.
    pub changed: bool,
    /// All components are up and the release notification was armed. Reported
    /// at most once per arming.
    pub fully_released: bool,
}

/// A boolean button synthesized from one or more raw button codes.
///
/// The one-shot "fully released" notification replaces a captured closure: the
/// owner arms the flag when it latches this button and [`VirtualButton::update`]
/// reports the release exactly once, even when a multi-button chord is released
/// in a staggered order.
#[derive(Clone, Debug)]
pub struct VirtualButton {
    components: BTreeSet<ButtonCode>,
    mode: ButtonMode,
    pressed: bool,
    notify_fully_released: bool,
}

impl VirtualButton {
    pub fn new(components: impl IntoIterator<Item = ButtonCode>, mode: ButtonMode) -> Self {
        Self {
            components: components.into_iter().collect(),
            mode,
            pressed: false,
            notify_fully_released: false,
        }
    }

    /// Single-component multiplex button.
    pub fn single(code: ButtonCode) -> Self {
        Self::new([code], ButtonMode::Multiplex)
    }

    pub fn chord(components: impl IntoIterator<Item = ButtonCode>) -> Self {
        Self::new(components, ButtonMode::Chord)
    }

    pub fn multiplex(components: impl IntoIterator<Item = ButtonCode>) -> Self {
        Self::new(components, ButtonMode::Multiplex)
    }

    pub fn components(&self) -> &BTreeSet<ButtonCode> {
        &self.components
    }

    pub fn mode(&self) -> ButtonMode {
        self.mode
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    pub fn is_interested_in(&self, code: ButtonCode) -> bool {
        self.components.contains(&code)
    }

    /// Arms the one-shot fully-released notification.
    pub fn arm_release_notify(&mut self) {
        self.notify_fully_released = true;
    }

    /// Disarms the fully-released notification without reporting it. Used when
    /// another virtual button evicts this one from latch ownership.
    pub fn disarm_release_notify(&mut self) {
        self.notify_fully_released = false;
    }

    /// Processes a change in raw button states.
    pub fn update(&mut self, states: &HashMap<ButtonCode, bool>) -> ButtonUpdate {
        let is_down = |code: &ButtonCode| states.get(code).copied().unwrap_or(false);

        let old_state = self.pressed;
        self.pressed = match self.mode {
            ButtonMode::Chord => self.components.iter().all(is_down),
            ButtonMode::Multiplex => self.components.iter().any(is_down),
        };

        let mut fully_released = false;
        if !self.pressed && self.notify_fully_released && !self.components.iter().any(is_down) {
            self.notify_fully_released = false;
            fully_released = true;
        }

        ButtonUpdate {
            changed: self.pressed != old_state,
            fully_released,
        }
    }

    /// Checks whether this virtual button should be prevented from acting
    /// because `other` currently owns overlapping raw codes.
    ///
    /// - No button locks out a button with non-overlapping components.
    /// - No button locks out itself.
    /// - A multiplexed button never supersedes any overlapping button.
    /// - A chorded button supersedes any overlapping multiplexed button.
    /// - A chorded button supersedes chords whose components are a strict
    ///   subset of its own; equal-component chords lock each other out.
    pub fn is_locked_out_by(&self, other: &VirtualButton) -> bool {
        if std::ptr::eq(self, other) {
            return false;
        }

        let common: BTreeSet<ButtonCode> = self
            .components
            .intersection(&other.components)
            .copied()
            .collect();
        if common.is_empty() {
            return false;
        }

        if self.mode == ButtonMode::Multiplex {
            return true;
        }

        if other.mode == ButtonMode::Multiplex {
            return false;
        }

        if !other.components.is_subset(&common) {
            return true;
        }

        self.components.len() <= other.components.len()
    }

    /// Forces the button unpressed and drops any armed release notification
    /// without reporting it.
    pub fn reset(&mut self) {
        self.pressed = false;
        self.notify_fully_released = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn states(down: &[ButtonCode]) -> HashMap<ButtonCode, bool> {
        down.iter().map(|code| (*code, true)).collect()
    }

    #[test]
    fn defaults_to_unpressed() {
        let sut = VirtualButton::single(ButtonCode::A);
        assert!(!sut.is_pressed());
    }

    #[test]
    fn multiplex_presses_on_any_component() {
        let mut sut = VirtualButton::multiplex([ButtonCode::SELECT, ButtonCode::B]);

        assert!(sut.update(&states(&[ButtonCode::B])).changed);
        assert!(sut.is_pressed());
    }

    #[test]
    fn multiplex_ignores_irrelevant_buttons() {
        let mut sut = VirtualButton::single(ButtonCode::A);

        assert!(!sut.update(&states(&[ButtonCode::B])).changed);
        assert!(!sut.is_pressed());
    }

    #[test]
    fn multiplex_releases_only_when_all_components_up() {
        let mut sut = VirtualButton::multiplex([ButtonCode::A, ButtonCode::B]);
        sut.update(&states(&[ButtonCode::A, ButtonCode::B]));

        assert!(!sut.update(&states(&[ButtonCode::B])).changed);
        assert!(sut.is_pressed());

        assert!(sut.update(&states(&[])).changed);
        assert!(!sut.is_pressed());
    }

    #[test]
    fn chord_requires_all_components() {
        let mut sut = VirtualButton::chord([ButtonCode::L1, ButtonCode::R1]);

        assert!(!sut.update(&states(&[ButtonCode::L1])).changed);
        assert!(!sut.is_pressed());

        assert!(sut.update(&states(&[ButtonCode::L1, ButtonCode::R1])).changed);
        assert!(sut.is_pressed());
    }

    #[test]
    fn chord_releases_on_first_component_up() {
        let mut sut = VirtualButton::chord([ButtonCode::L1, ButtonCode::R1]);
        sut.update(&states(&[ButtonCode::L1, ButtonCode::R1]));

        assert!(sut.update(&states(&[ButtonCode::R1])).changed);
        assert!(!sut.is_pressed());
    }

    #[test]
    fn fully_released_fires_once_for_staggered_release() {
        let mut sut = VirtualButton::chord([ButtonCode::L1, ButtonCode::R1]);
        sut.update(&states(&[ButtonCode::L1, ButtonCode::R1]));
        sut.arm_release_notify();

        let partial = sut.update(&states(&[ButtonCode::R1]));
        assert!(partial.changed);
        assert!(!partial.fully_released);

        let full = sut.update(&states(&[]));
        assert!(!full.changed);
        assert!(full.fully_released);

        // Already reported; never again.
        assert!(!sut.update(&states(&[])).fully_released);
    }

    #[test]
    fn disarm_suppresses_fully_released() {
        let mut sut = VirtualButton::single(ButtonCode::A);
        sut.update(&states(&[ButtonCode::A]));
        sut.arm_release_notify();
        sut.disarm_release_notify();

        assert!(!sut.update(&states(&[])).fully_released);
    }

    #[test]
    fn reset_clears_state_without_notifying() {
        let mut sut = VirtualButton::single(ButtonCode::A);
        sut.update(&states(&[ButtonCode::A]));
        sut.arm_release_notify();

        sut.reset();
        assert!(!sut.is_pressed());
        assert!(!sut.update(&states(&[])).fully_released);
    }

    #[test]
    fn no_lockout_without_overlap() {
        let a = VirtualButton::chord([ButtonCode::A]);
        let b = VirtualButton::chord([ButtonCode::B]);
        assert!(!a.is_locked_out_by(&b));
    }

    #[test]
    fn no_lockout_by_self() {
        let a = VirtualButton::chord([ButtonCode::A]);
        assert!(!a.is_locked_out_by(&a));
    }

    #[test]
    fn multiplex_locked_out_by_any_overlap() {
        let plex = VirtualButton::multiplex([ButtonCode::A, ButtonCode::B]);
        let chord = VirtualButton::chord([ButtonCode::A, ButtonCode::R1]);
        let other_plex = VirtualButton::multiplex([ButtonCode::B]);

        assert!(plex.is_locked_out_by(&chord));
        assert!(plex.is_locked_out_by(&other_plex));
    }

    #[test]
    fn chord_not_locked_out_by_multiplex() {
        let chord = VirtualButton::chord([ButtonCode::A, ButtonCode::R1]);
        let plex = VirtualButton::multiplex([ButtonCode::A]);
        assert!(!chord.is_locked_out_by(&plex));
    }

    #[test]
    fn equal_chords_mutually_lock_out() {
        let a = VirtualButton::chord([ButtonCode::A, ButtonCode::B]);
        let b = VirtualButton::chord([ButtonCode::A, ButtonCode::B]);
        assert!(a.is_locked_out_by(&b));
        assert!(b.is_locked_out_by(&a));
    }

    #[test]
    fn superset_chord_beats_subset_chord() {
        let superset = VirtualButton::chord([ButtonCode::A, ButtonCode::B, ButtonCode::R1]);
        let subset = VirtualButton::chord([ButtonCode::A, ButtonCode::B]);

        assert!(!superset.is_locked_out_by(&subset));
        assert!(subset.is_locked_out_by(&superset));
    }

    #[test]
    fn chord_locked_out_by_partially_disjoint_chord() {
        let a = VirtualButton::chord([ButtonCode::A, ButtonCode::B]);
        let b = VirtualButton::chord([ButtonCode::B, ButtonCode::R1]);
        assert!(a.is_locked_out_by(&b));
    }
}
