//! Routes raw button transitions through shift-selected mapping tables and
//! emits logical actions.
//!
//! Release resolution always follows the mapping captured at press time via
//! the latch table, never the table computed from the shift state at release
//! time. A shift key changing mid-press therefore cannot corrupt the matching
//! release action.

use crate::input::action::Action;
use crate::input::button::{ButtonCode, VirtualButton};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Failed to build button layout: bypass mapping must have exactly one component, got {0}")]
    BypassNotSingle(usize),
}

/// Actions to execute when a [`VirtualButton`] settles into pressed or
/// released.
#[derive(Clone, Debug)]
pub struct Mapping {
    pub button: VirtualButton,
    pub on_press: Option<Action>,
    pub on_release: Option<Action>,
}

impl Mapping {
    pub fn new(button: VirtualButton, on_press: Option<Action>, on_release: Option<Action>) -> Self {
        Self {
            button,
            on_press,
            on_release,
        }
    }

    pub fn on_press(button: VirtualButton, action: Action) -> Self {
        Self::new(button, Some(action), None)
    }

    pub fn on_release(button: VirtualButton, action: Action) -> Self {
        Self::new(button, None, Some(action))
    }
}

/// Which shift-selected table a mapping lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TableId {
    Unshifted,
    LeftShift,
    RightShift,
    DualShift,
}

impl TableId {
    fn select(left_shift: bool, right_shift: bool) -> TableId {
        if left_shift && right_shift {
            TableId::DualShift
        } else if right_shift {
            TableId::RightShift
        } else if left_shift {
            TableId::LeftShift
        } else {
            TableId::Unshifted
        }
    }
}

/// Stable identifier of a mapping inside the processor, used by the latch
/// table to record press-time ownership of raw codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MappingRef {
    Table { table: TableId, index: usize },
    Toggle,
}

/// The complete binding set handed to a [`ButtonProcessor`].
#[derive(Clone, Debug)]
pub struct ButtonLayout {
    pub unshifted: Vec<Mapping>,
    pub left_shift: Vec<Mapping>,
    pub right_shift: Vec<Mapping>,
    pub dual_shift: Vec<Mapping>,

    /// Bypass mappings evaluated outside the shift/lockout machinery. Each
    /// button must have exactly one component.
    pub raw: Vec<Mapping>,

    /// Fixed chord that is never locked out, reserved for enable/disable.
    pub toggle_chord: Mapping,

    pub left_shift_code: ButtonCode,
    pub right_shift_code: ButtonCode,
}

impl ButtonLayout {
    /// The stock controller binding set.
    ///
    /// L2 and R2 act as shift buttons; R2 doubles as the primary (pointer)
    /// button, so mappings active while R2 is held live in the right-shift
    /// table and apply mid-drag.
    pub fn default_layout() -> Self {
        let dpad_releases = |table: &mut Vec<Mapping>, up, down, left, right| {
            table.push(Mapping::on_release(VirtualButton::single(ButtonCode::DPAD_UP), up));
            table.push(Mapping::on_release(VirtualButton::single(ButtonCode::DPAD_DOWN), down));
            table.push(Mapping::on_release(VirtualButton::single(ButtonCode::DPAD_LEFT), left));
            table.push(Mapping::on_release(VirtualButton::single(ButtonCode::DPAD_RIGHT), right));
        };

        let primary = Mapping::new(
            VirtualButton::single(ButtonCode::R2),
            Some(Action::PrimaryPress),
            Some(Action::PrimaryRelease),
        );

        let mut unshifted = vec![
            Mapping::on_release(VirtualButton::single(ButtonCode::MODE), Action::Home),
            Mapping::on_release(VirtualButton::single(ButtonCode::START), Action::Recents),
            Mapping::on_release(VirtualButton::single(ButtonCode::A), Action::Activate),
            Mapping::on_release(
                VirtualButton::multiplex([ButtonCode::SELECT, ButtonCode::B]),
                Action::Back,
            ),
            primary.clone(),
        ];
        dpad_releases(
            &mut unshifted,
            Action::DpadUp,
            Action::DpadDown,
            Action::DpadLeft,
            Action::DpadRight,
        );

        let mut left_shift = vec![
            Mapping::on_release(VirtualButton::chord([ButtonCode::A]), Action::ToggleGesture),
            Mapping::on_release(
                VirtualButton::chord([ButtonCode::L1]),
                Action::CycleDisplayBackward,
            ),
            Mapping::on_release(
                VirtualButton::chord([ButtonCode::R1]),
                Action::CycleDisplayForward,
            ),
            primary,
        ];
        dpad_releases(
            &mut left_shift,
            Action::SwipeUp,
            Action::SwipeDown,
            Action::SwipeLeft,
            Action::SwipeRight,
        );

        // Active while a primary drag is in flight.
        let mut right_shift = vec![Mapping::on_release(
            VirtualButton::single(ButtonCode::A),
            Action::ToggleGesture,
        )];
        dpad_releases(
            &mut right_shift,
            Action::SwipeUp,
            Action::SwipeDown,
            Action::SwipeLeft,
            Action::SwipeRight,
        );

        Self {
            unshifted,
            left_shift,
            right_shift,
            dual_shift: Vec::new(),
            raw: vec![Mapping::new(
                VirtualButton::single(ButtonCode::L1),
                Some(Action::FastCursorPress),
                Some(Action::FastCursorRelease),
            )],
            toggle_chord: Mapping::on_press(
                VirtualButton::chord([
                    ButtonCode::L1,
                    ButtonCode::L2,
                    ButtonCode::R1,
                    ButtonCode::R2,
                ]),
                Action::ToggleEnabled,
            ),
            left_shift_code: ButtonCode::L2,
            right_shift_code: ButtonCode::R2,
        }
    }
}

/// Owns every mapping so latch references can reach any of them mutably
/// without touching the rest of the processor state.
#[derive(Debug)]
struct MappingSet {
    unshifted: Vec<Mapping>,
    left_shift: Vec<Mapping>,
    right_shift: Vec<Mapping>,
    dual_shift: Vec<Mapping>,
    raw: Vec<Mapping>,
    toggle: Mapping,
}

impl MappingSet {
    fn table(&self, id: TableId) -> &[Mapping] {
        match id {
            TableId::Unshifted => &self.unshifted,
            TableId::LeftShift => &self.left_shift,
            TableId::RightShift => &self.right_shift,
            TableId::DualShift => &self.dual_shift,
        }
    }

    fn mapping(&self, r: MappingRef) -> &Mapping {
        match r {
            MappingRef::Table { table, index } => &self.table(table)[index],
            MappingRef::Toggle => &self.toggle,
        }
    }

    fn mapping_mut(&mut self, r: MappingRef) -> &mut Mapping {
        match r {
            MappingRef::Table { table, index } => match table {
                TableId::Unshifted => &mut self.unshifted[index],
                TableId::LeftShift => &mut self.left_shift[index],
                TableId::RightShift => &mut self.right_shift[index],
                TableId::DualShift => &mut self.dual_shift[index],
            },
            MappingRef::Toggle => &mut self.toggle,
        }
    }

    fn reset_all(&mut self) {
        for mapping in self
            .unshifted
            .iter_mut()
            .chain(self.left_shift.iter_mut())
            .chain(self.right_shift.iter_mut())
            .chain(self.dual_shift.iter_mut())
            .chain(self.raw.iter_mut())
        {
            mapping.button.reset();
        }
        self.toggle.button.reset();
    }
}

/// Converts raw button transitions into logical actions.
pub struct ButtonProcessor {
    button_states: HashMap<ButtonCode, bool>,
    latches: HashMap<ButtonCode, MappingRef>,
    mappings: MappingSet,
    left_shift_code: ButtonCode,
    right_shift_code: ButtonCode,
    on_action: Box<dyn FnMut(Action) + Send>,
}

impl ButtonProcessor {
    /// Builds a processor from the given layout. Fails if a bypass mapping's
    /// button has more than one component; misconfiguration is a construction
    /// error, never a runtime one.
    pub fn new(
        layout: ButtonLayout,
        on_action: Box<dyn FnMut(Action) + Send>,
    ) -> Result<Self, ProcessorError> {
        for mapping in &layout.raw {
            let count = mapping.button.components().len();
            if count != 1 {
                return Err(ProcessorError::BypassNotSingle(count));
            }
        }

        let button_states = ButtonCode::KNOWN.iter().map(|code| (*code, false)).collect();

        Ok(Self {
            button_states,
            latches: HashMap::new(),
            mappings: MappingSet {
                unshifted: layout.unshifted,
                left_shift: layout.left_shift,
                right_shift: layout.right_shift,
                dual_shift: layout.dual_shift,
                raw: layout.raw,
                toggle: layout.toggle_chord,
            },
            left_shift_code: layout.left_shift_code,
            right_shift_code: layout.right_shift_code,
            on_action,
        })
    }

    fn is_down(&self, code: ButtonCode) -> bool {
        self.button_states.get(&code).copied().unwrap_or(false)
    }

    /// Reports a state change in a physical or synthesized button.
    pub fn handle_button_event(&mut self, code: ButtonCode, is_pressed: bool) {
        if self.is_down(code) == is_pressed {
            return;
        }

        // Shift state is snapshotted before this transition takes effect, so a
        // press of a shift code itself still resolves against the old table.
        let left_shift = self.is_down(self.left_shift_code);
        let right_shift = self.is_down(self.right_shift_code);

        self.button_states.insert(code, is_pressed);
        debug!(code = code.0, is_pressed, "button transition");

        self.process_bypass(code);

        if is_pressed {
            self.handle_press(code, left_shift, right_shift);
        } else {
            self.handle_release(code);
        }
    }

    /// Clears all button states without triggering any release actions.
    /// Idempotent.
    pub fn reset(&mut self) {
        for state in self.button_states.values_mut() {
            *state = false;
        }
        self.latches.clear();
        self.mappings.reset_all();
    }

    /// Evaluates single-code mappings that ignore shift modes and latching.
    fn process_bypass(&mut self, code: ButtonCode) {
        for index in 0..self.mappings.raw.len() {
            if !self.mappings.raw[index].button.is_interested_in(code) {
                continue;
            }
            let update = self.mappings.raw[index].button.update(&self.button_states);
            if !update.changed {
                continue;
            }
            let mapping = &self.mappings.raw[index];
            let action = if mapping.button.is_pressed() {
                mapping.on_press
            } else {
                mapping.on_release
            };
            if let Some(action) = action {
                self.emit(action);
            }
        }
    }

    fn handle_press(&mut self, code: ButtonCode, left_shift: bool, right_shift: bool) {
        if self.mappings.toggle.button.is_interested_in(code) {
            self.apply_press(MappingRef::Toggle);
        }

        let table = TableId::select(left_shift, right_shift);
        let interested: Vec<usize> = self
            .mappings
            .table(table)
            .iter()
            .enumerate()
            .filter(|(_, mapping)| mapping.button.is_interested_in(code))
            .map(|(index, _)| index)
            .collect();

        for index in interested {
            let r = MappingRef::Table { table, index };
            if self.is_locked_out(r) {
                continue;
            }
            self.apply_press(r);
        }
    }

    /// Updates one candidate mapping for a press transition, installing latch
    /// ownership if it newly became pressed.
    fn apply_press(&mut self, r: MappingRef) {
        let update = self.mappings.mapping_mut(r).button.update(&self.button_states);
        if update.fully_released {
            self.clear_latches_of(r);
        }
        if !update.changed || !self.mappings.mapping(r).button.is_pressed() {
            return;
        }

        // Latch every component, silently evicting previous owners on exactly
        // these codes. The evicted owner's pending release notification is
        // dropped, not fired.
        let components: Vec<ButtonCode> = self
            .mappings
            .mapping(r)
            .button
            .components()
            .iter()
            .copied()
            .collect();
        for component in components {
            if let Some(previous) = self.latches.insert(component, r) {
                if previous != r {
                    self.mappings
                        .mapping_mut(previous)
                        .button
                        .disarm_release_notify();
                }
            }
        }
        self.mappings.mapping_mut(r).button.arm_release_notify();

        if let Some(action) = self.mappings.mapping(r).on_press {
            self.emit(action);
        }
    }

    fn handle_release(&mut self, code: ButtonCode) {
        let Some(r) = self.latches.get(&code).copied() else {
            return;
        };

        let update = self.mappings.mapping_mut(r).button.update(&self.button_states);
        if update.changed {
            if let Some(action) = self.mappings.mapping(r).on_release {
                self.emit(action);
            }
        }
        if update.fully_released {
            self.clear_latches_of(r);
        }
    }

    /// Checks whether any of the candidate's components are latched by a
    /// virtual button that takes precedence over it.
    fn is_locked_out(&self, r: MappingRef) -> bool {
        let candidate = &self.mappings.mapping(r).button;
        candidate.components().iter().any(|component| {
            self.latches
                .get(component)
                .filter(|owner| **owner != r)
                .map(|owner| candidate.is_locked_out_by(&self.mappings.mapping(*owner).button))
                .unwrap_or(false)
        })
    }

    fn clear_latches_of(&mut self, r: MappingRef) {
        self.latches.retain(|_, owner| *owner != r);
    }

    fn emit(&mut self, action: Action) {
        info!(%action, "emitting action");
        (self.on_action)(action);
    }
}

impl std::fmt::Debug for ButtonProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ButtonProcessor")
            .field("latches", &self.latches)
            .field("left_shift_code", &self.left_shift_code)
            .field("right_shift_code", &self.right_shift_code)
            .finish_non_exhaustive()
    }
}
