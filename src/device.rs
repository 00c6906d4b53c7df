//! Per-device session: wires the filters, button processor, cursor integrator
//! and gesture episode together, and drives them from one dispatch loop.
//!
//! One [`JoystickCursor`] exists per connected input device and is torn down
//! on disconnect. Teardown is hard: latches and virtual-button state are
//! cleared without firing pending release notifications.

use crate::clock::NanoClock;
use crate::config::Config;
use crate::gesture::{Gesture, GestureBuilder, GestureTiming};
use crate::input::axis::{AxisButtonMapper, AxisFilter, AxisId};
use crate::input::processor::{ButtonLayout, ButtonProcessor, ProcessorError};
use crate::input::{Action, ButtonCode, CursorIntegrator};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Failed to build button processor: {0}")]
    Processor(#[from] ProcessorError),

    #[error("Failed to deliver device event: channel closed")]
    ChannelClosed,
}

/// Deadzone and noise characteristics reported for a device's axes.
#[derive(Clone, Copy, Debug)]
pub struct AxisRange {
    pub flat: f32,
    pub fuzz: f32,
}

impl Default for AxisRange {
    fn default() -> Self {
        Self {
            flat: 0.1,
            fuzz: 0.004,
        }
    }
}

/// Collaborator callbacks. All calls are fire and forget; the pipeline never
/// waits on them.
pub struct DeviceCallbacks {
    pub on_action: Box<dyn FnMut(Action) + Send>,
    pub on_position: Box<dyn FnMut(f32, f32) + Send>,
    pub on_gesture: Box<dyn FnMut(Gesture) + Send>,
}

/// State for a virtual cursor controlled by one joystick device.
pub struct JoystickCursor {
    device_id: u32,
    x_axis: AxisFilter,
    y_axis: AxisFilter,
    button_axes: Vec<AxisButtonMapper>,
    processor: ButtonProcessor,
    action_rx: mpsc::UnboundedReceiver<Action>,
    integrator: CursorIntegrator,
    gesture: Option<GestureBuilder>,
    timing: GestureTiming,
    clock: Arc<dyn NanoClock>,
    drag_distance_px: f32,
    fling_distance_px: f32,
    use_distance_based_fling: bool,
    enabled: bool,
    primary_pressed: bool,
    fast_cursor: bool,
    callbacks: DeviceCallbacks,
}

impl JoystickCursor {
    /// Builds a session with the standard axis wiring: left stick moves the
    /// pointer, triggers synthesize L2/R2 with latch-until-zero, and the hat
    /// axes synthesize the dpad.
    pub fn new(
        device_id: u32,
        width: f32,
        height: f32,
        range: AxisRange,
        config: &Config,
        layout: ButtonLayout,
        clock: Arc<dyn NanoClock>,
        callbacks: DeviceCallbacks,
    ) -> Result<Self, DeviceError> {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let processor = ButtonProcessor::new(
            layout,
            Box::new(move |action| {
                let _ = action_tx.send(action);
            }),
        )?;

        let make_axis = |axis| AxisFilter::new(axis, range.flat, range.fuzz);
        let make_button_axis = |axis, positive, negative, latch| {
            AxisButtonMapper::new(make_axis(axis), positive, negative, config.press_threshold, latch)
        };

        let button_axes = vec![
            make_button_axis(AxisId::LEFT_TRIGGER, ButtonCode::L2, None, true),
            make_button_axis(AxisId::RIGHT_TRIGGER, ButtonCode::R2, None, true),
            make_button_axis(
                AxisId::HAT_X,
                ButtonCode::DPAD_RIGHT,
                Some(ButtonCode::DPAD_LEFT),
                false,
            ),
            make_button_axis(
                AxisId::HAT_Y,
                ButtonCode::DPAD_DOWN,
                Some(ButtonCode::DPAD_UP),
                false,
            ),
        ];

        Ok(Self {
            device_id,
            x_axis: make_axis(AxisId::LEFT_X),
            y_axis: make_axis(AxisId::LEFT_Y),
            button_axes,
            processor,
            action_rx,
            integrator: CursorIntegrator::new(
                width,
                height,
                config.traversal_seconds,
                config.fast_multiplier,
                config.input_gap_ms,
            ),
            gesture: None,
            timing: GestureTiming::from_config(config),
            clock,
            drag_distance_px: config.drag_distance_px,
            fling_distance_px: config.fling_distance_px,
            use_distance_based_fling: config.use_distance_based_fling,
            enabled: true,
            primary_pressed: false,
            fast_cursor: false,
            callbacks,
        })
    }

    pub fn device_id(&self) -> u32 {
        self.device_id
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_primary_pressed(&self) -> bool {
        self.primary_pressed
    }

    pub fn is_fast_cursor_enabled(&self) -> bool {
        self.fast_cursor
    }

    pub fn position(&self) -> (f32, f32) {
        self.integrator.position()
    }

    /// Whether the repeating tick driver should currently be running.
    pub fn wants_repeat(&self) -> bool {
        self.enabled && (self.x_axis.deflection() != 0.0 || self.y_axis.deflection() != 0.0)
    }

    /// Feeds one raw axis sample. Unknown axis ids are ignored.
    pub fn handle_axis_event(&mut self, axis: AxisId, value: f32) {
        self.process_axes_as_buttons(axis, value);

        if !self.enabled {
            return;
        }

        let x_moved = axis == self.x_axis.axis() && self.x_axis.update(value);
        let y_moved = axis == self.y_axis.axis() && self.y_axis.update(value);
        if !x_moved && !y_moved {
            return;
        }

        self.apply_deflection();
    }

    /// Feeds one raw button transition.
    pub fn handle_button_event(&mut self, code: ButtonCode, is_pressed: bool) {
        self.processor.handle_button_event(code, is_pressed);
        self.drain_actions();
    }

    /// Applies the current deflection for one repeating-driver period.
    pub fn tick(&mut self) {
        if self.enabled {
            self.apply_deflection();
        }
    }

    /// Hard teardown: clears all latches, virtual-button state and any live
    /// episode without emitting anything. The session is immediately usable
    /// again afterwards.
    pub fn reset(&mut self) {
        self.processor.reset();
        self.gesture = None;
        self.integrator.reset_timing();
        self.primary_pressed = false;
        self.fast_cursor = false;
    }

    /// Axes synthesized into buttons are processed even while disabled, so a
    /// trigger held as part of the enable chord still registers.
    fn process_axes_as_buttons(&mut self, axis: AxisId, value: f32) {
        for index in 0..self.button_axes.len() {
            if self.button_axes[index].axis() != axis {
                continue;
            }
            if !self.button_axes[index].update(value) {
                continue;
            }

            let mapper = &self.button_axes[index];
            let positive = (mapper.positive_code(), mapper.is_positive_pressed());
            let negative = mapper
                .negative_code()
                .map(|code| (code, mapper.is_negative_pressed()));

            self.processor.handle_button_event(positive.0, positive.1);
            if let Some((code, pressed)) = negative {
                self.processor.handle_button_event(code, pressed);
            }
            self.drain_actions();
        }
    }

    fn apply_deflection(&mut self) {
        let now = self.clock.nanos();
        let step = self.integrator.tick(
            self.x_axis.deflection(),
            self.y_axis.deflection(),
            self.fast_cursor,
            now,
        );

        if let Some((x, y)) = step {
            if let Some(gesture) = self.gesture.as_mut() {
                gesture.cursor_move((x, y), now);
            }
            (self.callbacks.on_position)(x, y);
        }
    }

    fn drain_actions(&mut self) {
        while let Ok(action) = self.action_rx.try_recv() {
            self.apply_action(action);
        }
    }

    fn apply_action(&mut self, action: Action) {
        match action {
            Action::ToggleEnabled => self.set_enabled(!self.enabled),
            Action::PrimaryPress => {
                self.primary_pressed = true;
                if self.enabled {
                    self.begin_episode();
                }
            }
            Action::PrimaryRelease => {
                self.primary_pressed = false;
                self.finish_episode();
            }
            Action::FastCursorPress => self.fast_cursor = true,
            Action::FastCursorRelease => self.fast_cursor = false,
            Action::ToggleGesture => {
                if let Some(gesture) = self.gesture.as_mut() {
                    gesture.toggle_drag_is_fling();
                }
            }
            _ => {}
        }

        if self.enabled || action == Action::ToggleEnabled {
            (self.callbacks.on_action)(action);
        }
    }

    fn set_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.processor.reset();
            self.gesture = None;
            self.integrator.reset_timing();
        }
        info!(device_id = self.device_id, enabled, "cursor enabled state changed");
        self.enabled = enabled;
    }

    fn begin_episode(&mut self) {
        let now = self.clock.nanos();
        debug!(device_id = self.device_id, "gesture episode started");
        self.gesture = Some(GestureBuilder::new(
            self.integrator.position(),
            now,
            self.drag_distance_px,
            self.fling_distance_px,
            self.use_distance_based_fling,
            self.timing,
        ));
    }

    fn finish_episode(&mut self) {
        let Some(mut gesture) = self.gesture.take() else {
            return;
        };
        let now = self.clock.nanos();
        gesture.end_segment(self.integrator.position(), now, false);
        debug!(device_id = self.device_id, "gesture episode finished");
        (self.callbacks.on_gesture)(gesture.finish());
    }
}

/// Events consumed by a device task.
#[derive(Clone, Copy, Debug)]
pub enum DeviceEvent {
    Axis { axis: AxisId, value: f32 },
    Button { code: ButtonCode, is_pressed: bool },
    Tick { generation: u64 },
}

/// Repeating cursor-integration tick, owned by exactly one device task.
///
/// Cancellation is idempotent and race safe: every restart bumps a generation
/// counter and ticks carry the generation they were scheduled under, so a
/// tick already in flight when `cancel` returns is dropped by the dispatch
/// loop instead of being applied.
struct Repeater {
    period: Duration,
    event_tx: mpsc::Sender<DeviceEvent>,
    token: CancellationToken,
    generation: u64,
    running: bool,
}

impl Repeater {
    fn new(period: Duration, event_tx: mpsc::Sender<DeviceEvent>) -> Self {
        Self {
            period,
            event_tx,
            token: CancellationToken::new(),
            generation: 0,
            running: false,
        }
    }

    fn is_running(&self) -> bool {
        self.running
    }

    /// Whether a received tick belongs to the currently scheduled run.
    fn is_current(&self, generation: u64) -> bool {
        self.running && generation == self.generation
    }

    fn restart(&mut self) {
        self.cancel();
        self.generation += 1;
        self.running = true;
        self.token = CancellationToken::new();

        let token = self.token.clone();
        let event_tx = self.event_tx.clone();
        let generation = self.generation;
        let period = self.period;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first interval tick completes immediately; skip it so ticks
            // arrive one period apart from the restart.
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        if event_tx
                            .send(DeviceEvent::Tick { generation })
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                }
            }
        });
    }

    fn cancel(&mut self) {
        // Cancelling an unscheduled or already-cancelled run is a no-op.
        self.token.cancel();
        self.running = false;
    }
}

/// Handle to a spawned device task.
pub struct DeviceHandle {
    event_tx: mpsc::Sender<DeviceEvent>,
    shutdown: CancellationToken,
}

impl DeviceHandle {
    pub fn sender(&self) -> mpsc::Sender<DeviceEvent> {
        self.event_tx.clone()
    }

    pub async fn send(&self, event: DeviceEvent) -> Result<(), DeviceError> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| DeviceError::ChannelClosed)
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Spawns a device session as a tokio task fed by a [`DeviceEvent`] channel.
pub struct DeviceDriver;

impl DeviceDriver {
    #[allow(clippy::too_many_arguments)]
    pub fn spawn(
        device_id: u32,
        width: f32,
        height: f32,
        range: AxisRange,
        config: &Config,
        layout: ButtonLayout,
        clock: Arc<dyn NanoClock>,
        callbacks: DeviceCallbacks,
    ) -> Result<DeviceHandle, DeviceError> {
        let mut cursor =
            JoystickCursor::new(device_id, width, height, range, config, layout, clock, callbacks)?;

        let (event_tx, mut event_rx) = mpsc::channel(256);
        let shutdown = CancellationToken::new();
        let mut repeater = Repeater::new(
            Duration::from_millis(config.tick_period_ms),
            event_tx.clone(),
        );

        let token = shutdown.clone();
        tokio::spawn(async move {
            info!(device_id, "device task started");
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    maybe_event = event_rx.recv() => {
                        let Some(event) = maybe_event else { break };
                        match event {
                            DeviceEvent::Axis { axis, value } => {
                                cursor.handle_axis_event(axis, value);
                            }
                            DeviceEvent::Button { code, is_pressed } => {
                                cursor.handle_button_event(code, is_pressed);
                            }
                            DeviceEvent::Tick { generation } => {
                                if repeater.is_current(generation) {
                                    cursor.tick();
                                }
                            }
                        }

                        // Reconcile the repeater with the new deflection state.
                        if cursor.wants_repeat() {
                            if !repeater.is_running() {
                                repeater.restart();
                            }
                        } else if repeater.is_running() {
                            repeater.cancel();
                        }
                    }
                }
            }
            repeater.cancel();
            cursor.reset();
            info!(device_id, "device task stopped");
        });

        Ok(DeviceHandle { event_tx, shutdown })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::fake::FakeClock;
    use crate::gesture::GestureStroke;
    use std::sync::mpsc as std_mpsc;

    struct Captured {
        actions: std_mpsc::Receiver<Action>,
        positions: std_mpsc::Receiver<(f32, f32)>,
        gestures: std_mpsc::Receiver<Gesture>,
    }

    fn session(config: &Config) -> (JoystickCursor, Arc<FakeClock>, Captured) {
        let clock = Arc::new(FakeClock::new());
        let (action_tx, actions) = std_mpsc::channel();
        let (position_tx, positions) = std_mpsc::channel();
        let (gesture_tx, gestures) = std_mpsc::channel();

        let cursor = JoystickCursor::new(
            7,
            1000.0,
            500.0,
            AxisRange {
                flat: 0.1,
                fuzz: 0.0,
            },
            config,
            ButtonLayout::default_layout(),
            clock.clone(),
            DeviceCallbacks {
                on_action: Box::new(move |action| {
                    let _ = action_tx.send(action);
                }),
                on_position: Box::new(move |x, y| {
                    let _ = position_tx.send((x, y));
                }),
                on_gesture: Box::new(move |gesture| {
                    let _ = gesture_tx.send(gesture);
                }),
            },
        )
        .expect("default layout should build");

        (cursor, clock, Captured { actions, positions, gestures })
    }

    fn drain<T>(rx: &std_mpsc::Receiver<T>) -> Vec<T> {
        rx.try_iter().collect()
    }

    #[test]
    fn pointer_motion_reports_positions() {
        let config = Config::default();
        let (mut sut, clock, captured) = session(&config);

        // First sample anchors the timestamp only.
        sut.handle_axis_event(AxisId::LEFT_X, 1.0);
        assert!(drain(&captured.positions).is_empty());
        assert!(sut.wants_repeat());

        clock.advance_millis(100);
        sut.tick();
        assert_eq!(drain(&captured.positions), vec![(550.0, 250.0)]);

        sut.handle_axis_event(AxisId::LEFT_X, 0.0);
        assert!(!sut.wants_repeat());
    }

    #[test]
    fn fast_cursor_button_scales_motion() {
        let config = Config::default();
        let (mut sut, clock, captured) = session(&config);

        sut.handle_button_event(ButtonCode::L1, true);
        assert_eq!(drain(&captured.actions), vec![Action::FastCursorPress]);
        assert!(sut.is_fast_cursor_enabled());

        sut.handle_axis_event(AxisId::LEFT_X, 1.0);
        clock.advance_millis(100);
        sut.tick();
        assert_eq!(drain(&captured.positions), vec![(600.0, 250.0)]);
    }

    #[test]
    fn trigger_axis_presses_primary_and_builds_touch_gesture() {
        let config = Config::default();
        let (mut sut, clock, captured) = session(&config);

        sut.handle_axis_event(AxisId::RIGHT_TRIGGER, 1.0);
        assert_eq!(drain(&captured.actions), vec![Action::PrimaryPress]);
        assert!(sut.is_primary_pressed());

        clock.advance_millis(120);
        sut.handle_axis_event(AxisId::RIGHT_TRIGGER, 0.0);
        assert_eq!(drain(&captured.actions), vec![Action::PrimaryRelease]);

        let gestures = drain(&captured.gestures);
        assert_eq!(gestures.len(), 1);
        assert_eq!(
            gestures[0].strokes,
            vec![GestureStroke {
                from: (500.0, 250.0),
                to: (500.0, 250.0),
                start_offset_ms: 0,
                duration_ms: 120,
                continues: false,
            }]
        );
    }

    #[test]
    fn drag_episode_times_stroke_from_distance() {
        let config = Config::default();
        let (mut sut, clock, captured) = session(&config);

        sut.handle_button_event(ButtonCode::R2, true);
        sut.handle_axis_event(AxisId::LEFT_X, 1.0);
        clock.advance_millis(100);
        sut.tick();
        clock.advance_millis(100);
        sut.tick();
        sut.handle_axis_event(AxisId::LEFT_X, 0.0);
        sut.handle_button_event(ButtonCode::R2, false);

        let gestures = drain(&captured.gestures);
        assert_eq!(gestures.len(), 1);
        let stroke = gestures[0].strokes[0];
        assert_eq!(stroke.from, (500.0, 250.0));
        assert_eq!(stroke.to, (600.0, 250.0));
        // 100 px at the 50 px/s minimum fling velocity, minus the 10 ms guard.
        assert_eq!(stroke.duration_ms, 1990);
    }

    #[test]
    fn toggle_gesture_mid_drag_produces_a_fling() {
        let config = Config::default();
        let (mut sut, clock, captured) = session(&config);

        sut.handle_button_event(ButtonCode::R2, true);
        sut.handle_axis_event(AxisId::LEFT_X, 1.0);
        clock.advance_millis(100);
        sut.tick();

        // R2 is held, so A resolves through the right-shift table.
        sut.handle_button_event(ButtonCode::A, true);
        sut.handle_button_event(ButtonCode::A, false);
        assert!(drain(&captured.actions).contains(&Action::ToggleGesture));

        sut.handle_axis_event(AxisId::LEFT_X, 0.0);
        sut.handle_button_event(ButtonCode::R2, false);

        let gestures = drain(&captured.gestures);
        // 50 px at the 8000 px/s maximum fling velocity: 6 ms.
        assert_eq!(gestures[0].strokes[0].duration_ms, 6);
    }

    #[test]
    fn toggle_chord_disables_and_reenables() {
        let config = Config::default();
        let (mut sut, _clock, captured) = session(&config);

        sut.handle_button_event(ButtonCode::L1, true);
        sut.handle_button_event(ButtonCode::L2, true);
        sut.handle_button_event(ButtonCode::R1, true);
        sut.handle_button_event(ButtonCode::R2, true);
        assert!(drain(&captured.actions).contains(&Action::ToggleEnabled));
        assert!(!sut.is_enabled());

        // While disabled, actions are not forwarded and motion is ignored.
        sut.handle_button_event(ButtonCode::A, true);
        sut.handle_button_event(ButtonCode::A, false);
        sut.handle_axis_event(AxisId::LEFT_X, 1.0);
        assert!(drain(&captured.actions).is_empty());
        assert!(drain(&captured.positions).is_empty());
        assert!(!sut.wants_repeat());

        // Disable reset the processor, so the chord can be pressed again.
        sut.handle_button_event(ButtonCode::L1, false);
        sut.handle_button_event(ButtonCode::L2, false);
        sut.handle_button_event(ButtonCode::R1, false);
        sut.handle_button_event(ButtonCode::R2, false);
        sut.handle_button_event(ButtonCode::L1, true);
        sut.handle_button_event(ButtonCode::L2, true);
        sut.handle_button_event(ButtonCode::R1, true);
        sut.handle_button_event(ButtonCode::R2, true);
        assert!(drain(&captured.actions).contains(&Action::ToggleEnabled));
        assert!(sut.is_enabled());
    }

    #[test]
    fn reset_drops_live_episode_without_emitting() {
        let config = Config::default();
        let (mut sut, _clock, captured) = session(&config);

        sut.handle_button_event(ButtonCode::R2, true);
        drain(&captured.actions);

        sut.reset();
        assert!(drain(&captured.gestures).is_empty());
        assert!(!sut.is_primary_pressed());

        // Usable immediately after teardown.
        sut.handle_button_event(ButtonCode::R2, true);
        assert_eq!(drain(&captured.actions), vec![Action::PrimaryPress]);
    }

    #[test]
    fn unknown_axes_are_ignored() {
        let config = Config::default();
        let (mut sut, _clock, captured) = session(&config);

        sut.handle_axis_event(AxisId(42), 1.0);
        assert!(drain(&captured.positions).is_empty());
        assert!(!sut.wants_repeat());
    }
}
