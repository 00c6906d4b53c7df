//! Demo shell: feeds gilrs controller events into per-device pipelines and
//! logs the resulting actions, pointer positions and gestures.

use color_eyre::{eyre::eyre, Result};
use gilrs::{Axis, Button, Event, EventType, GamepadId, Gilrs};
use joycursor::clock::MonotonicClock;
use joycursor::config::Config;
use joycursor::device::{AxisRange, DeviceCallbacks, DeviceDriver, DeviceEvent, DeviceHandle};
use joycursor::gesture::Gesture;
use joycursor::input::axis::AxisId;
use joycursor::input::processor::ButtonLayout;
use joycursor::input::{Action, ButtonCode};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

// Demo viewport; a real embedder would report its display size.
const VIEWPORT_WIDTH: f32 = 1920.0;
const VIEWPORT_HEIGHT: f32 = 1080.0;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = Config::load_or_default().map_err(|e| eyre!("Failed to load config: {}", e))?;
    debug!("Pipeline config: {:?}", config);

    info!("Initializing gilrs controller interface");
    let mut gilrs = Gilrs::new().map_err(|e| eyre!("Failed to initialize gilrs: {}", e))?;

    let clock = Arc::new(MonotonicClock::new());
    let mut devices: HashMap<GamepadId, DeviceHandle> = HashMap::new();
    let mut next_device_id = 0u32;

    // Gamepads already connected at startup never emit a Connected event.
    let initial: Vec<GamepadId> = gilrs.gamepads().map(|(id, _)| id).collect();
    for id in initial {
        attach(&gilrs, id, &mut next_device_id, &config, clock.clone(), &mut devices)?;
    }

    loop {
        while let Some(Event { id, event, .. }) = gilrs.next_event() {
            match event {
                EventType::Connected => {
                    attach(&gilrs, id, &mut next_device_id, &config, clock.clone(), &mut devices)?;
                }
                EventType::Disconnected => {
                    if let Some(handle) = devices.remove(&id) {
                        info!("Gamepad {} disconnected, tearing down its session", id);
                        handle.shutdown();
                    }
                }
                other => {
                    if let Some(device_event) = translate(other) {
                        deliver(&mut devices, id, device_event).await;
                    }
                }
            }
        }

        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

fn attach(
    gilrs: &Gilrs,
    id: GamepadId,
    next_device_id: &mut u32,
    config: &Config,
    clock: Arc<MonotonicClock>,
    devices: &mut HashMap<GamepadId, DeviceHandle>,
) -> Result<()> {
    let name = gilrs
        .connected_gamepad(id)
        .map(|gamepad| gamepad.name().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let device_id = *next_device_id;
    *next_device_id += 1;

    info!("Attaching gamepad {} ({}) as device {}", id, name, device_id);

    let handle = DeviceDriver::spawn(
        device_id,
        VIEWPORT_WIDTH,
        VIEWPORT_HEIGHT,
        AxisRange::default(),
        config,
        ButtonLayout::default_layout(),
        clock,
        DeviceCallbacks {
            on_action: Box::new(move |action: Action| {
                info!("device {}: action {}", device_id, action);
            }),
            on_position: Box::new(move |x, y| {
                debug!("device {}: pointer at ({:.1}, {:.1})", device_id, x, y);
            }),
            on_gesture: Box::new(move |gesture: Gesture| {
                info!(
                    "device {}: gesture with {} strokes over {} ms",
                    device_id,
                    gesture.strokes.len(),
                    gesture.duration_ms()
                );
            }),
        },
    )
    .map_err(|e| eyre!("Failed to spawn device session: {}", e))?;

    devices.insert(id, handle);
    Ok(())
}

async fn deliver(
    devices: &mut HashMap<GamepadId, DeviceHandle>,
    id: GamepadId,
    event: DeviceEvent,
) {
    let Some(handle) = devices.get(&id) else {
        return;
    };
    if handle.send(event).await.is_err() {
        warn!("Device session for gamepad {} is gone, dropping it", id);
        devices.remove(&id);
    }
}

/// Converts a gilrs event into a pipeline event. The vertical stick axis is
/// negated: gilrs reports up as positive while the pointer plane grows
/// downward.
fn translate(event: EventType) -> Option<DeviceEvent> {
    match event {
        EventType::AxisChanged(axis, value, _) => {
            let (axis, value) = match axis {
                Axis::LeftStickX => (AxisId::LEFT_X, value),
                Axis::LeftStickY => (AxisId::LEFT_Y, -value),
                Axis::DPadX => (AxisId::HAT_X, value),
                Axis::DPadY => (AxisId::HAT_Y, -value),
                _ => return None,
            };
            Some(DeviceEvent::Axis { axis, value })
        }
        // Analog triggers arrive as button value changes.
        EventType::ButtonChanged(Button::LeftTrigger2, value, _) => Some(DeviceEvent::Axis {
            axis: AxisId::LEFT_TRIGGER,
            value,
        }),
        EventType::ButtonChanged(Button::RightTrigger2, value, _) => Some(DeviceEvent::Axis {
            axis: AxisId::RIGHT_TRIGGER,
            value,
        }),
        EventType::ButtonPressed(button, _) => button_code(button).map(|code| DeviceEvent::Button {
            code,
            is_pressed: true,
        }),
        EventType::ButtonReleased(button, _) => button_code(button).map(|code| DeviceEvent::Button {
            code,
            is_pressed: false,
        }),
        _ => None,
    }
}

fn button_code(button: Button) -> Option<ButtonCode> {
    match button {
        Button::South => Some(ButtonCode::A),
        Button::East => Some(ButtonCode::B),
        Button::West => Some(ButtonCode::X),
        Button::North => Some(ButtonCode::Y),
        Button::LeftTrigger => Some(ButtonCode::L1),
        Button::RightTrigger => Some(ButtonCode::R1),
        Button::Select => Some(ButtonCode::SELECT),
        Button::Start => Some(ButtonCode::START),
        Button::Mode => Some(ButtonCode::MODE),
        Button::LeftThumb => Some(ButtonCode::THUMBL),
        Button::RightThumb => Some(ButtonCode::THUMBR),
        Button::DPadUp => Some(ButtonCode::DPAD_UP),
        Button::DPadDown => Some(ButtonCode::DPAD_DOWN),
        Button::DPadLeft => Some(ButtonCode::DPAD_LEFT),
        Button::DPadRight => Some(ButtonCode::DPAD_RIGHT),
        // The analog triggers are handled as axes.
        _ => None,
    }
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
