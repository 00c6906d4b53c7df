//! Input interpretation pipeline.
//!
//! Converts raw controller samples into pointer motion and logical actions:
//!
//! 1. [`axis`] - deadzone/noise filtering and axis-to-button synthesis
//! 2. [`button`] - composable virtual buttons with chord/multiplex semantics
//! 3. [`processor`] - shift-state routing of button transitions into actions
//! 4. [`cursor`] - pointer position integration over time
//!
//! # Architecture
//!
//! ```text
//! raw samples ──► AxisFilter ──┬─► AxisButtonMapper ──► ButtonProcessor ──► Action
//!                              └─► CursorIntegrator ──► (x, y)
//! ```
//!
//! Everything here is synchronous and single threaded; the device session in
//! [`crate::device`] drives it from one dispatch loop.

pub mod action;
pub mod axis;
pub mod button;
pub mod cursor;
pub mod processor;

pub use action::Action;
pub use axis::{AxisButtonMapper, AxisFilter, AxisId};
pub use button::{ButtonCode, ButtonMode, VirtualButton};
pub use cursor::CursorIntegrator;
pub use processor::{ButtonLayout, ButtonProcessor, Mapping, ProcessorError};
