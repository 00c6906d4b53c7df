//! Interprets game-controller input as a 2D pointer and logical actions.
//!
//! Raw axis samples and button transitions flow through a deterministic,
//! synchronous pipeline ([`input`]) that produces pointer positions and
//! logical [`input::Action`]s; pointer episodes bracketed by the primary
//! button are compiled into timed [`gesture::Gesture`]s. The [`device`]
//! module owns one such pipeline per connected controller and drives it from
//! a tokio task.
//!
//! All time is injected through [`clock::NanoClock`], so every stage can be
//! tested against a manually advanced clock.

pub mod clock;
pub mod config;
pub mod device;
pub mod gesture;
pub mod input;
