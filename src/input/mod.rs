//! # Input Module
//!
//! Gamepad input handling.
//!
//! This module handles:
//! - Reading raw per-device snapshots from the platform (evdev on Linux)
//! - Choosing the single controller that feeds the stream
//! - Normalising vendor-specific layouts into a [`ControlState`](crate::protocol::ControlState)

pub mod evdev_source;
pub mod sampler;
pub mod snapshot;
pub mod source;

pub use evdev_source::EvdevSource;
pub use sampler::{convert, InputSampler};
pub use snapshot::{ButtonValue, RawControllerSnapshot};
pub use source::{ControllerSource, NoControllers};
