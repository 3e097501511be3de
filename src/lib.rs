//! # Pad Bridge Library
//!
//! Drive a remote device with a gamepad, and push control scripts to it, over
//! a single WebSocket connection.
//!
//! The bridge samples the first enabled, bound controller once per frame,
//! translates it into a device-independent [`protocol::ControlState`] and
//! sends it with drop-not-queue backpressure. Inbound messages are routed by
//! their `action` field. The connection reconnects after a fixed delay.

pub mod binding;
pub mod config;
pub mod connection;
pub mod console;
pub mod error;
pub mod input;
pub mod notify;
pub mod protocol;
pub mod router;
pub mod session;
