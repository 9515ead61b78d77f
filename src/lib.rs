//! Host-testable library interface for ble-gamepad.
//!
//! Everything here is pure logic: the scan filter, the HID-over-GATT
//! initialization state machine, and the controller report parsers.
//! No BLE stack is required, so the whole surface runs under
//! `cargo test --lib` on the host.
//!
//! The embedded binary (`src/main.rs`, cargo feature `embedded`) wires
//! these modules to the ESP-IDF Bluedroid stack through the adapter in
//! `src/esp/`.

#![cfg_attr(not(any(test, feature = "embedded")), no_std)]

pub mod ble;
pub mod config;
pub mod controller;
pub mod error;

#[cfg(feature = "embedded")]
pub mod esp;

pub use ble::{GamepadBridge, InitState};
pub use controller::{AnyController, Button, Controller, ControllerState, InputEvent};
pub use error::Error;

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests - cross-module behavior (module internals are tested in
// their own #[cfg(test)] blocks)
// ═══════════════════════════════════════════════════════════════════════════
