//! Embedded entry point (cargo feature `embedded`, ESP-IDF target).
//!
//! Brings up the Bluedroid stack, registers the GATT client, and runs
//! the frame loop: the BLE callbacks drive the bridge from the
//! Bluedroid task, while this loop polls the per-frame input diff.

use ble_gamepad::controller::InputEvent;
use ble_gamepad::esp;
use log::{error, info};
use std::thread;
use std::time::Duration;

/// Frame period for the input diff (~60 Hz).
const FRAME_PERIOD: Duration = Duration::from_millis(16);

fn main() {
    // Required once so the esp-idf-sys runtime patches link properly.
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    info!("ble-gamepad starting");

    if let Err(e) = esp::init() {
        error!("BLE stack bring-up failed: {:?}", e);
        return;
    }

    let mut was_connected = false;
    loop {
        if esp::is_failed() {
            error!("bridge is down, halting");
            return;
        }

        let connected = esp::is_connected();
        if connected != was_connected {
            info!(
                "controller {}",
                if connected { "ready" } else { "lost" }
            );
            was_connected = connected;
        }

        for event in esp::poll() {
            match event {
                InputEvent::Button { button, pressed } => {
                    info!(
                        "button {} {}",
                        button.name(),
                        if pressed { "pressed" } else { "released" }
                    );
                }
                InputEvent::StickMoved => {}
            }
        }

        thread::sleep(FRAME_PERIOD);
    }
}
