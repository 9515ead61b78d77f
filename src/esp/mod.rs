//! ESP-IDF Bluedroid adapter (cargo feature `embedded`).
//!
//! Two thin layers around the host-testable core:
//! - `callbacks`: the `extern "C"` GAP / GATT-client callbacks, which
//!   translate Bluedroid's parameter unions into the crate's event
//!   enums and feed them to the shared [`GamepadBridge`];
//! - `executor`: runs each [`Action`] the bridge returns against the
//!   raw `esp_idf_svc::sys` API.
//!
//! Callbacks run on the Bluedroid task; the frame loop in `main.rs`
//! runs on the main task. Both go through one mutex-guarded bridge.

pub mod callbacks;
pub mod executor;

use crate::ble::event::{GapEvent, GattcEvent, ScanResult};
use crate::ble::GamepadBridge;
use crate::controller::InputEvent;
use crate::error::Error;
use esp_idf_svc::sys;
use log::{error, info};
use std::sync::{LazyLock, Mutex, MutexGuard};

static BRIDGE: LazyLock<Mutex<GamepadBridge>> = LazyLock::new(|| Mutex::new(GamepadBridge::new()));

/// GATT client interface id handed out at registration.
static GATTC_IF: Mutex<Option<u8>> = Mutex::new(None);

/// Turn a non-zero `esp_err_t` into our error type.
macro_rules! esp {
    ($call:expr) => {{
        let err = $call;
        if err == sys::ESP_OK {
            Ok::<(), Error>(())
        } else {
            Err(Error::Ble(crate::error::BleError::Raw(err as u8)))
        }
    }};
}

fn bridge() -> MutexGuard<'static, GamepadBridge> {
    BRIDGE.lock().unwrap_or_else(|e| e.into_inner())
}

pub(crate) fn gattc_if() -> Option<u8> {
    *GATTC_IF.lock().unwrap_or_else(|e| e.into_inner())
}

pub(crate) fn set_gattc_if(value: u8) {
    *GATTC_IF.lock().unwrap_or_else(|e| e.into_inner()) = Some(value);
}

/// Initialize the Bluedroid stack and register the GAP / GATT-client
/// callbacks. The rest of the bring-up (security, scanning, the whole
/// HOGP sequence) is driven by the bridge from the registration event.
pub fn init() -> Result<(), Error> {
    unsafe {
        let mut bt_cfg: sys::esp_bt_controller_config_t = bt_controller_default_config();

        esp!(sys::esp_bt_controller_mem_release(
            sys::esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT
        ))?;
        esp!(sys::esp_bt_controller_init(&mut bt_cfg))?;
        esp!(sys::esp_bt_controller_enable(
            sys::esp_bt_mode_t_ESP_BT_MODE_BLE
        ))?;
        esp!(sys::esp_bluedroid_init())?;
        esp!(sys::esp_bluedroid_enable())?;

        esp!(sys::esp_ble_gap_register_callback(Some(callbacks::gap_cb)))?;
        esp!(sys::esp_ble_gattc_register_callback(Some(
            callbacks::gattc_cb
        )))?;
        esp!(sys::esp_ble_gattc_app_register(crate::config::GATTC_APP_ID))?;
    }
    info!("Bluedroid initialised, GATT client registering");
    Ok(())
}

unsafe fn bt_controller_default_config() -> sys::esp_bt_controller_config_t {
    // BT_CONTROLLER_INIT_CONFIG_DEFAULT is a C macro; zero-init plus
    // the magic field is what it expands to for the fields we rely on.
    let mut cfg: sys::esp_bt_controller_config_t = core::mem::zeroed();
    cfg.magic = sys::ESP_BT_CTRL_CONFIG_MAGIC_VAL;
    cfg.version = sys::ESP_BT_CTRL_CONFIG_VERSION;
    cfg.controller_task_stack_size = sys::ESP_TASK_BT_CONTROLLER_STACK as u16;
    cfg.controller_task_prio = sys::ESP_TASK_BT_CONTROLLER_PRIO as u8;
    cfg.ble_max_act = sys::CONFIG_BT_CTRL_BLE_MAX_ACT as u8;
    cfg
}

/// Bridge entry points used by the callback layer. Each dispatch locks
/// the bridge, translates, and immediately executes the returned
/// actions.

pub(crate) fn dispatch_gap(event: &GapEvent) {
    let actions = bridge().handle_gap_event(event);
    executor::run(&actions);
}

pub(crate) fn dispatch_scan_result(result: &ScanResult) {
    let actions = bridge().handle_scan_result(result);
    executor::run(&actions);
}

pub(crate) fn dispatch_gattc(event: &GattcEvent) {
    let actions = bridge().handle_gattc_event(event);
    executor::run(&actions);
}

pub(crate) fn service_range(
    service: crate::ble::event::ServiceKind,
) -> (u16, u16) {
    bridge().service_range(service)
}

pub(crate) fn mark_failed() {
    error!("GATT client registration failed; bridge is down");
}

/// Frame-loop surface for `main.rs`.

pub fn is_failed() -> bool {
    bridge().has_failed()
}

pub fn is_connected() -> bool {
    bridge().is_connected()
}

pub fn poll() -> heapless::Vec<InputEvent, { crate::ble::bridge::MAX_FRAME_EVENTS }> {
    bridge().poll()
}
