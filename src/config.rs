//! Application-wide constants and compile-time configuration.
//!
//! All protocol constants, timing parameters, and buffer capacities
//! live here so they can be tuned in one place.

// BLE assigned numbers

/// Device Information Service.
pub const DIS_SERVICE_UUID: u16 = 0x180A;

/// PnP ID characteristic (vendor/product identification).
pub const DIS_PNP_ID_UUID: u16 = 0x2A50;

/// HID Service.
pub const HID_SERVICE_UUID: u16 = 0x1812;

/// HID Report characteristic (input/output/feature reports).
pub const HID_REPORT_UUID: u16 = 0x2A4D;

/// HID Report Map characteristic (the report descriptor blob).
pub const HID_REPORT_MAP_UUID: u16 = 0x2A4B;

/// HID Information characteristic.
pub const HID_INFO_UUID: u16 = 0x2A4A;

/// HID Protocol Mode characteristic.
pub const PROTOCOL_MODE_UUID: u16 = 0x2A4E;

/// Client Characteristic Configuration descriptor.
pub const CCC_DESCRIPTOR_UUID: u16 = 0x2902;

/// GAP appearance value for a HID gamepad.
pub const APPEARANCE_GAMEPAD: u16 = 0x03C4;

/// Protocol Mode value selecting Report Protocol (vs Boot Protocol).
pub const PROTOCOL_MODE_REPORT: u8 = 0x01;

/// CCC value enabling notifications.
pub const CCC_NOTIFY_ENABLE: u16 = 0x0001;

// Scan parameters (in 0.625 ms units)

pub const SCAN_INTERVAL: u16 = 0x50;
pub const SCAN_WINDOW: u16 = 0x30;

/// GATT client application id used at registration.
pub const GATTC_APP_ID: u16 = 0;

// Discovery

/// How many times an empty service search is re-issued on the same
/// connection before giving up and disconnecting.
pub const MAX_DISCOVERY_RETRIES: u8 = 3;

/// Maximum HID Report characteristics tracked per device. Xbox
/// controllers expose 4-6; 8 leaves headroom.
pub const MAX_REPORT_CHARS: usize = 8;

/// Maximum characteristics enumerated per service.
pub const MAX_SERVICE_CHARS: usize = 16;

/// Report Map storage. Xbox descriptors are ~330 bytes.
pub const REPORT_MAP_MAX_LEN: usize = 512;

// Scan filter

/// Name substrings accepted by the scan filter.
pub const GAMEPAD_NAME_KEYWORDS: [&str; 3] = ["Xbox", "Controller", "Gamepad"];

// Input processing

/// Per-axis change (in normalized units) below which stick movement is
/// not reported.
pub const STICK_DEADZONE: i16 = 5;

/// Trigger change above which an analog trigger update is logged.
pub const TRIGGER_LOG_THRESHOLD: i16 = 10;

/// Battery level sentinel meaning "not read yet".
pub const BATTERY_UNKNOWN: u8 = 255;

/// Known gamepad vendor/product ids (log-only model identification).
pub const VENDOR_MICROSOFT: u16 = 0x045E;
pub const PRODUCT_XBOX_ONE_S: u16 = 0x02E0;
pub const PRODUCT_XBOX_SERIES: u16 = 0x0B20;
