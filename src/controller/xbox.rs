//! Xbox Wireless Controller (BLE) input report parser.
//!
//! Layout of the 16-byte HOGP input report (model 1708 and Series X|S
//! firmware over BLE):
//!
//! ```text
//!  0..2   left stick X    u16 LE, 0..65535, centre 32768
//!  2..4   left stick Y    u16 LE (up is 0, so the axis is inverted)
//!  4..6   right stick X   u16 LE
//!  6..8   right stick Y   u16 LE
//!  8..10  left trigger    10-bit, 0..1023
//! 10..12  right trigger   10-bit, 0..1023
//! 12      hat switch      0 = released, 1..8 clockwise from up
//! 13      face buttons    A/B/X/Y, shoulders
//! 14      system buttons  View/Menu/thumbsticks/Home
//! 15      misc            Share
//! ```
//!
//! Byte 14 bit positions other than Home (bit 4) have not been verified
//! against hardware; they follow the commonly reported layout.

use super::{Controller, ControllerState};

/// Minimum input report length we accept.
const REPORT_LEN: usize = 16;

#[derive(Debug, Default)]
pub struct XboxController {
    state: ControllerState,
    // Cached for the day output reports are implemented.
    rumble_left: u8,
    rumble_right: u8,
}

impl XboxController {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Map a raw 0..65535 axis to -127..=127 with 32768 centred on 0.
/// Monotonic, exact at both endpoints and at centre.
fn normalize_stick(raw: u16) -> i8 {
    ((raw as i32 - 32768) * 255 / 65535) as i8
}

/// Scale a 10-bit trigger to 0..=255.
fn normalize_trigger(raw: u16) -> u8 {
    (((raw & 0x03FF) as u32 * 255) / 1023) as u8
}

fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

impl Controller for XboxController {
    fn parse_input_report(&mut self, data: &[u8]) -> bool {
        if data.len() < REPORT_LEN {
            return false;
        }

        let s = &mut self.state;

        s.left_stick_x = normalize_stick(read_u16(data, 0));
        s.left_stick_y = normalize_stick(read_u16(data, 2)).saturating_neg();
        s.right_stick_x = normalize_stick(read_u16(data, 4));
        s.right_stick_y = normalize_stick(read_u16(data, 6)).saturating_neg();

        s.left_trigger = normalize_trigger(read_u16(data, 8));
        s.right_trigger = normalize_trigger(read_u16(data, 10));

        // Hat: 0 released, then clockwise 1=up .. 8=up-left.
        let hat = data[12];
        s.buttons.dpad_up = matches!(hat, 1 | 2 | 8);
        s.buttons.dpad_right = matches!(hat, 2 | 3 | 4);
        s.buttons.dpad_down = matches!(hat, 4 | 5 | 6);
        s.buttons.dpad_left = matches!(hat, 6 | 7 | 8);

        let face = data[13];
        s.buttons.button_south = face & 0x01 != 0;
        s.buttons.button_east = face & 0x02 != 0;
        s.buttons.button_west = face & 0x08 != 0;
        s.buttons.button_north = face & 0x10 != 0;
        s.buttons.shoulder_left = face & 0x40 != 0;
        s.buttons.shoulder_right = face & 0x80 != 0;

        let system = data[14];
        s.buttons.select = system & 0x04 != 0;
        s.buttons.start = system & 0x08 != 0;
        s.buttons.home = system & 0x10 != 0;
        s.buttons.thumb_left = system & 0x20 != 0;
        s.buttons.thumb_right = system & 0x40 != 0;

        s.buttons.misc = data[15] & 0x01 != 0;

        true
    }

    fn on_connect(&mut self) {
        self.state.reset();
        self.state.connected = true;
    }

    fn on_disconnect(&mut self) {
        self.state.connected = false;
        self.state.reset();
    }

    fn state(&self) -> &ControllerState {
        &self.state
    }

    fn controller_type(&self) -> &'static str {
        "Xbox Wireless Controller"
    }

    fn supports_rumble(&self) -> bool {
        true
    }

    // The HID output report for rumble is not wired up yet; remember
    // the request and report failure.
    fn set_rumble(&mut self, left: u8, right: u8) -> bool {
        self.rumble_left = left;
        self.rumble_right = right;
        false
    }
}
