//! Controller abstraction: normalized input state plus the per-model
//! parser contract.
//!
//! Raw HID input reports are model-specific; everything downstream of
//! the parser works on [`ControllerState`] only.

pub mod xbox;

pub use xbox::XboxController;

use crate::config;

/// Digital button flags. One `bool` per button keeps the diff logic
/// trivial and the struct `Copy`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Buttons {
    pub dpad_up: bool,
    pub dpad_down: bool,
    pub dpad_left: bool,
    pub dpad_right: bool,
    pub button_south: bool,
    pub button_east: bool,
    pub button_west: bool,
    pub button_north: bool,
    pub shoulder_left: bool,
    pub shoulder_right: bool,
    pub trigger_left: bool,
    pub trigger_right: bool,
    pub thumb_left: bool,
    pub thumb_right: bool,
    pub select: bool,
    pub start: bool,
    pub home: bool,
    pub misc: bool,
}

/// Button identifiers, used for diff reporting. `name()` values are the
/// strings consumers key their bindings on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    DpadUp,
    DpadDown,
    DpadLeft,
    DpadRight,
    South,
    East,
    West,
    North,
    ShoulderLeft,
    ShoulderRight,
    TriggerLeft,
    TriggerRight,
    ThumbLeft,
    ThumbRight,
    Select,
    Start,
    Home,
    Misc,
}

impl Button {
    /// All buttons in a fixed order; diff events fire in this order.
    pub const ALL: [Button; 18] = [
        Button::DpadUp,
        Button::DpadDown,
        Button::DpadLeft,
        Button::DpadRight,
        Button::South,
        Button::East,
        Button::West,
        Button::North,
        Button::ShoulderLeft,
        Button::ShoulderRight,
        Button::TriggerLeft,
        Button::TriggerRight,
        Button::ThumbLeft,
        Button::ThumbRight,
        Button::Select,
        Button::Start,
        Button::Home,
        Button::Misc,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Button::DpadUp => "UP",
            Button::DpadDown => "DOWN",
            Button::DpadLeft => "LEFT",
            Button::DpadRight => "RIGHT",
            Button::South => "A",
            Button::East => "B",
            Button::West => "X",
            Button::North => "Y",
            Button::ShoulderLeft => "L1",
            Button::ShoulderRight => "R1",
            Button::TriggerLeft => "L2",
            Button::TriggerRight => "R2",
            Button::ThumbLeft => "L3",
            Button::ThumbRight => "R3",
            Button::Select => "SELECT",
            Button::Start => "START",
            Button::Home => "HOME",
            Button::Misc => "MISC",
        }
    }
}

impl Buttons {
    pub fn get(&self, button: Button) -> bool {
        match button {
            Button::DpadUp => self.dpad_up,
            Button::DpadDown => self.dpad_down,
            Button::DpadLeft => self.dpad_left,
            Button::DpadRight => self.dpad_right,
            Button::South => self.button_south,
            Button::East => self.button_east,
            Button::West => self.button_west,
            Button::North => self.button_north,
            Button::ShoulderLeft => self.shoulder_left,
            Button::ShoulderRight => self.shoulder_right,
            Button::TriggerLeft => self.trigger_left,
            Button::TriggerRight => self.trigger_right,
            Button::ThumbLeft => self.thumb_left,
            Button::ThumbRight => self.thumb_right,
            Button::Select => self.select,
            Button::Start => self.start,
            Button::Home => self.home,
            Button::Misc => self.misc,
        }
    }
}

/// Normalized controller state, updated in place by the parser.
///
/// Sticks are signed with 0 centred; triggers are unsigned 0..=255.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerState {
    pub buttons: Buttons,
    pub left_stick_x: i8,
    pub left_stick_y: i8,
    pub right_stick_x: i8,
    pub right_stick_y: i8,
    pub left_trigger: u8,
    pub right_trigger: u8,
    /// 0..=100, or `BATTERY_UNKNOWN` when never read.
    pub battery_level: u8,
    pub connected: bool,
}

impl Default for ControllerState {
    fn default() -> Self {
        Self {
            buttons: Buttons::default(),
            left_stick_x: 0,
            left_stick_y: 0,
            right_stick_x: 0,
            right_stick_y: 0,
            left_trigger: 0,
            right_trigger: 0,
            battery_level: config::BATTERY_UNKNOWN,
            connected: false,
        }
    }
}

impl ControllerState {
    /// Return all inputs to neutral. Connection flag is managed
    /// separately by `on_connect`/`on_disconnect`.
    pub fn reset(&mut self) {
        let connected = self.connected;
        *self = ControllerState::default();
        self.connected = connected;
    }
}

/// Per-model parser contract.
pub trait Controller {
    /// Parse one raw HID input report into the normalized state.
    /// Returns `false` (leaving state untouched) on malformed input.
    fn parse_input_report(&mut self, data: &[u8]) -> bool;

    fn on_connect(&mut self);
    fn on_disconnect(&mut self);

    fn state(&self) -> &ControllerState;

    fn controller_type(&self) -> &'static str;

    // Output capabilities. Defaults: none.
    fn supports_rumble(&self) -> bool {
        false
    }
    fn set_rumble(&mut self, _left: u8, _right: u8) -> bool {
        false
    }
    fn supports_led(&self) -> bool {
        false
    }
    fn set_led_color(&mut self, _r: u8, _g: u8, _b: u8) -> bool {
        false
    }
}

/// Tagged controller dispatch. Only Xbox today; the variant keeps that
/// limitation visible at the type level rather than behind a trait
/// object.
#[derive(Debug)]
pub enum AnyController {
    Xbox(XboxController),
}

impl AnyController {
    /// Pick a parser for the device identified by PnP ID. Unknown
    /// vendor/product ids still get the Xbox parser; the report layout
    /// is the best guess available for a device that passed the HID
    /// gamepad scan filter.
    pub fn for_device(vendor_id: u16, product_id: u16) -> Self {
        let _ = (vendor_id, product_id);
        AnyController::Xbox(XboxController::new())
    }

    pub fn as_dyn(&mut self) -> &mut dyn Controller {
        match self {
            AnyController::Xbox(c) => c,
        }
    }

    pub fn state(&self) -> &ControllerState {
        match self {
            AnyController::Xbox(c) => c.state(),
        }
    }
}

/// One input change detected by the per-frame diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Button { button: Button, pressed: bool },
    StickMoved,
}
