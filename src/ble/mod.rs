//! BLE-facing logic: advertisement filtering, the event/action
//! vocabulary, and the connection bridge itself.

pub mod adv;
pub mod bridge;
pub mod event;

pub use adv::AdvertisementInfo;
pub use bridge::{GamepadBridge, InitState};
pub use event::{Action, Actions, BdAddr, GapEvent, GattStatus, GattcEvent, ScanResult};
