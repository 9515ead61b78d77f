//! Advertisement parsing and the gamepad scan filter.
//!
//! BLE advertisements are a sequence of length-prefixed AD structures:
//! `[len][type][len-1 bytes of payload]`. Controllers are recognised by
//! any of three signals: the gamepad GAP appearance, the HID service
//! UUID, or a known name substring.

use crate::config;
use heapless::String;

/// Fields extracted from one raw advertisement payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvertisementInfo {
    /// Complete local name, truncated to capacity.
    pub name: String<32>,
    /// 16-bit GAP appearance, if advertised.
    pub appearance: Option<u16>,
    /// The HID service UUID (0x1812) appeared in a 16-bit UUID list.
    pub has_hid_service: bool,
}

impl AdvertisementInfo {
    /// Walk the AD structures, bound-checking each one. Malformed
    /// lengths (zero, or running past the payload) abort the walk;
    /// whatever was parsed up to that point is kept.
    pub fn parse(data: &[u8]) -> Self {
        let mut info = AdvertisementInfo::default();
        let hid_uuid_le = config::HID_SERVICE_UUID.to_le_bytes();

        let mut i = 0;
        while i < data.len() {
            let len = data[i] as usize;
            if len == 0 || i + len >= data.len() {
                break;
            }
            let ad_type = data[i + 1];
            let payload = &data[i + 2..i + 1 + len];
            match ad_type {
                // Incomplete / complete list of 16-bit service UUIDs
                0x02 | 0x03 => {
                    for chunk in payload.chunks_exact(2) {
                        if chunk == hid_uuid_le {
                            info.has_hid_service = true;
                        }
                    }
                }
                // Complete local name. Shortened names (0x08) are not
                // matched: a truncated name can alias unrelated devices.
                0x09 => {
                    let mut name = String::new();
                    for &b in payload {
                        if name.push(b as char).is_err() {
                            break;
                        }
                    }
                    info.name = name;
                }
                // Appearance
                0x19 => {
                    if payload.len() >= 2 {
                        info.appearance = Some(u16::from_le_bytes([payload[0], payload[1]]));
                    }
                }
                _ => {}
            }
            i += len + 1;
        }
        info
    }

    /// Scan filter: accept if any one signal matches.
    pub fn is_gamepad(&self) -> bool {
        if self.appearance == Some(config::APPEARANCE_GAMEPAD) {
            return true;
        }
        if self.has_hid_service {
            return true;
        }
        config::GAMEPAD_NAME_KEYWORDS
            .iter()
            .any(|kw| contains(self.name.as_str(), kw))
    }
}

/// Case-sensitive substring search (no_std, no alloc).
fn contains(haystack: &str, needle: &str) -> bool {
    if needle.len() > haystack.len() {
        return false;
    }
    haystack
        .as_bytes()
        .windows(needle.len())
        .any(|w| w == needle.as_bytes())
}
