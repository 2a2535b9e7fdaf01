//! Characteristic table of the peer-link service
//!
//! Every control has one read/write characteristic carrying a single byte.
//! The status characteristic is read/notify only and carries the full-state
//! JSON payload.

use crate::state::{ControlId, SECONDARY_BUTTONS};

/// Primary service
pub const SERVICE_UUID: &str = "12345678-1234-5678-1234-56789abcdef0";

/// Full-state notification characteristic
pub const STATUS_UUID: &str = "12345678-1234-5678-1234-56789abcdef1";

const PRIMARY_UUIDS: [&str; 3] = [
    "12345678-1234-5678-1234-56789abcdea1",
    "12345678-1234-5678-1234-56789abcdea2",
    "12345678-1234-5678-1234-56789abcdea3",
];

const SLIDER_UUID: &str = "12345678-1234-5678-1234-56789abcdea4";

/// Secondary buttons use the index as the last two decimal digits
const SECONDARY_UUID_PREFIX: &str = "12345678-1234-5678-1234-56789abcde";

/// What a characteristic exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Characteristic {
    Status,
    Control(ControlId),
}

/// UUID of the characteristic bound to `id`
pub fn uuid_for(id: ControlId) -> Option<String> {
    if !id.is_valid() {
        return None;
    }
    match id {
        ControlId::Button(n) => Some(PRIMARY_UUIDS[usize::from(n) - 1].to_string()),
        ControlId::Slider => Some(SLIDER_UUID.to_string()),
        ControlId::PageButton(n) => Some(format!("{}{:02}", SECONDARY_UUID_PREFIX, n)),
    }
}

/// Resolve a UUID (case-insensitive) to its characteristic
pub fn lookup(uuid: &str) -> Option<Characteristic> {
    let uuid = uuid.to_ascii_lowercase();

    if uuid == STATUS_UUID {
        return Some(Characteristic::Status);
    }
    if uuid == SLIDER_UUID {
        return Some(Characteristic::Control(ControlId::Slider));
    }
    if let Some(i) = PRIMARY_UUIDS.iter().position(|u| *u == uuid) {
        return Some(Characteristic::Control(ControlId::Button(i as u8 + 1)));
    }

    let suffix = uuid.strip_prefix(SECONDARY_UUID_PREFIX)?;
    if suffix.len() != 2 || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n: u8 = suffix.parse().ok()?;
    (1..=SECONDARY_BUTTONS)
        .contains(&n)
        .then_some(Characteristic::Control(ControlId::PageButton(n)))
}
