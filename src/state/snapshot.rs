//! Control snapshots and the peer full-state payload

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::types::{ControlId, PRIMARY_BUTTONS, SECONDARY_BUTTONS};

/// Immutable copy of every control value, handed to adapters by the engine
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ControlSnapshot {
    values: BTreeMap<ControlId, i32>,
}

impl ControlSnapshot {
    pub fn new(values: BTreeMap<ControlId, i32>) -> Self {
        Self { values }
    }

    /// Value of a control; controls absent from the snapshot read as 0
    pub fn value(&self, id: ControlId) -> i32 {
        self.values.get(&id).copied().unwrap_or(0)
    }

    /// Iterate (id, value) pairs in catalog order
    pub fn iter(&self) -> impl Iterator<Item = (ControlId, i32)> + '_ {
        self.values.iter().map(|(id, v)| (*id, *v))
    }

    /// Build the status payload sent to a connected peer
    pub fn status(&self) -> StatusPayload {
        let flag = |id: ControlId| u8::from(self.value(id) != 0);

        let mut page2 = [0u8; SECONDARY_BUTTONS as usize];
        for (i, slot) in page2.iter_mut().enumerate() {
            *slot = flag(ControlId::PageButton(i as u8 + 1));
        }

        StatusPayload {
            btn1: flag(ControlId::Button(1)),
            btn2: flag(ControlId::Button(2)),
            btn3: flag(ControlId::Button(3)),
            slider1: self.value(ControlId::Slider).clamp(0, i32::from(u8::MAX)) as u8,
            page2,
        }
    }
}

impl fmt::Display for ControlSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page1 [")?;
        for n in 1..=PRIMARY_BUTTONS {
            write!(f, " {}", self.value(ControlId::Button(n)))?;
        }
        write!(f, " ] slider1={} page2 [", self.value(ControlId::Slider))?;
        for n in 1..=SECONDARY_BUTTONS {
            write!(f, " {}", self.value(ControlId::PageButton(n)))?;
        }
        write!(f, " ]")
    }
}

/// Full-state notification record
///
/// Field order is part of the wire format: peers receive
/// `{"btn1":..,"btn2":..,"btn3":..,"slider1":..,"page2":[..]}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPayload {
    pub btn1: u8,
    pub btn2: u8,
    pub btn3: u8,
    pub slider1: u8,
    pub page2: [u8; SECONDARY_BUTTONS as usize],
}

impl StatusPayload {
    /// Render the compact JSON sent over the status characteristic
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
