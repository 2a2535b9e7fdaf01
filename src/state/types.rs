//! Control type definitions
//!
//! Defines the statically enumerated panel controls: identifiers, kinds,
//! value normalization and persistence keys.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Number of primary buttons on the main touchscreen page
pub const PRIMARY_BUTTONS: u8 = 3;

/// Number of secondary buttons on the second touchscreen page
pub const SECONDARY_BUTTONS: u8 = 10;

/// Upper bound of the speed slider
pub const SLIDER_MAX: i32 = 255;

/// Errors raised by the control model
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// The id does not name one of the static controls.
    ///
    /// Reaching this at runtime means an adapter decoded an id that was never
    /// part of the catalog.
    #[error("unknown control: {0}")]
    UnknownControl(String),
}

/// Stable identifier of a control
///
/// Buttons are numbered from 1 so that the numeric part matches the
/// touchscreen widget names (`btn1`, `btn2_7`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ControlId {
    /// Primary button `btnN` on page 1
    Button(u8),
    /// Speed slider `slider1` on page 1
    Slider,
    /// Secondary button `btn2_N` on page 2
    PageButton(u8),
}

impl ControlId {
    /// Every control of the panel, in catalog order
    pub fn all() -> impl Iterator<Item = ControlId> {
        (1..=PRIMARY_BUTTONS)
            .map(ControlId::Button)
            .chain(std::iter::once(ControlId::Slider))
            .chain((1..=SECONDARY_BUTTONS).map(ControlId::PageButton))
    }

    /// Whether this id names a control of the static catalog
    pub fn is_valid(&self) -> bool {
        match *self {
            ControlId::Button(n) => (1..=PRIMARY_BUTTONS).contains(&n),
            ControlId::Slider => true,
            ControlId::PageButton(n) => (1..=SECONDARY_BUTTONS).contains(&n),
        }
    }

    /// Kind of value this control carries
    pub fn kind(&self) -> ControlKind {
        match self {
            ControlId::Slider => ControlKind::BoundedInteger {
                min: 0,
                max: SLIDER_MAX,
            },
            ControlId::Button(_) | ControlId::PageButton(_) => ControlKind::Boolean,
        }
    }

    /// Key under which the value is stored in the durable store
    ///
    /// Button keys carry a zero-based index (`p1b0` is `btn1`).
    pub fn persistence_key(&self) -> String {
        match *self {
            ControlId::Button(n) => format!("p1b{}", n.saturating_sub(1)),
            ControlId::Slider => "slider1".to_string(),
            ControlId::PageButton(n) => format!("p2b{}", n.saturating_sub(1)),
        }
    }

    /// Build the `Control` record for this id with its kind default value
    pub fn control(self) -> Control {
        let kind = self.kind();
        Control {
            id: self,
            kind,
            value: kind.default_value(),
            persistence_key: self.persistence_key(),
        }
    }
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlId::Button(n) => write!(f, "btn{}", n),
            ControlId::Slider => write!(f, "slider1"),
            ControlId::PageButton(n) => write!(f, "btn2_{}", n),
        }
    }
}

impl FromStr for ControlId {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || StateError::UnknownControl(s.to_string());

        let id = if s == "slider1" {
            ControlId::Slider
        } else if let Some(index) = s.strip_prefix("btn2_") {
            ControlId::PageButton(index.parse().map_err(|_| unknown())?)
        } else if let Some(index) = s.strip_prefix("btn") {
            ControlId::Button(index.parse().map_err(|_| unknown())?)
        } else {
            return Err(unknown());
        };

        if id.is_valid() {
            Ok(id)
        } else {
            Err(unknown())
        }
    }
}

/// Value domain of a control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    /// On/off flag, stored as 0 or 1
    Boolean,
    /// Integer clamped to `min..=max`
    BoundedInteger { min: i32, max: i32 },
}

impl ControlKind {
    /// Normalize a raw input value into this kind's domain
    ///
    /// Booleans coerce any nonzero input to 1. Integers clamp to the declared
    /// bounds. Never fails.
    pub fn normalize(self, raw: i64) -> i32 {
        match self {
            ControlKind::Boolean => i32::from(raw != 0),
            ControlKind::BoundedInteger { min, max } => {
                raw.clamp(i64::from(min), i64::from(max)) as i32
            }
        }
    }

    /// Value a control holds when nothing was persisted
    pub fn default_value(self) -> i32 {
        match self {
            ControlKind::Boolean => 0,
            ControlKind::BoundedInteger { min, .. } => min,
        }
    }

    /// The value a toggle produces from `current`
    ///
    /// Booleans flip. Bounded integers jump to `max` from `min` and back to
    /// `min` from anything else.
    pub fn toggled(self, current: i32) -> i32 {
        match self {
            ControlKind::Boolean => i32::from(current == 0),
            ControlKind::BoundedInteger { min, max } => {
                if current == min {
                    max
                } else {
                    min
                }
            }
        }
    }
}

/// One addressable value exposed across surfaces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub id: ControlId,
    pub kind: ControlKind,
    /// Current normalized value
    pub value: i32,
    pub persistence_key: String,
}

/// Result of a mutation applied by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedValue {
    pub control: ControlId,
    /// Normalized value now held in control state
    pub value: i32,
    /// Value held before the mutation
    pub previous: i32,
}

impl AppliedValue {
    /// Whether the mutation changed the stored value
    pub fn changed(&self) -> bool {
        self.value != self.previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_catalog_has_fourteen_controls() {
        let ids: Vec<_> = ControlId::all().collect();
        assert_eq!(ids.len(), 14);
        assert_eq!(ids[0], ControlId::Button(1));
        assert_eq!(ids[3], ControlId::Slider);
        assert_eq!(ids[13], ControlId::PageButton(10));
    }

    #[test]
    fn test_id_names_round_trip() {
        for id in ControlId::all() {
            let name = id.to_string();
            assert_eq!(name.parse::<ControlId>().unwrap(), id);
        }
        assert_eq!("btn2_7".parse::<ControlId>().unwrap(), ControlId::PageButton(7));
    }

    #[test]
    fn test_unknown_names_rejected() {
        for name in ["btn0", "btn4", "btn2_0", "btn2_11", "slider2", "t0", "btnx", ""] {
            assert_eq!(
                name.parse::<ControlId>(),
                Err(StateError::UnknownControl(name.to_string())),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn test_persistence_keys() {
        assert_eq!(ControlId::Button(1).persistence_key(), "p1b0");
        assert_eq!(ControlId::Button(3).persistence_key(), "p1b2");
        assert_eq!(ControlId::Slider.persistence_key(), "slider1");
        assert_eq!(ControlId::PageButton(10).persistence_key(), "p2b9");
    }

    #[test]
    fn test_slider_clamps() {
        let kind = ControlId::Slider.kind();
        assert_eq!(kind.normalize(300), 255);
        assert_eq!(kind.normalize(-5), 0);
        assert_eq!(kind.normalize(128), 128);
    }

    #[test]
    fn test_toggle() {
        assert_eq!(ControlKind::Boolean.toggled(0), 1);
        assert_eq!(ControlKind::Boolean.toggled(1), 0);
        let slider = ControlId::Slider.kind();
        assert_eq!(slider.toggled(0), 255);
        assert_eq!(slider.toggled(100), 0);
    }

    proptest! {
        #[test]
        fn prop_boolean_normalizes_to_flag(raw in any::<i64>()) {
            let v = ControlKind::Boolean.normalize(raw);
            prop_assert_eq!(v, i32::from(raw != 0));
        }

        #[test]
        fn prop_bounded_stays_in_range(raw in any::<i64>()) {
            let v = ControlId::Slider.kind().normalize(raw);
            prop_assert!((0..=SLIDER_MAX).contains(&v));
            if (0..=i64::from(SLIDER_MAX)).contains(&raw) {
                prop_assert_eq!(i64::from(v), raw);
            }
        }
    }
}
