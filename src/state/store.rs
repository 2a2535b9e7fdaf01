//! ControlState - the authoritative map of control values
//!
//! Owned by the sync engine. Nothing outside the engine mutates it; adapters
//! only ever see [`ControlSnapshot`]s taken from it.

use std::collections::BTreeMap;

use super::snapshot::ControlSnapshot;
use super::types::{AppliedValue, Control, ControlId, StateError};

/// In-memory representation of every controllable value
#[derive(Debug, Clone)]
pub struct ControlState {
    controls: BTreeMap<ControlId, Control>,
}

impl ControlState {
    /// Build a state holding the full static catalog at default values
    pub fn new() -> Self {
        Self::from_controls(ControlId::all().map(ControlId::control))
    }

    /// Build a state from an explicit set of controls
    pub fn from_controls(controls: impl IntoIterator<Item = Control>) -> Self {
        Self {
            controls: controls.into_iter().map(|c| (c.id, c)).collect(),
        }
    }

    /// Current value of a control
    pub fn get(&self, id: ControlId) -> Result<i32, StateError> {
        self.control(id).map(|c| c.value)
    }

    /// Full record of a control
    pub fn control(&self, id: ControlId) -> Result<&Control, StateError> {
        self.controls
            .get(&id)
            .ok_or_else(|| StateError::UnknownControl(id.to_string()))
    }

    /// Iterate every control in catalog order
    pub fn controls(&self) -> impl Iterator<Item = &Control> {
        self.controls.values()
    }

    /// Normalize and store a value. Only the engine calls this.
    pub(crate) fn apply(&mut self, id: ControlId, raw: i64) -> Result<AppliedValue, StateError> {
        let control = self
            .controls
            .get_mut(&id)
            .ok_or_else(|| StateError::UnknownControl(id.to_string()))?;

        let previous = control.value;
        control.value = control.kind.normalize(raw);

        Ok(AppliedValue {
            control: id,
            value: control.value,
            previous,
        })
    }

    /// Flip a control inside the caller's critical section. Only the engine calls this.
    pub(crate) fn toggle(&mut self, id: ControlId) -> Result<AppliedValue, StateError> {
        let control = self.control(id)?;
        let next = control.kind.toggled(control.value);
        self.apply(id, i64::from(next))
    }

    /// Take a snapshot of every value
    pub fn snapshot(&self) -> ControlSnapshot {
        ControlSnapshot::new(self.controls.values().map(|c| (c.id, c.value)).collect())
    }
}

impl Default for ControlState {
    fn default() -> Self {
        Self::new()
    }
}
