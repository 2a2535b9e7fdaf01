//! Control state module - the panel's in-memory model and its durable image
//!
//! This module provides the control catalog, the authoritative
//! [`ControlState`] owned by the sync engine, snapshots handed to adapters,
//! and the persistence adapter that seeds state at boot and writes it through
//! on every mutation.

pub mod persistence;
mod snapshot;
mod store;
mod types;

pub use persistence::{load_all, ControlStore, MemoryStore, SledStore, StoreError};
pub use snapshot::{ControlSnapshot, StatusPayload};
pub use store::ControlState;
pub use types::{
    AppliedValue, Control, ControlId, ControlKind, StateError, PRIMARY_BUTTONS,
    SECONDARY_BUTTONS, SLIDER_MAX,
};
