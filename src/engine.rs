//! Sync engine - the single mutation entry point for every surface
//!
//! Accepts a change from any surface, applies it exactly once to the control
//! state, writes it through to the durable store, refreshes every other
//! surface and publishes the full state. The origin surface is never
//! refreshed with its own change, which is what keeps a widget that both
//! emits and displays a value from looping.

mod actor;
mod commands;
mod handle;

#[cfg(test)]
mod tests;

use thiserror::Error;

use crate::state::{StateError, StoreError};

pub use actor::SyncEngine;
pub use commands::{Change, EngineCommand};
pub use handle::EngineHandle;

/// Errors returned through the engine handle
#[derive(Debug, Error)]
pub enum EngineError {
    /// An adapter decoded an id outside the static catalog
    #[error("unknown control: {0}")]
    UnknownControl(String),

    #[error("control store error: {0}")]
    Store(#[from] StoreError),

    /// The engine actor is gone (shutdown or panic)
    #[error("sync engine stopped")]
    Stopped,
}

impl From<StateError> for EngineError {
    fn from(e: StateError) -> Self {
        match e {
            StateError::UnknownControl(id) => EngineError::UnknownControl(id),
        }
    }
}
