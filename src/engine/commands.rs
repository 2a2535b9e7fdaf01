//! Command enum for the sync engine actor
//!
//! Mutations and queries carry a oneshot responder; repaint and registration
//! requests are fire-and-forget. Every command goes through the same channel,
//! so the engine observes them in submission order.

use std::sync::Arc;

use tokio::sync::oneshot;

use super::EngineError;
use crate::state::{AppliedValue, ControlId, ControlSnapshot};
use crate::surface::{ResyncScope, Surface, SurfaceId};

/// How a mutation derives the new value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    /// Store this raw value after normalization
    Set(i64),
    /// Flip the current value
    Toggle,
}

/// Commands for the sync engine actor
pub enum EngineCommand {
    /// Apply a mutation originating from `origin`
    Apply {
        origin: SurfaceId,
        control: ControlId,
        change: Change,
        response: oneshot::Sender<Result<AppliedValue, EngineError>>,
    },

    /// Read one control value
    Get {
        control: ControlId,
        response: oneshot::Sender<Result<i32, EngineError>>,
    },

    /// Read every control value
    Snapshot {
        response: oneshot::Sender<ControlSnapshot>,
    },

    /// Hand the current snapshot to one surface for repainting
    Resync {
        target: SurfaceId,
        scope: ResyncScope,
    },

    /// Add a surface to the fan-out set (replaces one with the same id)
    Register { surface: Arc<dyn Surface> },

    /// Force the durable store to disk
    Flush {
        response: oneshot::Sender<Result<(), EngineError>>,
    },

    /// Flush and stop the actor
    Shutdown {
        response: Option<oneshot::Sender<()>>,
    },
}

impl std::fmt::Debug for EngineCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineCommand::Apply {
                origin,
                control,
                change,
                ..
            } => f
                .debug_struct("Apply")
                .field("origin", origin)
                .field("control", control)
                .field("change", change)
                .finish(),
            EngineCommand::Get { control, .. } => {
                f.debug_struct("Get").field("control", control).finish()
            }
            EngineCommand::Snapshot { .. } => f.write_str("Snapshot"),
            EngineCommand::Resync { target, scope } => f
                .debug_struct("Resync")
                .field("target", target)
                .field("scope", scope)
                .finish(),
            EngineCommand::Register { surface } => f
                .debug_struct("Register")
                .field("surface", &surface.id())
                .finish(),
            EngineCommand::Flush { .. } => f.write_str("Flush"),
            EngineCommand::Shutdown { .. } => f.write_str("Shutdown"),
        }
    }
}
