//! EngineHandle - public API of the sync engine
//!
//! Cheap to clone and safe to use from any task or thread. Mutations and
//! queries await the engine's answer; repaint and registration requests are
//! fire-and-forget.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use super::commands::{Change, EngineCommand};
use super::EngineError;
use crate::state::{AppliedValue, ControlId, ControlSnapshot};
use crate::surface::{ResyncScope, Surface, SurfaceId};

/// Handle for interacting with the sync engine
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::UnboundedSender<EngineCommand>,
}

impl EngineHandle {
    pub fn new(cmd_tx: mpsc::UnboundedSender<EngineCommand>) -> Self {
        Self { cmd_tx }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Apply a value coming from `origin`
    ///
    /// The value is normalized for the control's kind (booleans to 0/1,
    /// integers clamped). Every surface other than `origin` is refreshed.
    pub async fn apply_change(
        &self,
        origin: SurfaceId,
        control: ControlId,
        value: i64,
    ) -> Result<AppliedValue, EngineError> {
        self.mutate(origin, control, Change::Set(value)).await
    }

    /// Flip a control coming from `origin`
    ///
    /// The read and the write happen inside the engine, so a concurrent
    /// change from another surface cannot slip in between.
    pub async fn toggle(
        &self,
        origin: SurfaceId,
        control: ControlId,
    ) -> Result<AppliedValue, EngineError> {
        self.mutate(origin, control, Change::Toggle).await
    }

    async fn mutate(
        &self,
        origin: SurfaceId,
        control: ControlId,
        change: Change,
    ) -> Result<AppliedValue, EngineError> {
        let (response, rx) = oneshot::channel();
        self.cmd_tx
            .send(EngineCommand::Apply {
                origin,
                control,
                change,
                response,
            })
            .map_err(|_| EngineError::Stopped)?;

        rx.await.map_err(|_| EngineError::Stopped)?
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Current value of a control
    pub async fn get(&self, control: ControlId) -> Result<i32, EngineError> {
        let (response, rx) = oneshot::channel();
        self.cmd_tx
            .send(EngineCommand::Get { control, response })
            .map_err(|_| EngineError::Stopped)?;

        rx.await.map_err(|_| EngineError::Stopped)?
    }

    /// Every control value at this point in the command order
    pub async fn snapshot(&self) -> Result<ControlSnapshot, EngineError> {
        let (response, rx) = oneshot::channel();
        self.cmd_tx
            .send(EngineCommand::Snapshot { response })
            .map_err(|_| EngineError::Stopped)?;

        rx.await.map_err(|_| EngineError::Stopped)
    }

    // =========================================================================
    // Surfaces
    // =========================================================================

    /// Register a surface; it is resynced with the full state immediately
    pub fn register_surface(&self, surface: Arc<dyn Surface>) {
        let _ = self.cmd_tx.send(EngineCommand::Register { surface });
    }

    /// Ask the engine to repaint one surface from the current state
    pub fn resync(&self, target: SurfaceId, scope: ResyncScope) {
        let _ = self.cmd_tx.send(EngineCommand::Resync { target, scope });
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Force the durable store to disk
    pub async fn flush(&self) -> Result<(), EngineError> {
        let (response, rx) = oneshot::channel();
        self.cmd_tx
            .send(EngineCommand::Flush { response })
            .map_err(|_| EngineError::Stopped)?;

        rx.await.map_err(|_| EngineError::Stopped)?
    }

    /// Flush and stop the engine, waiting until it has exited
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(EngineCommand::Shutdown { response: Some(tx) })
            .is_ok()
        {
            let _ = rx.await;
        }
    }

    /// Whether the engine is still accepting commands
    pub fn is_alive(&self) -> bool {
        !self.cmd_tx.is_closed()
    }
}
