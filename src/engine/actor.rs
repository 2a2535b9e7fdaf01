//! SyncEngine - actor owning the control state
//!
//! All mutations, queries and repaint requests arrive on one unbounded
//! channel and are handled to completion one at a time, so a mutation is
//! fully applied, persisted and fanned out before the next one starts.
//!
//! ```text
//! adapters ──EngineHandle──▶ command_rx ──▶ SyncEngine
//!                                            ├─ ControlState (owned)
//!                                            ├─ ControlStore (write-through)
//!                                            └─ surfaces (refresh / publish / resync)
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use super::commands::{Change, EngineCommand};
use super::handle::EngineHandle;
use super::EngineError;
use crate::state::{persistence, AppliedValue, ControlId, ControlState, ControlStore};
use crate::surface::{ResyncScope, Surface, SurfaceId};

/// Actor serializing every access to the control state
pub struct SyncEngine {
    /// Authoritative values
    state: ControlState,

    /// Durable store, written through on every mutation
    store: Box<dyn ControlStore>,

    /// Registered surfaces, in registration order
    surfaces: Vec<Arc<dyn Surface>>,

    /// Controls whose last persist failed, retried on the next mutation
    dirty: BTreeSet<ControlId>,

    command_rx: mpsc::UnboundedReceiver<EngineCommand>,

    /// Total mutations applied
    mutation_count: u64,
}

impl SyncEngine {
    /// Spawn the engine on the current tokio runtime
    ///
    /// `state` is the boot snapshot loaded from `store`; no surface is
    /// registered yet, so nothing is pushed until adapters register.
    pub fn spawn(state: ControlState, store: Box<dyn ControlStore>) -> EngineHandle {
        let (cmd_tx, command_rx) = mpsc::unbounded_channel();

        let engine = SyncEngine {
            state,
            store,
            surfaces: Vec::new(),
            dirty: BTreeSet::new(),
            command_rx,
            mutation_count: 0,
        };

        tokio::spawn(engine.run());
        info!("Sync engine spawned");

        EngineHandle::new(cmd_tx)
    }

    async fn run(mut self) {
        debug!("Sync engine run loop started");

        while let Some(cmd) = self.command_rx.recv().await {
            trace!(?cmd, "Processing command");

            match cmd {
                EngineCommand::Apply {
                    origin,
                    control,
                    change,
                    response,
                } => {
                    let result = self.handle_apply(origin, control, change);
                    let _ = response.send(result);
                }
                EngineCommand::Get { control, response } => {
                    let _ = response.send(self.state.get(control).map_err(EngineError::from));
                }
                EngineCommand::Snapshot { response } => {
                    let _ = response.send(self.state.snapshot());
                }
                EngineCommand::Resync { target, scope } => {
                    self.handle_resync(target, scope);
                }
                EngineCommand::Register { surface } => {
                    self.handle_register(surface);
                }
                EngineCommand::Flush { response } => {
                    let _ = response.send(self.store.flush().map_err(EngineError::from));
                }
                EngineCommand::Shutdown { response } => {
                    if let Err(e) = self.store.flush() {
                        warn!("Failed to flush control store on shutdown: {}", e);
                    }
                    info!(
                        "Sync engine stopped ({} mutations applied)",
                        self.mutation_count
                    );
                    if let Some(tx) = response {
                        let _ = tx.send(());
                    }
                    return;
                }
            }
        }

        debug!("Sync engine command channel closed");
    }

    /// Apply one mutation: normalize, store, persist, fan out
    fn handle_apply(
        &mut self,
        origin: SurfaceId,
        control: ControlId,
        change: Change,
    ) -> Result<AppliedValue, EngineError> {
        let applied = match change {
            Change::Set(raw) => self.state.apply(control, raw),
            Change::Toggle => self.state.toggle(control),
        }
        .map_err(|e| {
            error!("{} submitted a change for an unknown control: {}", origin, e);
            EngineError::from(e)
        })?;

        self.mutation_count += 1;

        debug!(
            %origin,
            %control,
            value = applied.value,
            previous = applied.previous,
            "Change applied"
        );

        self.persist(control);
        self.fan_out(origin, &applied);

        debug!("State: {}", self.state.snapshot());
        Ok(applied)
    }

    /// Write the control through to the store, retrying earlier failures
    fn persist(&mut self, control: ControlId) {
        self.dirty.insert(control);

        let pending: Vec<ControlId> = self.dirty.iter().copied().collect();
        for id in pending {
            let Ok(record) = self.state.control(id) else {
                self.dirty.remove(&id);
                continue;
            };

            match persistence::save(self.store.as_ref(), record) {
                Ok(()) => {
                    self.dirty.remove(&id);
                }
                Err(e) => {
                    warn!(
                        "Failed to persist {} (kept in memory, retried on next change): {}",
                        id, e
                    );
                }
            }
        }
    }

    /// Refresh every surface but the origin, then publish the full state
    fn fan_out(&self, origin: SurfaceId, applied: &AppliedValue) {
        for surface in &self.surfaces {
            if surface.id() == origin {
                surface.applied_locally(applied.control, applied.value);
            } else {
                trace!("Refreshing {} with {}={}", surface.id(), applied.control, applied.value);
                surface.refresh(applied.control, applied.value);
            }
        }

        let snapshot = self.state.snapshot();
        for surface in &self.surfaces {
            surface.publish(&snapshot);
        }
    }

    fn handle_resync(&self, target: SurfaceId, scope: ResyncScope) {
        match self.surfaces.iter().find(|s| s.id() == target) {
            Some(surface) => {
                debug!("Resyncing {} ({:?})", target, scope);
                surface.resync(scope, &self.state.snapshot());
            }
            None => debug!("Resync requested for unregistered surface {}", target),
        }
    }

    fn handle_register(&mut self, surface: Arc<dyn Surface>) {
        let id = surface.id();
        self.surfaces.retain(|s| s.id() != id);

        surface.resync(ResyncScope::All, &self.state.snapshot());
        self.surfaces.push(surface);

        info!("Surface '{}' registered ({} total)", id, self.surfaces.len());
    }
}
