//! Peer-link adapter
//!
//! Maps characteristic writes to engine mutations and forwards the full-state
//! payload to the connected peer after every mutation. Characteristic values
//! are cached so reads never touch the engine.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use super::characteristics::{self, Characteristic};
use super::session::{PeerSession, PeerTransport, SessionError};
use crate::engine::EngineHandle;
use crate::state::{ControlId, ControlKind, ControlSnapshot};
use crate::surface::{ResyncScope, Surface, SurfaceId};

/// Answer to a characteristic read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadValue {
    /// Single byte of a control characteristic
    Byte(u8),
    /// Last full-state payload
    Payload(String),
}

/// Peer-link surface adapter
pub struct PeerLinkAdapter {
    engine: EngineHandle,
    device_name: String,
    session: Mutex<PeerSession>,
    /// Single-byte value of every control characteristic
    values: Mutex<HashMap<ControlId, u8>>,
    /// Last payload built for the status characteristic
    last_payload: Mutex<String>,
}

impl PeerLinkAdapter {
    pub fn new(engine: EngineHandle, device_name: impl Into<String>) -> Self {
        Self {
            engine,
            device_name: device_name.into(),
            session: Mutex::new(PeerSession::Disconnected),
            values: Mutex::new(HashMap::new()),
            last_payload: Mutex::new(ControlSnapshot::default().status().to_json()),
        }
    }

    /// Advertised device name
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn is_connected(&self) -> bool {
        self.session.lock().is_connected()
    }

    /// A peer connected
    ///
    /// The engine resyncs this surface, which sends the peer one full-state
    /// notification covering everything changed while it was away.
    pub fn on_connect(&self, transport: Arc<dyn PeerTransport>) -> Result<(), SessionError> {
        self.session.lock().connect(transport)?;
        info!("Peer connected to '{}'", self.device_name);
        self.engine.resync(SurfaceId::PeerLink, ResyncScope::All);
        Ok(())
    }

    /// The peer went away; control state is left untouched
    pub fn on_disconnect(&self) {
        if self.session.lock().disconnect() {
            info!("Peer disconnected");
        }
    }

    /// A peer wrote `data` to the characteristic `uuid`
    pub async fn on_write(&self, uuid: &str, data: &[u8]) {
        if !self.is_connected() {
            debug!("Ignoring write to {} without a connected peer", uuid);
            return;
        }

        let id = match characteristics::lookup(uuid) {
            Some(Characteristic::Control(id)) => id,
            Some(Characteristic::Status) => {
                warn!("Status characteristic is read-only, write ignored");
                return;
            }
            None => {
                warn!("Write to unknown characteristic {}", uuid);
                return;
            }
        };

        let Some(&byte) = data.first() else {
            warn!("Empty write to {} ignored", id);
            return;
        };

        let value = match id.kind() {
            ControlKind::Boolean => i64::from(byte != 0),
            ControlKind::BoundedInteger { .. } => i64::from(byte),
        };
        debug!("Peer write {} <- {}", id, value);

        if let Err(e) = self
            .engine
            .apply_change(SurfaceId::PeerLink, id, value)
            .await
        {
            error!("Peer write to {} failed: {}", id, e);
        }
    }

    /// Read the characteristic `uuid`
    ///
    /// Returns `None` without a connected peer or for an unknown UUID.
    pub fn read(&self, uuid: &str) -> Option<ReadValue> {
        if !self.is_connected() {
            return None;
        }

        match characteristics::lookup(uuid) {
            Some(Characteristic::Status) => {
                Some(ReadValue::Payload(self.last_payload.lock().clone()))
            }
            Some(Characteristic::Control(id)) => Some(ReadValue::Byte(
                self.values.lock().get(&id).copied().unwrap_or(0),
            )),
            None => {
                warn!("Read of unknown characteristic {}", uuid);
                None
            }
        }
    }

    /// Store the payload and send it if a peer is connected
    fn notify(&self, snapshot: &ControlSnapshot) {
        let payload = snapshot.status().to_json();
        *self.last_payload.lock() = payload.clone();

        if let Some(transport) = self.session.lock().transport() {
            debug!("Peer <- {}", payload);
            transport.notify(&payload);
        }
    }
}

fn characteristic_byte(value: i32) -> u8 {
    value.clamp(0, i32::from(u8::MAX)) as u8
}

impl Surface for PeerLinkAdapter {
    fn id(&self) -> SurfaceId {
        SurfaceId::PeerLink
    }

    fn refresh(&self, control: ControlId, value: i32) {
        self.values.lock().insert(control, characteristic_byte(value));
    }

    fn applied_locally(&self, control: ControlId, value: i32) {
        self.values.lock().insert(control, characteristic_byte(value));
    }

    fn publish(&self, snapshot: &ControlSnapshot) {
        self.notify(snapshot);
    }

    fn resync(&self, _scope: ResyncScope, snapshot: &ControlSnapshot) {
        {
            let mut values = self.values.lock();
            for (id, value) in snapshot.iter() {
                values.insert(id, characteristic_byte(value));
            }
        }
        self.notify(snapshot);
    }
}
