//! Durable control storage
//!
//! Each control is stored under its own persistence key so a single write
//! touches a single entry. Boolean controls occupy one byte, integer controls
//! a little-endian `i32`.
//!
//! Two backends:
//! - [`SledStore`]: sled tree (namespace) inside an embedded database
//! - [`MemoryStore`]: in-process map with injectable write failures

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use super::store::ControlState;
use super::types::{Control, ControlId, ControlKind};

/// Default sled tree name, the same namespace deployed panels already use
pub const DEFAULT_NAMESPACE: &str = "ui";

/// Errors raised by a durable store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(#[from] sled::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Key/value storage surviving power loss
///
/// Implementations must be bounded: every call returns in a short, finite
/// time because the engine calls them inside its critical section.
pub trait ControlStore: Send {
    /// Read the raw bytes stored under `key`
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Durably write `bytes` under `key`
    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;

    /// Force buffered writes to the medium
    fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// sled-backed store
pub struct SledStore {
    /// Keeps the database open for the lifetime of the tree
    _db: sled::Db,
    tree: sled::Tree,
    write_count: AtomicU64,
}

impl SledStore {
    /// Open (or create) the database at `path` and select `namespace`
    pub fn open(path: impl AsRef<Path>, namespace: &str) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let db = sled::open(path)?;
        let tree = db.open_tree(namespace)?;

        info!(
            "Control store opened at {} (namespace: {})",
            path.display(),
            namespace
        );

        Ok(Self {
            _db: db,
            tree,
            write_count: AtomicU64::new(0),
        })
    }

    /// Number of successful writes since open
    pub fn write_count(&self) -> u64 {
        self.write_count.load(Ordering::Relaxed)
    }
}

impl ControlStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.tree.get(key)?.map(|v| v.to_vec()))
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.tree.insert(key, bytes)?;
        self.tree.flush()?;
        let n = self.write_count.fetch_add(1, Ordering::Relaxed) + 1;
        trace!("Stored {} (write #{})", key, n);
        Ok(())
    }

    fn flush(&self) -> Result<(), StoreError> {
        self.tree.flush()?;
        Ok(())
    }
}

/// In-memory store with injectable write failures
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `put` fail until cleared
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Raw bytes under `key`, bypassing the trait
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.lock().get(key).cloned()
    }
}

impl ControlStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("write to {} rejected", key)));
        }
        self.entries.lock().insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

impl<T: ControlStore + Sync> ControlStore for std::sync::Arc<T> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).get(key)
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        (**self).put(key, bytes)
    }

    fn flush(&self) -> Result<(), StoreError> {
        (**self).flush()
    }
}

/// Encode a normalized value for its kind
pub fn encode_value(kind: ControlKind, value: i32) -> Vec<u8> {
    match kind {
        ControlKind::Boolean => vec![u8::from(value != 0)],
        ControlKind::BoundedInteger { .. } => value.to_le_bytes().to_vec(),
    }
}

/// Decode stored bytes for a kind; `None` when the length does not match
pub fn decode_value(kind: ControlKind, bytes: &[u8]) -> Option<i32> {
    match kind {
        ControlKind::Boolean => match bytes {
            [b] => Some(i32::from(*b != 0)),
            _ => None,
        },
        ControlKind::BoundedInteger { .. } => {
            let raw: [u8; 4] = bytes.try_into().ok()?;
            Some(kind.normalize(i64::from(i32::from_le_bytes(raw))))
        }
    }
}

/// Seed a control state from the store
///
/// Missing, unreadable or malformed entries fall back to the kind default.
/// Called once at startup, before any adapter runs.
pub fn load_all(store: &dyn ControlStore) -> ControlState {
    let controls = ControlId::all().map(|id| {
        let mut control: Control = id.control();
        match store.get(&control.persistence_key) {
            Ok(Some(bytes)) => match decode_value(control.kind, &bytes) {
                Some(value) => control.value = value,
                None => warn!(
                    "Ignoring malformed stored value for {} ({} bytes)",
                    control.persistence_key,
                    bytes.len()
                ),
            },
            Ok(None) => trace!("No stored value for {}", control.persistence_key),
            Err(e) => warn!("Failed to read {}: {}", control.persistence_key, e),
        }
        control
    });

    let state = ControlState::from_controls(controls);
    debug!("Loaded control state: {}", state.snapshot());
    state
}

/// Persist one control value under its key
pub fn save(store: &dyn ControlStore, control: &Control) -> Result<(), StoreError> {
    store.put(
        &control.persistence_key,
        &encode_value(control.kind, control.value),
    )
}
