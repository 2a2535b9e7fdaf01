//! Wireless peer link
//!
//! One peer at a time exchanges per-control characteristic writes and
//! receives a full-state notification after every mutation. On host builds
//! the radio is replaced by a WebSocket session (see [`bridge`]).

mod adapter;
pub mod bridge;
pub mod characteristics;
mod session;

pub use adapter::{PeerLinkAdapter, ReadValue};
pub use characteristics::{Characteristic, SERVICE_UUID, STATUS_UUID};
pub use session::{PeerSession, PeerTransport, SessionError};

/// Advertised device name when none is configured
pub const DEFAULT_DEVICE_NAME: &str = "ESP32-IC905";
