//! Peer session state machine
//!
//! ```text
//! Disconnected ──connect──▶ Connected
//!      ▲                       │
//!      └──────disconnect───────┘
//! ```
//!
//! At most one peer is connected at a time. A second connect while
//! `Connected` is refused; the first peer keeps the session.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Outbound side of a connected peer
pub trait PeerTransport: Send + Sync {
    /// Deliver a status notification; must not block
    fn notify(&self, payload: &str);
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("a peer is already connected")]
    AlreadyConnected,
}

/// Zero-or-one connected peer
#[derive(Default)]
pub enum PeerSession {
    #[default]
    Disconnected,
    Connected(Arc<dyn PeerTransport>),
}

impl PeerSession {
    /// `Disconnected -> Connected`
    pub fn connect(&mut self, transport: Arc<dyn PeerTransport>) -> Result<(), SessionError> {
        match self {
            PeerSession::Connected(_) => Err(SessionError::AlreadyConnected),
            PeerSession::Disconnected => {
                *self = PeerSession::Connected(transport);
                Ok(())
            }
        }
    }

    /// `Connected -> Disconnected`; returns whether a peer was connected
    pub fn disconnect(&mut self) -> bool {
        matches!(std::mem::take(self), PeerSession::Connected(_))
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, PeerSession::Connected(_))
    }

    /// Transport of the connected peer
    pub fn transport(&self) -> Option<&Arc<dyn PeerTransport>> {
        match self {
            PeerSession::Connected(transport) => Some(transport),
            PeerSession::Disconnected => None,
        }
    }
}

impl fmt::Debug for PeerSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeerSession::Disconnected => write!(f, "Disconnected"),
            PeerSession::Connected(_) => write!(f, "Connected"),
        }
    }
}
