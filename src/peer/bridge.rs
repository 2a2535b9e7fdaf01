//! WebSocket bridge standing in for the radio stack on host builds
//!
//! One session at a time on `/peer`. Inbound text frames:
//!
//! ```json
//! {"op":"write","uuid":"12345678-1234-5678-1234-56789abcdea1","value":1}
//! {"op":"read","uuid":"12345678-1234-5678-1234-56789abcdef1"}
//! ```
//!
//! Outbound text frames are either a raw status payload (notification) or a
//! read reply `{"uuid":"…","value":N}` / `{"uuid":"…","payload":"…"}`.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::adapter::{PeerLinkAdapter, ReadValue};
use super::session::PeerTransport;

/// Inbound request from the peer
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum PeerRequest {
    Write { uuid: String, value: u8 },
    Read { uuid: String },
}

/// Reply to a read request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadReply {
    pub uuid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl ReadReply {
    fn new(uuid: String, value: ReadValue) -> Self {
        match value {
            ReadValue::Byte(b) => Self {
                uuid,
                value: Some(b),
                payload: None,
            },
            ReadValue::Payload(p) => Self {
                uuid,
                value: None,
                payload: Some(p),
            },
        }
    }
}

/// Notifications queued for the socket writer
struct SocketTransport {
    tx: mpsc::UnboundedSender<String>,
}

impl PeerTransport for SocketTransport {
    fn notify(&self, payload: &str) {
        let _ = self.tx.send(payload.to_string());
    }
}

/// Router serving `/peer`
pub fn router(adapter: Arc<PeerLinkAdapter>) -> Router {
    Router::new()
        .route("/peer", get(peer_ws))
        .with_state(adapter)
}

/// GET /peer - upgrade to the peer session
///
/// The session check runs before the upgrade is validated so a busy link
/// answers 409 whatever the request looks like.
async fn peer_ws(
    State(adapter): State<Arc<PeerLinkAdapter>>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    if adapter.is_connected() {
        warn!("Refusing second peer session");
        return (StatusCode::CONFLICT, "a peer is already connected").into_response();
    }
    match ws {
        Ok(ws) => ws.on_upgrade(move |socket| handle_session(socket, adapter)),
        Err(rejection) => rejection.into_response(),
    }
}

async fn handle_session(mut socket: WebSocket, adapter: Arc<PeerLinkAdapter>) {
    let (tx, mut rx) = mpsc::unbounded_channel();

    if let Err(e) = adapter.on_connect(Arc::new(SocketTransport { tx: tx.clone() })) {
        warn!("Peer session rejected: {}", e);
        let _ = socket.send(Message::Close(None)).await;
        return;
    }

    loop {
        tokio::select! {
            Some(outbound) = rx.recv() => {
                if socket.send(Message::Text(outbound)).await.is_err() {
                    debug!("Peer socket send failed");
                    break;
                }
            }
            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Text(text))) => {
                        handle_request(&adapter, &tx, &text).await;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("Peer closed the session");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("Peer socket error: {}", e);
                        break;
                    }
                }
            }
        }
    }

    adapter.on_disconnect();
    info!("Peer session ended");
}

async fn handle_request(
    adapter: &PeerLinkAdapter,
    tx: &mpsc::UnboundedSender<String>,
    text: &str,
) {
    let request = match serde_json::from_str::<PeerRequest>(text) {
        Ok(request) => request,
        Err(e) => {
            warn!("Malformed peer request: {}", e);
            return;
        }
    };

    match request {
        PeerRequest::Write { uuid, value } => adapter.on_write(&uuid, &[value]).await,
        PeerRequest::Read { uuid } => {
            if let Some(value) = adapter.read(&uuid) {
                match serde_json::to_string(&ReadReply::new(uuid, value)) {
                    Ok(reply) => {
                        let _ = tx.send(reply);
                    }
                    Err(e) => warn!("Failed to encode read reply: {}", e),
                }
            }
        }
    }
}
