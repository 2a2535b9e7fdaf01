//! HTTP server
//!
//! One listener hosts every HTTP-facing part of the panel:
//!
//! - `GET /`, `GET /:pin/on|off` - GPIO status page ([`crate::gpio`])
//! - `GET /peer` - peer-link WebSocket bridge ([`crate::peer::bridge`])
//! - `GET /api/state` - full-state payload, as sent to the peer
//! - `GET /api/controls` - control values by name, plus peer status
//! - `GET /api/health` - liveness

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::engine::EngineHandle;
use crate::gpio::{self, GpioBank};
use crate::peer::{bridge, PeerLinkAdapter};
use crate::state::{ControlSnapshot, StatusPayload};

/// Shared state for API handlers
pub struct ApiState {
    pub engine: EngineHandle,
    pub peer: Option<Arc<PeerLinkAdapter>>,
}

/// Response for GET /api/controls
#[derive(Debug, Serialize)]
pub struct ControlsResponse {
    /// Control name -> value
    pub controls: BTreeMap<String, i32>,
    pub peer_connected: bool,
}

/// API error response
#[derive(Debug, Serialize)]
struct ApiError {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (StatusCode::SERVICE_UNAVAILABLE, Json(self)).into_response()
    }
}

/// Build the router for every enabled HTTP surface
pub fn build_router(state: Arc<ApiState>, gpio: Option<Arc<GpioBank>>) -> Router {
    let peer = state.peer.clone();

    let mut router = Router::new()
        .route("/api/state", get(get_state))
        .route("/api/controls", get(list_controls))
        .route("/api/health", get(health_check))
        .with_state(state);

    if let Some(adapter) = peer {
        router = router.merge(bridge::router(adapter));
    }
    if let Some(bank) = gpio {
        router = router.merge(gpio::router(bank));
    }

    router.layer(CorsLayer::permissive())
}

async fn snapshot(state: &ApiState) -> Result<ControlSnapshot, ApiError> {
    state.engine.snapshot().await.map_err(|e| {
        error!("State query failed: {}", e);
        ApiError {
            error: e.to_string(),
        }
    })
}

/// GET /api/state - full-state payload
async fn get_state(State(state): State<Arc<ApiState>>) -> Result<Json<StatusPayload>, ApiError> {
    Ok(Json(snapshot(&state).await?.status()))
}

/// GET /api/controls - values by control name
async fn list_controls(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<ControlsResponse>, ApiError> {
    let snapshot = snapshot(&state).await?;

    Ok(Json(ControlsResponse {
        controls: snapshot.iter().map(|(id, v)| (id.to_string(), v)).collect(),
        peer_connected: state.peer.as_ref().is_some_and(|p| p.is_connected()),
    }))
}

/// GET /api/health - Health check endpoint
async fn health_check() -> &'static str {
    "ok"
}

/// Serve `router` until the process exits
pub async fn start_server(router: Router, port: u16) -> Result<()> {
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting HTTP server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind HTTP server on {}", addr))?;

    axum::serve(listener, router)
        .await
        .context("HTTP server error")?;

    Ok(())
}
