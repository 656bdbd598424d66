//! HTTP surface: the websocket upgrade endpoint and a health check.
//!
//! Everything else the platform exposes (credentials, profiles, admin)
//! belongs to collaborator services; the engine's only inbound door is
//! the realtime channel.

pub mod websocket;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;

use holdem_core::auth::SessionGate;
use holdem_core::net::HubHandle;
use holdem_core::room::RoomRegistry;

use crate::service::GameService;

#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<SessionGate>,
    pub hub: HubHandle,
    pub rooms: Arc<RoomRegistry>,
    pub service: Arc<GameService>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(websocket::websocket_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
