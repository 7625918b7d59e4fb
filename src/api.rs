//! HTTP surface: the WebSocket endpoint and read-only session views.

use std::time::Duration;

use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
    routing::get,
    Json, Router,
};
use serde_json::json;
use tokio::sync::watch;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::session::SessionView;
use crate::summary::DashboardSummary;
use crate::transport::ws::WsHub;

#[derive(Clone)]
pub struct AppState {
    pub hub: WsHub,
    pub views: watch::Receiver<SessionView>,
}

pub fn router(state: AppState, timeout: Duration) -> Router {
    Router::new()
        .route("/ws", get(ws_upgrade))
        .route("/api/state", get(session_state))
        .route("/api/summary", get(summary))
        .route("/health", get(health))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
}

// ---------- HANDLERS ---------- //

async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| state.hub.serve_peer(socket))
}

async fn session_state(State(state): State<AppState>) -> Json<SessionView> {
    Json(state.views.borrow().clone())
}

async fn summary(State(state): State<AppState>) -> Json<DashboardSummary> {
    let view = state.views.borrow().clone();
    Json(DashboardSummary::new(&view, &state.hub.status()))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "ok": true }))
}
