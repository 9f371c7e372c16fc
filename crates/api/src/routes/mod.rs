//! API routes

pub mod health;
pub mod sessions;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{relay::ws_handler, state::AppState};

/// Create all API routes
pub fn create_router(state: AppState) -> Router {
    // Health check routes (at root level for infrastructure monitoring)
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    // Chat session routes - under /api
    let session_routes = Router::new()
        .route("/sessions", get(sessions::list_sessions))
        .route(
            "/sessions/:session_id/messages",
            get(sessions::get_messages).post(sessions::append_message),
        )
        .route("/sessions/:session_id/read", post(sessions::mark_read))
        .route("/sessions/:session_id", delete(sessions::delete_session));

    // WebSocket relay (no auth layer; room = session id)
    let websocket_routes = Router::new().route("/ws", get(ws_handler));

    // The widget is served from the storefront origin; keep CORS wide open
    Router::new()
        .merge(health_routes)
        .merge(websocket_routes)
        .nest("/api", session_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
