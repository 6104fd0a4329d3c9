// src/server/mod.rs
// HTTP surface for web clients
//
// Endpoints:
// - GET  /api/status       - health check
// - POST /api/chat/stream  - run a turn, relay fragments over SSE
// - GET  /api/history      - stored conversation for a user
// - DELETE /api/history    - reset a user's conversation

mod handlers;

use axum::{
    Router,
    routing::{get, post},
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::gateway::Gateway;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub gateway: Arc<dyn Gateway>,
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/status", get(handlers::status_handler))
        .route("/api/chat/stream", post(handlers::chat_stream_handler))
        .route(
            "/api/history",
            get(handlers::history_handler).delete(handlers::reset_handler),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
