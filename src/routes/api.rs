use axum::{routing::get, Router};
use std::sync::Arc;

use crate::handlers::{diagnostics, health_check, list_rooms, ready_check, room_detail};
use crate::AppState;

/// Create API routes
pub fn create_api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .route("/v1/rooms", get(list_rooms))
        .route("/v1/rooms/:room_id", get(room_detail))
        .route("/v1/diagnostics", get(diagnostics))
        .with_state(state)
}
