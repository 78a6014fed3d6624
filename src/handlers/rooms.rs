use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::{debug, error};

use crate::models::{ErrorResponse, RoomDetailResponse, RoomListResponse};
use crate::session::registry::normalize_room_code;
use crate::AppState;

/// List the active rooms
pub async fn list_rooms(State(state): State<Arc<AppState>>) -> Json<RoomListResponse> {
    let rooms = state.registry.summaries().await;
    debug!(n_rooms = rooms.len(), "Room listing requested");
    Json(RoomListResponse { rooms })
}

/// Look up one room by its join code
pub async fn room_detail(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<(StatusCode, Json<RoomDetailResponse>), (StatusCode, Json<ErrorResponse>)> {
    let room_id = normalize_room_code(&room_id);
    match state.registry.detail(&room_id).await {
        Some(detail) => Ok((StatusCode::OK, Json(detail))),
        None => {
            error!("Room '{}' not found", room_id);
            let status = StatusCode::NOT_FOUND;
            Err((
                status,
                Json(ErrorResponse {
                    code: status.as_u16(),
                    status: status.to_string(),
                    error: format!("Room '{}' not found", room_id),
                }),
            ))
        }
    }
}
