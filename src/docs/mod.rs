use utoipa::OpenApi;

use crate::models::*;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Readiness check endpoint
#[utoipa::path(
    get,
    path = "/api/ready",
    responses(
        (status = 200, description = "Service is ready", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn ready_check_doc() {}

/// List active rooms
#[utoipa::path(
    get,
    path = "/api/v1/rooms",
    responses(
        (status = 200, description = "Active rooms", body = RoomListResponse)
    )
)]
#[allow(dead_code)]
pub async fn list_rooms_doc() {}

/// Look up one room
#[utoipa::path(
    get,
    path = "/api/v1/rooms/{room_id}",
    params(
        ("room_id" = String, Path, description = "Room join code")
    ),
    responses(
        (status = 200, description = "Room detail", body = RoomDetailResponse),
        (status = 404, description = "Room not found", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn room_detail_doc() {}

/// Process diagnostics
#[utoipa::path(
    get,
    path = "/api/v1/diagnostics",
    responses(
        (status = 200, description = "Connection, room and process statistics", body = DiagnosticsResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        ready_check_doc,
        list_rooms_doc,
        room_detail_doc,
        diagnostics_doc,
    ),
    components(
        schemas(
            HealthResponse,
            RoomListResponse,
            RoomSummary,
            RoomDetailResponse,
            MemberSummary,
            DiagnosticsResponse,
            ErrorResponse,
            Language,
        )
    ),
    tags(
        (name = "api", description = "Monitoring endpoints")
    )
)]
pub struct ApiDoc;
