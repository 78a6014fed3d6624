use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response for an error on the HTTP surface
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: u16,
    pub status: String,
    pub error: String,
}

/// Machine-readable failure codes on the websocket error channel
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProtocolErrorCode {
    RoomNotFound,
    MalformedEvent,
}

/// Typed failure reply, sent only to the offending connection
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolErrorMsg {
    pub code: ProtocolErrorCode,
    pub message: String,
}

impl ProtocolErrorMsg {
    pub fn room_not_found(room_id: &str) -> Self {
        Self {
            code: ProtocolErrorCode::RoomNotFound,
            message: format!("Room '{}' not found", room_id),
        }
    }

    pub fn malformed_event(detail: &str) -> Self {
        Self {
            code: ProtocolErrorCode::MalformedEvent,
            message: format!("Malformed event: {}", detail),
        }
    }
}
