use chrono::Utc;
use std::sync::Arc;

use crate::models::{PingMsg, PongMsg, ServerMessage};
use crate::AppState;

/// Echo the client's timestamp back with the server clock alongside so
/// the client can measure round-trip latency. Room-independent; replies
/// only to the sender.
pub async fn handle_ping(state: &Arc<AppState>, connection_id: &str, msg: PingMsg) {
    let pong = PongMsg {
        timestamp: msg.timestamp,
        server_timestamp: Utc::now().timestamp_millis(),
    };
    state
        .gateway
        .send_to(connection_id, ServerMessage::Pong(pong))
        .await;
}
