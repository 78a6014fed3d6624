use chrono::Utc;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::models::{ChatMessage, ChatSendMsg, ServerMessage};
use crate::session::registry::normalize_room_code;
use crate::websocket::reply_room_not_found;
use crate::AppState;

/// Relay a chat line to the whole room, sender included, with the
/// sender's identity snapshotted at send time. The message itself is
/// not stored; chat also does not count as room activity for the idle
/// reaper.
pub async fn handle_chat_message(state: &Arc<AppState>, connection_id: &str, msg: ChatSendMsg) {
    let room_id = normalize_room_code(&msg.room_id);
    let rooms = state.registry.rooms().read().await;
    let Some(room_arc) = rooms.get(&room_id).cloned() else {
        drop(rooms);
        reply_room_not_found(state, connection_id, &room_id).await;
        return;
    };

    let (payload, everyone) = {
        let room = room_arc.lock().await;
        let Some(sender) = room.members.get(connection_id) else {
            debug!(room = %room_id, conn = %connection_id, "Chat from non-member dropped");
            return;
        };
        let payload = ChatMessage {
            id: Uuid::new_v4().to_string(),
            user_id: sender.id.clone(),
            username: sender.username.clone(),
            color: sender.color.clone(),
            message: msg.message,
            timestamp: Utc::now().timestamp_millis(),
        };
        let everyone: Vec<String> = room.members.keys().cloned().collect();
        (payload, everyone)
    };
    drop(rooms);

    state
        .gateway
        .send_to_many(&everyone, &ServerMessage::Chat(payload))
        .await;
}
