use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

use crate::models::{
    CodeChangeMsg, CodeUpdateMsg, InputChangeMsg, InputUpdateMsg, LanguageChangeMsg,
    LanguageUpdateMsg, ServerMessage,
};
use crate::session::presence;
use crate::session::registry::normalize_room_code;
use crate::websocket::reply_room_not_found;
use crate::AppState;

/// Replace the shared buffer wholesale. Arrival order at the room lock
/// decides between concurrent edits; the earlier buffer is discarded in
/// full.
pub async fn handle_code_change(state: &Arc<AppState>, connection_id: &str, msg: CodeChangeMsg) {
    let room_id = normalize_room_code(&msg.room_id);
    let rooms = state.registry.rooms().read().await;
    let Some(room_arc) = rooms.get(&room_id).cloned() else {
        drop(rooms);
        reply_room_not_found(state, connection_id, &room_id).await;
        return;
    };

    let (payload, others) = {
        let mut room = room_arc.lock().await;
        let Some(sender) = room.members.get(connection_id).cloned() else {
            debug!(room = %room_id, conn = %connection_id, "Code change from non-member dropped");
            return;
        };
        room.code = msg.code;
        if let Some(position) = msg.cursor_position {
            presence::update_cursor(&mut room, connection_id, position);
        }
        room.touch();
        let others: Vec<String> = room
            .members
            .keys()
            .filter(|id| id.as_str() != connection_id)
            .cloned()
            .collect();
        (
            CodeUpdateMsg {
                code: room.code.clone(),
                user_id: sender.id,
                username: sender.username,
                cursor_position: msg.cursor_position,
                timestamp: Utc::now().timestamp_millis(),
            },
            others,
        )
    };
    drop(rooms);

    state
        .gateway
        .send_to_many(&others, &ServerMessage::CodeUpdate(payload))
        .await;
}

/// Switch the room's language and reset the buffer to the language's
/// template. Everyone including the sender receives the authoritative
/// post-reset state.
pub async fn handle_language_change(
    state: &Arc<AppState>,
    connection_id: &str,
    msg: LanguageChangeMsg,
) {
    let room_id = normalize_room_code(&msg.room_id);
    let rooms = state.registry.rooms().read().await;
    let Some(room_arc) = rooms.get(&room_id).cloned() else {
        drop(rooms);
        reply_room_not_found(state, connection_id, &room_id).await;
        return;
    };

    let (payload, everyone) = {
        let mut room = room_arc.lock().await;
        if !room.members.contains_key(connection_id) {
            debug!(room = %room_id, conn = %connection_id, "Language change from non-member dropped");
            return;
        }
        room.language = msg.language;
        room.code = msg.language.template().to_string();
        room.touch();
        let everyone: Vec<String> = room.members.keys().cloned().collect();
        (
            LanguageUpdateMsg {
                language: room.language,
                code: room.code.clone(),
            },
            everyone,
        )
    };
    drop(rooms);

    state
        .gateway
        .send_to_many(&everyone, &ServerMessage::LanguageUpdate(payload))
        .await;
}

/// Replace the shared stdin buffer wholesale
pub async fn handle_input_change(state: &Arc<AppState>, connection_id: &str, msg: InputChangeMsg) {
    let room_id = normalize_room_code(&msg.room_id);
    let rooms = state.registry.rooms().read().await;
    let Some(room_arc) = rooms.get(&room_id).cloned() else {
        drop(rooms);
        reply_room_not_found(state, connection_id, &room_id).await;
        return;
    };

    let (payload, others) = {
        let mut room = room_arc.lock().await;
        if !room.members.contains_key(connection_id) {
            debug!(room = %room_id, conn = %connection_id, "Input change from non-member dropped");
            return;
        }
        room.input = msg.input;
        room.touch();
        let others: Vec<String> = room
            .members
            .keys()
            .filter(|id| id.as_str() != connection_id)
            .cloned()
            .collect();
        (
            InputUpdateMsg {
                input: room.input.clone(),
            },
            others,
        )
    };
    drop(rooms);

    state
        .gateway
        .send_to_many(&others, &ServerMessage::InputUpdate(payload))
        .await;
}
