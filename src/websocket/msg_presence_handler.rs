use std::sync::Arc;
use tracing::debug;

use crate::models::{
    CursorMoveMsg, CursorUpdateMsg, SelectionChangeMsg, SelectionUpdateMsg, ServerMessage,
    TypingMsg, UserTypingMsg,
};
use crate::session::presence;
use crate::session::registry::normalize_room_code;
use crate::websocket::reply_room_not_found;
use crate::AppState;

/// Move the sender's cursor and fan the new position out to the rest
/// of the room
pub async fn handle_cursor_move(state: &Arc<AppState>, connection_id: &str, msg: CursorMoveMsg) {
    let room_id = normalize_room_code(&msg.room_id);
    let rooms = state.registry.rooms().read().await;
    let Some(room_arc) = rooms.get(&room_id).cloned() else {
        drop(rooms);
        reply_room_not_found(state, connection_id, &room_id).await;
        return;
    };

    let (payload, others) = {
        let mut room = room_arc.lock().await;
        if !presence::update_cursor(&mut room, connection_id, msg.position) {
            return;
        }
        room.touch();
        let sender = &room.members[connection_id];
        let payload = CursorUpdateMsg {
            user_id: sender.id.clone(),
            username: sender.username.clone(),
            color: sender.color.clone(),
            position: msg.position,
        };
        let others: Vec<String> = room
            .members
            .keys()
            .filter(|id| id.as_str() != connection_id)
            .cloned()
            .collect();
        (payload, others)
    };
    drop(rooms);

    state
        .gateway
        .send_to_many(&others, &ServerMessage::CursorUpdate(payload))
        .await;
}

/// Replace the sender's selection range and fan it out
pub async fn handle_selection_change(
    state: &Arc<AppState>,
    connection_id: &str,
    msg: SelectionChangeMsg,
) {
    let room_id = normalize_room_code(&msg.room_id);
    let rooms = state.registry.rooms().read().await;
    let Some(room_arc) = rooms.get(&room_id).cloned() else {
        drop(rooms);
        reply_room_not_found(state, connection_id, &room_id).await;
        return;
    };

    let (payload, others) = {
        let mut room = room_arc.lock().await;
        if !presence::update_selection(&mut room, connection_id, msg.selection.clone()) {
            return;
        }
        room.touch();
        let sender = &room.members[connection_id];
        let payload = SelectionUpdateMsg {
            user_id: sender.id.clone(),
            username: sender.username.clone(),
            color: sender.color.clone(),
            selection: msg.selection,
        };
        let others: Vec<String> = room
            .members
            .keys()
            .filter(|id| id.as_str() != connection_id)
            .cloned()
            .collect();
        (payload, others)
    };
    drop(rooms);

    state
        .gateway
        .send_to_many(&others, &ServerMessage::SelectionUpdate(payload))
        .await;
}

/// Relay the typing indicator. Touches nothing on the room.
pub async fn handle_typing(state: &Arc<AppState>, connection_id: &str, msg: TypingMsg) {
    let room_id = normalize_room_code(&msg.room_id);
    let rooms = state.registry.rooms().read().await;
    let Some(room_arc) = rooms.get(&room_id).cloned() else {
        drop(rooms);
        reply_room_not_found(state, connection_id, &room_id).await;
        return;
    };

    let (payload, others) = {
        let room = room_arc.lock().await;
        let Some(sender) = room.members.get(connection_id) else {
            debug!(room = %room_id, conn = %connection_id, "Typing notice from non-member dropped");
            return;
        };
        let payload = UserTypingMsg {
            user_id: sender.id.clone(),
            username: sender.username.clone(),
            is_typing: msg.is_typing,
        };
        let others: Vec<String> = room
            .members
            .keys()
            .filter(|id| id.as_str() != connection_id)
            .cloned()
            .collect();
        (payload, others)
    };
    drop(rooms);

    state
        .gateway
        .send_to_many(&others, &ServerMessage::UserTyping(payload))
        .await;
}
