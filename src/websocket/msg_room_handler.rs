use std::sync::Arc;
use tracing::{debug, info};

use crate::models::{
    CreateRoomMsg, JoinRoomMsg, LeaveRoomMsg, RoomStateMsg, ServerMessage, UserJoinedMsg,
    UserLeftMsg,
};
use crate::session::presence;
use crate::session::registry::normalize_room_code;
use crate::websocket::reply_room_not_found;
use crate::AppState;

/// Create a room and seat the sender as its first member.
/// The result goes only to the initiating connection.
pub async fn handle_create_room(state: &Arc<AppState>, connection_id: &str, msg: CreateRoomMsg) {
    leave_current_room(state, connection_id).await;

    let language = msg.language.unwrap_or_default();
    let (room_id, room_arc) = state.registry.create_room(language).await;

    let payload = {
        let mut room = room_arc.lock().await;
        let user = presence::add_member(&mut room, connection_id, &msg.username);
        let members = presence::snapshot(&room);
        RoomStateMsg {
            room_id: room.id.clone(),
            code: room.code.clone(),
            language: room.language,
            input: room.input.clone(),
            user,
            members,
        }
    };

    state
        .gateway
        .set_room(connection_id, Some(room_id.clone()))
        .await;
    state
        .gateway
        .send_to(connection_id, ServerMessage::RoomCreated(payload))
        .await;
    info!(room = %room_id, conn = %connection_id, "Member created room");
}

/// Join an existing room. The joiner gets the full room snapshot;
/// everyone else gets a user-joined notice with the updated member
/// list.
pub async fn handle_join_room(state: &Arc<AppState>, connection_id: &str, msg: JoinRoomMsg) {
    leave_current_room(state, connection_id).await;

    let room_id = normalize_room_code(&msg.room_id);
    // Hold the map read lock across the mutation so the room cannot be
    // deleted out from under the join.
    let rooms = state.registry.rooms().read().await;
    let Some(room_arc) = rooms.get(&room_id).cloned() else {
        drop(rooms);
        reply_room_not_found(state, connection_id, &room_id).await;
        return;
    };

    let (snapshot_payload, joined_payload, others) = {
        let mut room = room_arc.lock().await;
        let user = presence::add_member(&mut room, connection_id, &msg.username);
        room.touch();
        let members = presence::snapshot(&room);
        let others: Vec<String> = room
            .members
            .keys()
            .filter(|id| id.as_str() != connection_id)
            .cloned()
            .collect();
        (
            RoomStateMsg {
                room_id: room.id.clone(),
                code: room.code.clone(),
                language: room.language,
                input: room.input.clone(),
                user: user.clone(),
                members: members.clone(),
            },
            UserJoinedMsg { user, members },
            others,
        )
    };
    drop(rooms);

    state
        .gateway
        .set_room(connection_id, Some(room_id.clone()))
        .await;
    state
        .gateway
        .send_to(connection_id, ServerMessage::RoomJoined(snapshot_payload))
        .await;
    state
        .gateway
        .send_to_many(&others, &ServerMessage::UserJoined(joined_payload))
        .await;
    info!(room = %room_id, conn = %connection_id, "Member joined room");
}

/// Explicit departure from a room the sender believes it is in
pub async fn handle_leave_room(state: &Arc<AppState>, connection_id: &str, msg: LeaveRoomMsg) {
    let room_id = normalize_room_code(&msg.room_id);
    if state.gateway.current_room(connection_id).await.as_deref() == Some(room_id.as_str()) {
        state.gateway.set_room(connection_id, None).await;
    }
    match depart_room(state, connection_id, &room_id).await {
        DepartOutcome::RoomMissing => {
            reply_room_not_found(state, connection_id, &room_id).await;
        }
        DepartOutcome::NotMember | DepartOutcome::Departed => {}
    }
}

/// Implicit leave on socket teardown. Delivered once per connection;
/// a repeat delivery finds the gateway entry gone and does nothing.
pub async fn handle_disconnect(state: &Arc<AppState>, connection_id: &str) {
    let Some(room_id) = state.gateway.unregister(connection_id).await else {
        debug!(conn = %connection_id, "Disconnect for connection without a room");
        return;
    };
    depart_room(state, connection_id, &room_id).await;
    info!(room = %room_id, conn = %connection_id, "Member disconnected");
}

pub enum DepartOutcome {
    RoomMissing,
    NotMember,
    Departed,
}

/// Shared removal path for leave-room, disconnect and room switches:
/// take the member out, delete the room when it empties, otherwise
/// notify the survivors.
pub async fn depart_room(
    state: &Arc<AppState>,
    connection_id: &str,
    room_id: &str,
) -> DepartOutcome {
    // Deletion needs the map write lock, so take it up front; the
    // registry-then-room order matches every other handler.
    let mut rooms = state.registry.rooms().write().await;
    let Some(room_arc) = rooms.get(room_id).cloned() else {
        debug!(room = %room_id, conn = %connection_id, "Departure from unknown room");
        return DepartOutcome::RoomMissing;
    };

    let (departed, survivors, members, now_empty) = {
        let mut room = room_arc.lock().await;
        let Some(departed) = presence::remove_member(&mut room, connection_id) else {
            debug!(room = %room_id, conn = %connection_id, "Departure from non-member dropped");
            return DepartOutcome::NotMember;
        };
        room.touch();
        let survivors: Vec<String> = room.members.keys().cloned().collect();
        let members = presence::snapshot(&room);
        let now_empty = survivors.is_empty();
        (departed, survivors, members, now_empty)
    };

    if now_empty {
        // A room with zero members is deleted immediately, not left
        // for the idle reaper.
        rooms.remove(room_id);
        info!(room = %room_id, "Room emptied and deleted");
    }
    drop(rooms);

    if !now_empty {
        state
            .gateway
            .send_to_many(
                &survivors,
                &ServerMessage::UserLeft(UserLeftMsg {
                    user_id: departed.id.clone(),
                    username: departed.username.clone(),
                    members,
                }),
            )
            .await;
    }
    DepartOutcome::Departed
}

/// A connection is a member of at most one room; creating or joining
/// while seated elsewhere departs the old room first.
async fn leave_current_room(state: &Arc<AppState>, connection_id: &str) {
    if let Some(previous) = state.gateway.current_room(connection_id).await {
        state.gateway.set_room(connection_id, None).await;
        depart_room(state, connection_id, &previous).await;
    }
}
