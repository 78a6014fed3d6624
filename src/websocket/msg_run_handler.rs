use std::sync::Arc;
use tracing::{debug, info};

use crate::models::{ExecutionResultMsg, RunCodeMsg, ServerMessage};
use crate::session::registry::normalize_room_code;
use crate::websocket::reply_room_not_found;
use crate::AppState;

/// Run the room's current buffer against its shared stdin through the
/// execution collaborator. The room lock is released before the
/// (bounded, but slow) execution starts; the result is broadcast to
/// whoever is in the room once it finishes. Failures and timeouts are
/// normal result payloads, never protocol errors.
pub async fn handle_run_code(state: &Arc<AppState>, connection_id: &str, msg: RunCodeMsg) {
    let room_id = normalize_room_code(&msg.room_id);

    let (code, language, input) = {
        let rooms = state.registry.rooms().read().await;
        let Some(room_arc) = rooms.get(&room_id).cloned() else {
            drop(rooms);
            reply_room_not_found(state, connection_id, &room_id).await;
            return;
        };
        let room = room_arc.lock().await;
        if !room.members.contains_key(connection_id) {
            debug!(room = %room_id, conn = %connection_id, "Run request from non-member dropped");
            return;
        }
        (room.code.clone(), room.language, room.input.clone())
    };

    info!(room = %room_id, language = %language, conn = %connection_id, "Executing room buffer");
    let outcome = state.executor.execute(&code, language, &input).await;
    let payload = ServerMessage::ExecutionResult(ExecutionResultMsg {
        success: outcome.success,
        stdout: outcome.stdout,
        stderr: outcome.stderr,
        duration_ms: outcome.duration_ms,
    });

    // Membership may have shifted while the code ran; deliver to the
    // room as it is now, or fall back to the requester when the room
    // is gone.
    let recipients = {
        let rooms = state.registry.rooms().read().await;
        match rooms.get(&room_id) {
            Some(room_arc) => room_arc.lock().await.members.keys().cloned().collect(),
            None => vec![connection_id.to_string()],
        }
    };
    state.gateway.send_to_many(&recipients, &payload).await;
}
