pub mod gateway;
pub mod handler;
pub mod msg_chat_handler;
pub mod msg_edit_handler;
pub mod msg_ping_handler;
pub mod msg_presence_handler;
pub mod msg_room_handler;
pub mod msg_run_handler;

use std::sync::Arc;
use tracing::debug;

use crate::models::{ProtocolErrorMsg, ServerMessage};
use crate::AppState;

/// Error-channel reply for events that reference a room id absent from
/// the registry. Goes only to the sender; nothing is mutated.
pub(crate) async fn reply_room_not_found(state: &Arc<AppState>, connection_id: &str, room_id: &str) {
    debug!(room = %room_id, conn = %connection_id, "Event for unknown room");
    state
        .gateway
        .send_to(
            connection_id,
            ServerMessage::Error(ProtocolErrorMsg::room_not_found(room_id)),
        )
        .await;
}
