use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::{ClientMessage, ProtocolErrorMsg, ServerMessage};
use crate::websocket::{
    msg_chat_handler, msg_edit_handler, msg_ping_handler, msg_presence_handler, msg_room_handler,
    msg_run_handler,
};
use crate::AppState;

/// WebSocket handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    info!("New WebSocket connection attempt");
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

/// Handle one WebSocket connection for its whole lifetime
async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    // Unique connection id; doubles as the member id in whatever room
    // this connection ends up in
    let connection_id = Uuid::new_v4().to_string();
    info!(conn = %connection_id, "WebSocket connection established");

    let (mut sender, mut receiver) = socket.split();

    // Register the outbound channel so routed events reach this socket
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    app_state.gateway.register(&connection_id, tx).await;

    // Pump routed events out over the socket
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to serialize outbound event: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    // Parse and dispatch inbound frames on this connection's task, in
    // arrival order
    let recv_state = app_state.clone();
    let recv_conn = connection_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(frame)) = receiver.next().await {
            match frame {
                Message::Text(text) => process_text_frame(&recv_state, &recv_conn, &text).await,
                Message::Close(_) => break,
                // Binary frames and transport-level pings are not part
                // of the protocol
                _ => continue,
            }
        }
    });

    // Wait for either task to finish (and finish the other)
    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    // Implicit leave for whatever room the connection was in
    msg_room_handler::handle_disconnect(&app_state, &connection_id).await;
    info!(conn = %connection_id, "WebSocket connection terminated");
}

/// Parse one text frame and route it. Unparseable frames get a typed
/// rejection instead of being coerced into a partial mutation.
pub async fn process_text_frame(state: &Arc<AppState>, connection_id: &str, text: &str) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(event) => dispatch(state, connection_id, event).await,
        Err(e) => {
            warn!(conn = %connection_id, "Rejected malformed frame: {}", e);
            state
                .gateway
                .send_to(
                    connection_id,
                    ServerMessage::Error(ProtocolErrorMsg::malformed_event(&e.to_string())),
                )
                .await;
        }
    }
}

/// Single routing point: every inbound event passes through here on
/// its connection's task, so per-connection ordering is the arrival
/// order on the wire.
pub async fn dispatch(state: &Arc<AppState>, connection_id: &str, event: ClientMessage) {
    match event {
        ClientMessage::CreateRoom(msg) => {
            msg_room_handler::handle_create_room(state, connection_id, msg).await
        }
        ClientMessage::JoinRoom(msg) => {
            msg_room_handler::handle_join_room(state, connection_id, msg).await
        }
        ClientMessage::LeaveRoom(msg) => {
            msg_room_handler::handle_leave_room(state, connection_id, msg).await
        }
        ClientMessage::CodeChange(msg) => {
            msg_edit_handler::handle_code_change(state, connection_id, msg).await
        }
        ClientMessage::CursorMove(msg) => {
            msg_presence_handler::handle_cursor_move(state, connection_id, msg).await
        }
        ClientMessage::SelectionChange(msg) => {
            msg_presence_handler::handle_selection_change(state, connection_id, msg).await
        }
        ClientMessage::LanguageChange(msg) => {
            msg_edit_handler::handle_language_change(state, connection_id, msg).await
        }
        ClientMessage::InputChange(msg) => {
            msg_edit_handler::handle_input_change(state, connection_id, msg).await
        }
        ClientMessage::Chat(msg) => {
            msg_chat_handler::handle_chat_message(state, connection_id, msg).await
        }
        ClientMessage::Typing(msg) => {
            msg_presence_handler::handle_typing(state, connection_id, msg).await
        }
        ClientMessage::Ping(msg) => msg_ping_handler::handle_ping(state, connection_id, msg).await,
        ClientMessage::RunCode(msg) => {
            msg_run_handler::handle_run_code(state, connection_id, msg).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::*;
    use crate::services::exec_service::ExecService;
    use crate::session::registry::SessionRegistry;
    use crate::websocket::gateway::ConnectionGateway;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    fn test_state() -> Arc<AppState> {
        let config = Config::default();
        Arc::new(AppState {
            registry: Arc::new(SessionRegistry::new()),
            gateway: ConnectionGateway::new(),
            executor: ExecService::new(&config),
            config,
        })
    }

    async fn connect(state: &Arc<AppState>, id: &str) -> UnboundedReceiver<ServerMessage> {
        let (tx, rx) = unbounded_channel();
        state.gateway.register(id, tx).await;
        rx
    }

    fn next(rx: &mut UnboundedReceiver<ServerMessage>) -> ServerMessage {
        rx.try_recv().expect("expected a routed event")
    }

    async fn create_room(
        state: &Arc<AppState>,
        conn: &str,
        rx: &mut UnboundedReceiver<ServerMessage>,
        language: Option<Language>,
    ) -> RoomStateMsg {
        dispatch(
            state,
            conn,
            ClientMessage::CreateRoom(CreateRoomMsg {
                username: conn.to_string(),
                language,
            }),
        )
        .await;
        match next(rx) {
            ServerMessage::RoomCreated(m) => m,
            other => panic!("expected room-created, got {:?}", other),
        }
    }

    async fn join_room(
        state: &Arc<AppState>,
        conn: &str,
        rx: &mut UnboundedReceiver<ServerMessage>,
        room_id: &str,
    ) -> RoomStateMsg {
        dispatch(
            state,
            conn,
            ClientMessage::JoinRoom(JoinRoomMsg {
                room_id: room_id.to_string(),
                username: conn.to_string(),
            }),
        )
        .await;
        match next(rx) {
            ServerMessage::RoomJoined(m) => m,
            other => panic!("expected room-joined, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn create_room_seats_exactly_the_creator() {
        let state = test_state();
        let mut alice = connect(&state, "alice").await;

        let created = create_room(&state, "alice", &mut alice, None).await;
        assert_eq!(created.room_id.len(), 6);
        assert_eq!(created.language, Language::Javascript);
        assert_eq!(created.code, Language::Javascript.template());
        assert!(created.input.is_empty());
        assert_eq!(created.members.len(), 1);
        assert_eq!(created.user.id, "alice");

        let room = state.registry.get(&created.room_id).await.unwrap();
        assert_eq!(room.lock().await.members.len(), 1);
    }

    #[tokio::test]
    async fn full_session_scenario() {
        let state = test_state();
        let mut alice = connect(&state, "alice").await;
        let mut bob = connect(&state, "bob").await;

        // Alice creates a javascript room
        let created = create_room(&state, "alice", &mut alice, Some(Language::Javascript)).await;

        // Bob joins with a lowercase code; normalization uppercases it
        let joined = join_room(&state, "bob", &mut bob, &created.room_id.to_lowercase()).await;
        assert_eq!(joined.room_id, created.room_id);
        assert_eq!(joined.code, created.code);
        assert_eq!(joined.language, Language::Javascript);
        assert_eq!(joined.members.len(), 2);

        let notice = match next(&mut alice) {
            ServerMessage::UserJoined(m) => m,
            other => panic!("expected user-joined, got {:?}", other),
        };
        assert_eq!(notice.user.id, "bob");
        assert_eq!(notice.members.len(), 2);

        // Bob edits; only Alice hears about it
        dispatch(
            &state,
            "bob",
            ClientMessage::CodeChange(CodeChangeMsg {
                room_id: created.room_id.clone(),
                code: "x=1".to_string(),
                cursor_position: None,
            }),
        )
        .await;
        let update = match next(&mut alice) {
            ServerMessage::CodeUpdate(m) => m,
            other => panic!("expected code-update, got {:?}", other),
        };
        assert_eq!(update.code, "x=1");
        assert_eq!(update.user_id, "bob");
        assert!(bob.try_recv().is_err());

        let room = state.registry.get(&created.room_id).await.unwrap();
        assert_eq!(room.lock().await.code, "x=1");

        // Alice disconnects; the room survives with Bob in it
        msg_room_handler::handle_disconnect(&state, "alice").await;
        let left = match next(&mut bob) {
            ServerMessage::UserLeft(m) => m,
            other => panic!("expected user-left, got {:?}", other),
        };
        assert_eq!(left.user_id, "alice");
        assert_eq!(left.members.len(), 1);
        assert!(state.registry.get(&created.room_id).await.is_some());

        // Bob disconnects; the emptied room is deleted immediately
        msg_room_handler::handle_disconnect(&state, "bob").await;
        assert!(state.registry.get(&created.room_id).await.is_none());

        // A later join to the dead code is a typed failure
        let mut carol = connect(&state, "carol").await;
        dispatch(
            &state,
            "carol",
            ClientMessage::JoinRoom(JoinRoomMsg {
                room_id: created.room_id.clone(),
                username: "carol".to_string(),
            }),
        )
        .await;
        match next(&mut carol) {
            ServerMessage::Error(e) => assert_eq!(e.code, ProtocolErrorCode::RoomNotFound),
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn code_change_is_last_writer_wins() {
        let state = test_state();
        let mut alice = connect(&state, "alice").await;
        let mut bob = connect(&state, "bob").await;
        let created = create_room(&state, "alice", &mut alice, None).await;
        join_room(&state, "bob", &mut bob, &created.room_id).await;

        for (conn, code) in [("alice", "first"), ("bob", "second")] {
            dispatch(
                &state,
                conn,
                ClientMessage::CodeChange(CodeChangeMsg {
                    room_id: created.room_id.clone(),
                    code: code.to_string(),
                    cursor_position: None,
                }),
            )
            .await;
        }

        // The later arrival replaced the earlier buffer in full
        let room = state.registry.get(&created.room_id).await.unwrap();
        assert_eq!(room.lock().await.code, "second");
    }

    #[tokio::test]
    async fn join_unknown_room_has_no_side_effects() {
        let state = test_state();
        let mut alice = connect(&state, "alice").await;

        dispatch(
            &state,
            "alice",
            ClientMessage::JoinRoom(JoinRoomMsg {
                room_id: "ZZZZZZ".to_string(),
                username: "alice".to_string(),
            }),
        )
        .await;

        match next(&mut alice) {
            ServerMessage::Error(e) => assert_eq!(e.code, ProtocolErrorCode::RoomNotFound),
            other => panic!("expected error, got {:?}", other),
        }
        assert_eq!(state.registry.room_count().await, 0);
        assert_eq!(state.gateway.current_room("alice").await, None);
    }

    #[tokio::test]
    async fn language_change_resets_template_for_everyone() {
        let state = test_state();
        let mut alice = connect(&state, "alice").await;
        let mut bob = connect(&state, "bob").await;
        let created = create_room(&state, "alice", &mut alice, Some(Language::Javascript)).await;
        join_room(&state, "bob", &mut bob, &created.room_id).await;
        let _ = next(&mut alice); // bob's join notice

        dispatch(
            &state,
            "bob",
            ClientMessage::LanguageChange(LanguageChangeMsg {
                room_id: created.room_id.clone(),
                language: Language::Python,
            }),
        )
        .await;

        // Broadcast includes the sender so both UIs converge on the
        // authoritative reset
        for rx in [&mut alice, &mut bob] {
            match next(rx) {
                ServerMessage::LanguageUpdate(m) => {
                    assert_eq!(m.language, Language::Python);
                    assert_eq!(m.code, Language::Python.template());
                }
                other => panic!("expected language-update, got {:?}", other),
            }
        }

        let room = state.registry.get(&created.room_id).await.unwrap();
        let r = room.lock().await;
        assert_eq!(r.language, Language::Python);
        assert_eq!(r.code, Language::Python.template());
    }

    #[tokio::test]
    async fn disconnect_redelivery_is_idempotent() {
        let state = test_state();
        let mut alice = connect(&state, "alice").await;
        let mut bob = connect(&state, "bob").await;
        let created = create_room(&state, "alice", &mut alice, None).await;
        join_room(&state, "bob", &mut bob, &created.room_id).await;
        let _ = next(&mut alice);

        msg_room_handler::handle_disconnect(&state, "bob").await;
        msg_room_handler::handle_disconnect(&state, "bob").await;

        // Exactly one departure notice, and the room is unchanged
        match next(&mut alice) {
            ServerMessage::UserLeft(m) => assert_eq!(m.user_id, "bob"),
            other => panic!("expected user-left, got {:?}", other),
        }
        assert!(alice.try_recv().is_err());
        let room = state.registry.get(&created.room_id).await.unwrap();
        assert_eq!(room.lock().await.members.len(), 1);
    }

    #[tokio::test]
    async fn events_from_departed_members_are_dropped() {
        let state = test_state();
        let mut alice = connect(&state, "alice").await;
        let mut bob = connect(&state, "bob").await;
        let created = create_room(&state, "alice", &mut alice, None).await;
        join_room(&state, "bob", &mut bob, &created.room_id).await;
        let _ = next(&mut alice);

        dispatch(
            &state,
            "bob",
            ClientMessage::LeaveRoom(LeaveRoomMsg {
                room_id: created.room_id.clone(),
            }),
        )
        .await;
        let _ = next(&mut alice); // bob's departure notice

        // Bob raced his own departure; nothing is applied, nothing is
        // broadcast, and no error goes back
        dispatch(
            &state,
            "bob",
            ClientMessage::CursorMove(CursorMoveMsg {
                room_id: created.room_id.clone(),
                position: CursorPosition { line: 9, column: 9 },
            }),
        )
        .await;
        assert!(alice.try_recv().is_err());
        assert!(bob.try_recv().is_err());
    }

    #[tokio::test]
    async fn ping_echoes_client_timestamp() {
        let state = test_state();
        let mut alice = connect(&state, "alice").await;

        dispatch(
            &state,
            "alice",
            ClientMessage::Ping(PingMsg { timestamp: 12345 }),
        )
        .await;

        match next(&mut alice) {
            ServerMessage::Pong(m) => {
                assert_eq!(m.timestamp, 12345);
                assert!(m.server_timestamp > 0);
            }
            other => panic!("expected pong, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn chat_reaches_everyone_including_sender() {
        let state = test_state();
        let mut alice = connect(&state, "alice").await;
        let mut bob = connect(&state, "bob").await;
        let created = create_room(&state, "alice", &mut alice, None).await;
        join_room(&state, "bob", &mut bob, &created.room_id).await;
        let _ = next(&mut alice);

        dispatch(
            &state,
            "bob",
            ClientMessage::Chat(ChatSendMsg {
                room_id: created.room_id.clone(),
                message: "hello".to_string(),
            }),
        )
        .await;

        let mut ids = Vec::new();
        for rx in [&mut alice, &mut bob] {
            match next(rx) {
                ServerMessage::Chat(m) => {
                    assert_eq!(m.message, "hello");
                    assert_eq!(m.user_id, "bob");
                    ids.push(m.id);
                }
                other => panic!("expected chat-message, got {:?}", other),
            }
        }
        // Same emit, same message id
        assert_eq!(ids[0], ids[1]);
    }

    #[tokio::test]
    async fn typing_and_input_go_to_others_only() {
        let state = test_state();
        let mut alice = connect(&state, "alice").await;
        let mut bob = connect(&state, "bob").await;
        let created = create_room(&state, "alice", &mut alice, None).await;
        join_room(&state, "bob", &mut bob, &created.room_id).await;
        let _ = next(&mut alice);

        dispatch(
            &state,
            "alice",
            ClientMessage::Typing(TypingMsg {
                room_id: created.room_id.clone(),
                is_typing: true,
            }),
        )
        .await;
        match next(&mut bob) {
            ServerMessage::UserTyping(m) => assert!(m.is_typing),
            other => panic!("expected user-typing, got {:?}", other),
        }
        assert!(alice.try_recv().is_err());

        dispatch(
            &state,
            "alice",
            ClientMessage::InputChange(InputChangeMsg {
                room_id: created.room_id.clone(),
                input: "42".to_string(),
            }),
        )
        .await;
        match next(&mut bob) {
            ServerMessage::InputUpdate(m) => assert_eq!(m.input, "42"),
            other => panic!("expected input-update, got {:?}", other),
        }
        assert!(alice.try_recv().is_err());

        let room = state.registry.get(&created.room_id).await.unwrap();
        assert_eq!(room.lock().await.input, "42");
    }

    #[tokio::test]
    async fn switching_rooms_departs_the_previous_one() {
        let state = test_state();
        let mut alice = connect(&state, "alice").await;

        let first = create_room(&state, "alice", &mut alice, None).await;
        let second = create_room(&state, "alice", &mut alice, None).await;

        // The first room emptied when Alice moved on, so it is gone
        assert!(state.registry.get(&first.room_id).await.is_none());
        assert!(state.registry.get(&second.room_id).await.is_some());
        assert_eq!(
            state.gateway.current_room("alice").await.as_deref(),
            Some(second.room_id.as_str())
        );
    }

    #[tokio::test]
    async fn malformed_frames_get_typed_rejections() {
        let state = test_state();
        let mut alice = connect(&state, "alice").await;

        process_text_frame(&state, "alice", "not json at all").await;
        match next(&mut alice) {
            ServerMessage::Error(e) => assert_eq!(e.code, ProtocolErrorCode::MalformedEvent),
            other => panic!("expected error, got {:?}", other),
        }

        process_text_frame(&state, "alice", r#"{"type":"join-room"}"#).await;
        match next(&mut alice) {
            ServerMessage::Error(e) => assert_eq!(e.code, ProtocolErrorCode::MalformedEvent),
            other => panic!("expected error, got {:?}", other),
        }

        // Nothing was applied along the way
        assert_eq!(state.registry.room_count().await, 0);
    }
}
