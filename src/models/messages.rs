use serde::{Deserialize, Serialize};

use crate::models::{ChatMessage, CursorPosition, Language, User};

fn default_username() -> String {
    String::new()
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomMsg {
    #[serde(default = "default_username")]
    pub username: String,
    /// Defaults to javascript when omitted
    #[serde(default)]
    pub language: Option<Language>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomMsg {
    pub room_id: String,
    #[serde(default = "default_username")]
    pub username: String,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRoomMsg {
    pub room_id: String,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CodeChangeMsg {
    pub room_id: String,
    pub code: String,
    #[serde(default)]
    pub cursor_position: Option<CursorPosition>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CursorMoveMsg {
    pub room_id: String,
    pub position: CursorPosition,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SelectionChangeMsg {
    pub room_id: String,
    #[serde(default)]
    pub selection: Option<serde_json::Value>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LanguageChangeMsg {
    pub room_id: String,
    pub language: Language,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct InputChangeMsg {
    pub room_id: String,
    pub input: String,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ChatSendMsg {
    pub room_id: String,
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TypingMsg {
    pub room_id: String,
    pub is_typing: bool,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PingMsg {
    /// Client clock in epoch milliseconds, echoed back verbatim
    pub timestamp: i64,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RunCodeMsg {
    pub room_id: String,
}

/// Every event a client may send, dispatched by the `type` tag
#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "create-room")]
    CreateRoom(CreateRoomMsg),
    #[serde(rename = "join-room")]
    JoinRoom(JoinRoomMsg),
    #[serde(rename = "leave-room")]
    LeaveRoom(LeaveRoomMsg),
    #[serde(rename = "code-change")]
    CodeChange(CodeChangeMsg),
    #[serde(rename = "cursor-move")]
    CursorMove(CursorMoveMsg),
    #[serde(rename = "selection-change")]
    SelectionChange(SelectionChangeMsg),
    #[serde(rename = "language-change")]
    LanguageChange(LanguageChangeMsg),
    #[serde(rename = "input-change")]
    InputChange(InputChangeMsg),
    #[serde(rename = "chat-message")]
    Chat(ChatSendMsg),
    #[serde(rename = "typing")]
    Typing(TypingMsg),
    #[serde(rename = "ping")]
    Ping(PingMsg),
    #[serde(rename = "run-code")]
    RunCode(RunCodeMsg),
}

/// Full room snapshot handed to the initiating connection on
/// create-room and join-room
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RoomStateMsg {
    pub room_id: String,
    pub code: String,
    pub language: Language,
    pub input: String,
    pub user: User,
    pub members: Vec<User>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserJoinedMsg {
    pub user: User,
    pub members: Vec<User>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserLeftMsg {
    pub user_id: String,
    pub username: String,
    pub members: Vec<User>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CodeUpdateMsg {
    pub code: String,
    pub user_id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor_position: Option<CursorPosition>,
    /// Server clock in epoch milliseconds at apply time
    pub timestamp: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CursorUpdateMsg {
    pub user_id: String,
    pub username: String,
    pub color: String,
    pub position: CursorPosition,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SelectionUpdateMsg {
    pub user_id: String,
    pub username: String,
    pub color: String,
    pub selection: Option<serde_json::Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LanguageUpdateMsg {
    pub language: Language,
    /// Template buffer the room was reset to
    pub code: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct InputUpdateMsg {
    pub input: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserTypingMsg {
    pub user_id: String,
    pub username: String,
    pub is_typing: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PongMsg {
    /// The client timestamp from the ping, unchanged
    pub timestamp: i64,
    pub server_timestamp: i64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResultMsg {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

/// Every event the server may emit, tagged the same way as inbound ones
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "room-created")]
    RoomCreated(RoomStateMsg),
    #[serde(rename = "room-joined")]
    RoomJoined(RoomStateMsg),
    #[serde(rename = "user-joined")]
    UserJoined(UserJoinedMsg),
    #[serde(rename = "user-left")]
    UserLeft(UserLeftMsg),
    #[serde(rename = "code-update")]
    CodeUpdate(CodeUpdateMsg),
    #[serde(rename = "cursor-update")]
    CursorUpdate(CursorUpdateMsg),
    #[serde(rename = "selection-update")]
    SelectionUpdate(SelectionUpdateMsg),
    #[serde(rename = "language-update")]
    LanguageUpdate(LanguageUpdateMsg),
    #[serde(rename = "input-update")]
    InputUpdate(InputUpdateMsg),
    #[serde(rename = "chat-message")]
    Chat(ChatMessage),
    #[serde(rename = "user-typing")]
    UserTyping(UserTypingMsg),
    #[serde(rename = "pong")]
    Pong(PongMsg),
    #[serde(rename = "execution-result")]
    ExecutionResult(ExecutionResultMsg),
    #[serde(rename = "error")]
    Error(crate::models::ProtocolErrorMsg),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_events_dispatch_on_type_tag() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"code-change","roomId":"AB12CD","code":"x=1","cursorPosition":{"line":1,"column":3}}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::CodeChange(m) => {
                assert_eq!(m.room_id, "AB12CD");
                assert_eq!(m.code, "x=1");
                assert_eq!(m.cursor_position.unwrap().column, 3);
            }
            other => panic!("parsed wrong variant: {:?}", other),
        }
    }

    #[test]
    fn create_room_defaults_apply() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"create-room"}"#).unwrap();
        match msg {
            ClientMessage::CreateRoom(m) => {
                assert!(m.username.is_empty());
                assert!(m.language.is_none());
            }
            other => panic!("parsed wrong variant: {:?}", other),
        }
    }

    #[test]
    fn unknown_event_type_is_rejected() {
        let result: Result<ClientMessage, _> =
            serde_json::from_str(r#"{"type":"drop-tables","roomId":"AB12CD"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn server_events_serialize_camel_case() {
        let msg = ServerMessage::Pong(PongMsg {
            timestamp: 123,
            server_timestamp: 456,
        });
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"pong\""));
        assert!(json.contains("\"serverTimestamp\":456"));
    }
}
