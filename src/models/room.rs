use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::Language;

/// One collaborative session: a shared buffer plus its membership.
///
/// All mutation goes through the websocket message handlers while the
/// room's mutex is held, so reads and writes of these fields never
/// interleave across connections.
#[derive(Debug)]
pub struct Room {
    /// Short join code, unique among live rooms, immutable
    pub id: String,
    /// Shared code buffer, replaced wholesale on every code change
    pub code: String,
    pub language: Language,
    /// Shared stdin buffer handed to the execution service
    pub input: String,
    /// Connection id -> member
    pub members: HashMap<String, User>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl Room {
    pub fn new(id: String, language: Language) -> Self {
        let now = Utc::now();
        Self {
            id,
            code: language.template().to_string(),
            language,
            input: String::new(),
            members: HashMap::new(),
            created_at: now,
            last_activity: now,
        }
    }

    /// Record a mutating event, pushing back the idle-reaping horizon
    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }
}

/// A connection's participation record within a room
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Equals the owning connection id
    pub id: String,
    pub username: String,
    /// Hex color picked from the palette at join time
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor_position: Option<CursorPosition>,
    /// Opaque editor selection range, relayed as-is
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<serde_json::Value>,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorPosition {
    pub line: u32,
    pub column: u32,
}

/// Chat line relayed to the room, snapshotting the sender's identity at
/// send time. Never stored server-side beyond the emit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub color: String,
    pub message: String,
    /// Epoch milliseconds at the server
    pub timestamp: i64,
}
