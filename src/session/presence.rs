use chrono::Utc;
use rand::Rng;
use tracing::debug;

use crate::models::{CursorPosition, Room, User};

/// Fixed member color palette. Picks are pseudo-random and carry no
/// per-room distinctness guarantee; collisions are cosmetic.
const COLOR_PALETTE: [&str; 10] = [
    "#e06c75", "#61afef", "#98c379", "#c678dd", "#d19a66", "#56b6c2", "#be5046", "#528bff",
    "#e5c07b", "#2bbac5",
];

const DEFAULT_USERNAME: &str = "Anonymous";

pub fn pick_color() -> &'static str {
    let idx = rand::thread_rng().gen_range(0..COLOR_PALETTE.len());
    COLOR_PALETTE[idx]
}

/// Insert a member keyed by its connection id. Usernames are display
/// text, not keys, so duplicates are allowed.
pub fn add_member(room: &mut Room, connection_id: &str, username: &str) -> User {
    let username = if username.trim().is_empty() {
        DEFAULT_USERNAME.to_string()
    } else {
        username.trim().to_string()
    };
    let user = User {
        id: connection_id.to_string(),
        username,
        color: pick_color().to_string(),
        cursor_position: Some(CursorPosition { line: 1, column: 0 }),
        selection: None,
        joined_at: Utc::now(),
    };
    room.members.insert(connection_id.to_string(), user.clone());
    user
}

/// Remove and return the departed member. The caller decides whether
/// the now-empty room must be deleted.
pub fn remove_member(room: &mut Room, connection_id: &str) -> Option<User> {
    room.members.remove(connection_id)
}

/// In-place cursor update. Returns false when the connection is not a
/// member, which happens when an event races a disconnect.
pub fn update_cursor(room: &mut Room, connection_id: &str, position: CursorPosition) -> bool {
    match room.members.get_mut(connection_id) {
        Some(user) => {
            user.cursor_position = Some(position);
            true
        }
        None => {
            debug!(room = %room.id, conn = %connection_id, "Cursor update from non-member dropped");
            false
        }
    }
}

/// In-place selection update, same staleness rule as cursors
pub fn update_selection(
    room: &mut Room,
    connection_id: &str,
    selection: Option<serde_json::Value>,
) -> bool {
    match room.members.get_mut(connection_id) {
        Some(user) => {
            user.selection = selection;
            true
        }
        None => {
            debug!(room = %room.id, conn = %connection_id, "Selection update from non-member dropped");
            false
        }
    }
}

/// Membership projection for broadcast payloads. Order follows the
/// underlying map and is not stable across joins and departures.
pub fn snapshot(room: &Room) -> Vec<User> {
    room.members.values().cloned().collect()
}
