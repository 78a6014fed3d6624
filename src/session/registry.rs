use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::models::{Language, MemberSummary, Room, RoomDetailResponse, RoomSummary};

const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const ROOM_CODE_LEN: usize = 6;

/// Owns the map from room code to live room state.
///
/// Each room sits behind its own mutex, which is the serialization
/// point for that room: a handler holds the lock for the whole of its
/// mutation, so two events for the same room are never applied
/// concurrently. Lock order is always registry map first, then room,
/// never the reverse.
pub struct SessionRegistry {
    rooms: RwLock<HashMap<String, Arc<Mutex<Room>>>>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Direct access to the room map for handlers that must hold the
    /// map lock across a room mutation (joins, departures, sweeps)
    pub fn rooms(&self) -> &RwLock<HashMap<String, Arc<Mutex<Room>>>> {
        &self.rooms
    }

    /// Create a room with a fresh join code, template code for the
    /// language, and no members yet
    pub async fn create_room(&self, language: Language) -> (String, Arc<Mutex<Room>>) {
        let mut rooms = self.rooms.write().await;
        let code = loop {
            let candidate = generate_room_code();
            if !rooms.contains_key(&candidate) {
                break candidate;
            }
            debug!(code = %candidate, "Room code collision, regenerating");
        };
        let room = Arc::new(Mutex::new(Room::new(code.clone(), language)));
        rooms.insert(code.clone(), room.clone());
        info!(room = %code, language = %language, "Room created");
        (code, room)
    }

    /// Exact-match lookup; callers normalize the code to uppercase first
    pub async fn get(&self, room_id: &str) -> Option<Arc<Mutex<Room>>> {
        self.rooms.read().await.get(room_id).cloned()
    }

    /// Idempotent removal
    pub async fn delete(&self, room_id: &str) {
        if self.rooms.write().await.remove(room_id).is_some() {
            info!(room = %room_id, "Room deleted");
        }
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn member_count(&self) -> usize {
        let rooms = self.rooms.read().await;
        let mut total = 0;
        for room in rooms.values() {
            total += room.lock().await.members.len();
        }
        total
    }

    /// Remove every room whose last activity is older than `max_idle`,
    /// regardless of member count. Best-effort: a room whose lock is
    /// held is being mutated right now and is skipped until the next
    /// pass.
    pub async fn sweep_idle(&self, max_idle: chrono::Duration) -> usize {
        let mut rooms = self.rooms.write().await;
        let cutoff = chrono::Utc::now() - max_idle;
        let stale: Vec<String> = rooms
            .iter()
            .filter_map(|(id, room)| match room.try_lock() {
                Ok(r) if r.last_activity < cutoff => Some(id.clone()),
                _ => None,
            })
            .collect();
        for id in &stale {
            rooms.remove(id);
            info!(room = %id, "Reaped idle room");
        }
        stale.len()
    }

    /// Read-only projection of every live room for the monitoring surface
    pub async fn summaries(&self) -> Vec<RoomSummary> {
        let rooms = self.rooms.read().await;
        let mut out = Vec::with_capacity(rooms.len());
        for room in rooms.values() {
            let r = room.lock().await;
            out.push(RoomSummary {
                room_id: r.id.clone(),
                language: r.language,
                member_count: r.members.len(),
                created_at: r.created_at,
                last_activity: r.last_activity,
            });
        }
        out
    }

    /// Single-room detail for the monitoring surface
    pub async fn detail(&self, room_id: &str) -> Option<RoomDetailResponse> {
        let room = self.get(room_id).await?;
        let r = room.lock().await;
        let members = r
            .members
            .values()
            .map(|u| MemberSummary {
                user_id: u.id.clone(),
                username: u.username.clone(),
                color: u.color.clone(),
                joined_at: u.joined_at,
            })
            .collect();
        Some(RoomDetailResponse {
            room_id: r.id.clone(),
            language: r.language,
            member_count: r.members.len(),
            created_at: r.created_at,
            last_activity: r.last_activity,
            members,
        })
    }

    /// Spawn the periodic idle reaper. The returned handle is aborted
    /// at shutdown.
    pub fn start_sweeper(
        registry: Arc<SessionRegistry>,
        interval: std::time::Duration,
        max_idle: chrono::Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it so a restart
            // doesn't double-sweep.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = registry.sweep_idle(max_idle).await;
                if removed > 0 {
                    info!(removed, "Idle sweep removed rooms");
                } else {
                    debug!("Idle sweep found nothing to reap");
                }
            }
        })
    }
}

/// Uppercase-alphanumeric join code; the protocol layer uppercases
/// incoming codes before lookup so generated codes stay canonical.
pub fn generate_room_code() -> String {
    let mut rng = rand::thread_rng();
    (0..ROOM_CODE_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..ROOM_CODE_ALPHABET.len());
            ROOM_CODE_ALPHABET[idx] as char
        })
        .collect()
}

/// Room codes compare case-sensitively after this normalization
pub fn normalize_room_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}
