use crate::error::GameError;
use crate::room::{default_themes, Removal, Room};
use crate::timer::PhaseTimers;
use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::info;
use uuid::Uuid;
use wordchain_protocol::PublicRoom;

pub type ConnectionId = Uuid;
pub type RoomHandle = Arc<Mutex<RoomSlot>>;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_LEN: usize = 6;

fn generate_code() -> String {
    let mut rng = thread_rng();
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Room codes are matched case-insensitively.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Player names are stored and compared trimmed, case-sensitively.
pub fn normalize_name(name: &str) -> &str {
    name.trim()
}

/// A room plus everything that must change under the same lock as the room.
#[derive(Debug)]
pub struct RoomSlot {
    pub room: Room,
    pub timers: PhaseTimers,
    this: Weak<Mutex<RoomSlot>>,
    closed: bool,
}

impl RoomSlot {
    fn new_handle(room: Room) -> RoomHandle {
        Arc::new_cyclic(|this| {
            Mutex::new(RoomSlot {
                room,
                timers: PhaseTimers::default(),
                this: this.clone(),
                closed: false,
            })
        })
    }

    /// A handle that does not keep the room alive, for timers.
    pub fn weak(&self) -> Weak<Mutex<RoomSlot>> {
        self.this.clone()
    }

    /// Set once the last player left. A closed slot is never reopened.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub code: String,
    pub player: String,
}

/// A player taken out of their room. `slot` is still locked so the caller can
/// finish follow-up work atomically; it is `None` when the room was destroyed.
#[derive(Debug)]
pub struct Departure {
    pub code: String,
    pub removal: Removal,
    pub slot: Option<OwnedMutexGuard<RoomSlot>>,
}

/// Owns every live room, keyed by code, and which connection sits where.
///
/// Locks are always taken map-then-release before a room lock, or room lock
/// first and map second; a map lock is never held while waiting on a room.
#[derive(Debug)]
pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, RoomHandle>>,
    members: RwLock<HashMap<ConnectionId, Membership>>,
    max_rounds: u32,
}

impl RoomRegistry {
    pub fn new(max_rounds: u32) -> Self {
        Self {
            rooms: Default::default(),
            members: Default::default(),
            max_rounds,
        }
    }

    pub async fn create(&self, conn: ConnectionId, host_name: &str) -> Result<PublicRoom, GameError> {
        let host_name = normalize_name(host_name);
        if host_name.is_empty() {
            return Err(GameError::NameRequired);
        }
        if self.members.read().await.contains_key(&conn) {
            return Err(GameError::AlreadyInRoom);
        }

        let mut themes = default_themes();
        themes.shuffle(&mut thread_rng());

        let mut rooms = self.rooms.write().await;
        let code = loop {
            let candidate = generate_code();
            if !rooms.contains_key(&candidate) {
                break candidate;
            }
        };
        let room = Room::new(code.clone(), host_name, themes, self.max_rounds);
        let public = room.public();
        rooms.insert(code.clone(), RoomSlot::new_handle(room));
        drop(rooms);

        self.members.write().await.insert(
            conn,
            Membership {
                code: code.clone(),
                player: host_name.to_string(),
            },
        );
        info!(room = %code, player = %host_name, "room created");
        Ok(public)
    }

    pub async fn join(&self, conn: ConnectionId, code: &str, player_name: &str) -> Result<PublicRoom, GameError> {
        let player_name = normalize_name(player_name);
        if player_name.is_empty() {
            return Err(GameError::NameRequired);
        }
        if self.members.read().await.contains_key(&conn) {
            return Err(GameError::AlreadyInRoom);
        }
        let code = normalize_code(code);
        let handle = self.get(&code).await?;

        let mut slot = handle.lock().await;
        if slot.is_closed() {
            return Err(GameError::RoomNotFound);
        }
        if slot.room.game_started {
            return Err(GameError::AlreadyStarted);
        }
        if slot.room.player(player_name).is_some() {
            return Err(GameError::NameTaken);
        }
        slot.room.add_player(player_name);

        self.members.write().await.insert(
            conn,
            Membership {
                code: code.clone(),
                player: player_name.to_string(),
            },
        );
        info!(room = %code, player = %player_name, "player joined");
        Ok(slot.room.public())
    }

    pub async fn get(&self, code: &str) -> Result<RoomHandle, GameError> {
        self.rooms
            .read()
            .await
            .get(code)
            .cloned()
            .ok_or(GameError::RoomNotFound)
    }

    pub async fn membership(&self, conn: ConnectionId) -> Option<Membership> {
        self.members.read().await.get(&conn).cloned()
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Takes the connection's player out of their room. Destroys the room
    /// (cancelling its timers) when nobody is left in it.
    pub async fn remove(&self, conn: ConnectionId) -> Option<Departure> {
        let membership = self.members.write().await.remove(&conn)?;
        let handle = self.rooms.read().await.get(&membership.code).cloned()?;

        let mut slot = handle.lock_owned().await;
        if slot.is_closed() {
            return None;
        }
        let removal = slot.room.remove_player(&membership.player)?;
        info!(room = %membership.code, player = %removal.name, "player left");

        if slot.room.players().is_empty() {
            slot.closed = true;
            slot.timers.cancel();
            self.rooms.write().await.remove(&membership.code);
            info!(room = %membership.code, "room closed");
            return Some(Departure {
                code: membership.code,
                removal,
                slot: None,
            });
        }

        Some(Departure {
            code: membership.code,
            removal,
            slot: Some(slot),
        })
    }
}
