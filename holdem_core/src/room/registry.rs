//! Room lifecycle and lookup.
//!
//! The registry owns every table behind an `Arc<Mutex<_>>`; the mutex is
//! the room's exclusive lock from the concurrency model. Rooms have no
//! task of their own, so mutations run on the caller's task while the
//! lock is held.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{Mutex, RwLock};

use crate::game::UserId;

use super::room::{Room, RoomId, RoomOptions};

pub type SharedRoom = Arc<Mutex<Room>>;

#[derive(Default)]
pub struct RoomRegistry {
    rooms: RwLock<HashMap<RoomId, SharedRoom>>,
    next_id: AtomicI64,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    pub async fn create(&self, options: RoomOptions) -> (RoomId, SharedRoom) {
        self.create_with_rng(options, StdRng::from_entropy()).await
    }

    /// Create a room with a caller-supplied generator so tests can pin
    /// the exact shuffle.
    pub async fn create_with_rng(&self, options: RoomOptions, rng: StdRng) -> (RoomId, SharedRoom) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let room = Arc::new(Mutex::new(Room::new(id, options, rng)));
        self.rooms.write().await.insert(id, room.clone());
        tracing::info!(room_id = id, "room created");
        (id, room)
    }

    pub async fn get(&self, id: RoomId) -> Option<SharedRoom> {
        self.rooms.read().await.get(&id).cloned()
    }

    /// Tear a room down. A hand in flight collapses via `Reset`; actions
    /// still queued against the room are rejected once the lock frees.
    pub async fn remove(&self, id: RoomId) -> bool {
        let room = self.rooms.write().await.remove(&id);
        match room {
            Some(room) => {
                room.lock().await.close();
                tracing::info!(room_id = id, "room closed");
                true
            }
            None => false,
        }
    }

    /// Seated user ids for fan-out targeting; empty when the room is
    /// unknown.
    pub async fn seated_users(&self, id: RoomId) -> Vec<UserId> {
        match self.get(id).await {
            Some(room) => room.lock().await.seated_users(),
            None => Vec::new(),
        }
    }

    pub async fn ids(&self) -> Vec<RoomId> {
        self.rooms.read().await.keys().copied().collect()
    }
}
