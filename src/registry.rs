//! Room registry
//!
//! Maps room ids to their actor handles, spawning actors on first use.

use dashmap::DashMap;
use tracing::warn;

use crate::room_actor::RoomHandle;
use crate::store::Store;
use crate::types::RoomId;

/// Concurrent room id → actor handle map
///
/// Rooms are never deleted, so an entry and its actor task live for the rest
/// of the process once a room has been addressed, even after its last
/// connection closes.
#[derive(Debug)]
pub struct RoomRegistry {
    store: Store,
    rooms: DashMap<RoomId, RoomHandle>,
    /// Command queue size of each room actor
    buffer: usize,
}

impl RoomRegistry {
    pub fn new(store: Store, buffer: usize) -> Self {
        Self {
            store,
            rooms: DashMap::new(),
            buffer,
        }
    }

    /// Handle of the actor owning `id`
    ///
    /// Spawns the actor if the room has none yet or its task has stopped.
    pub fn get(&self, id: &RoomId) -> RoomHandle {
        let mut entry = self
            .rooms
            .entry(id.clone())
            .or_insert_with(|| RoomHandle::spawn(id.clone(), &self.store, self.buffer));

        if entry.is_closed() {
            warn!(room = %id, "Room actor stopped, respawning");
            *entry = RoomHandle::spawn(id.clone(), &self.store, self.buffer);
        }

        entry.clone()
    }

    /// Number of rooms with a live actor handle
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::RoomMetadata;
    use crate::types::{ConnectionId, UserId};
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_same_id_same_actor() {
        let store = Store::in_memory().await.unwrap();
        let registry = RoomRegistry::new(store, 16);
        let id = RoomId::new("room_a").unwrap();

        let meta = RoomMetadata {
            name: "A".into(),
            ..Default::default()
        };
        registry.get(&id).set_metadata(meta.clone()).await.unwrap();

        assert_eq!(registry.get(&id).snapshot().await.unwrap().meta, meta);
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_rooms_are_isolated() {
        let store = Store::in_memory().await.unwrap();
        let registry = RoomRegistry::new(store, 16);
        let a = RoomId::new("room_a").unwrap();
        let b = RoomId::new("room_b").unwrap();

        registry
            .get(&a)
            .set_metadata(RoomMetadata {
                name: "A".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(registry.get(&b).snapshot().await.unwrap().meta.name.is_empty());
        assert_eq!(registry.len(), 2);
        assert_ne!(registry.get(&a).id(), registry.get(&b).id());
    }

    #[tokio::test]
    async fn test_room_kept_after_last_connection_closes() {
        let store = Store::in_memory().await.unwrap();
        let registry = RoomRegistry::new(store, 16);
        let id = RoomId::new("room_a").unwrap();
        let user_id = UserId::new("u1").unwrap();
        let (tx, _rx) = mpsc::channel(8);
        let conn = ConnectionId::new();

        let room = registry.get(&id);
        room.open(conn, user_id.clone(), "U1".into(), tx).await.unwrap();
        room.close(conn, user_id).await.unwrap();
        assert_eq!(room.snapshot().await.unwrap().connections, 0);

        assert_eq!(registry.len(), 1);
        assert!(!registry.get(&id).is_closed());
    }
}
