//! Directory actor
//!
//! The single global index of which rooms each user belongs to. Like a room,
//! it processes its commands one at a time, so registrations touching the
//! same user never race.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::store::{ScopedStore, Store};
use crate::types::{RoomId, UserId};

/// Storage namespace of the directory
const NAMESPACE: &str = "directory";

type Reply<T> = oneshot::Sender<AppResult<T>>;

/// Commands sent to the directory actor
#[derive(Debug)]
pub enum DirectoryCommand {
    /// Add a room to each member's set
    RegisterRoom {
        room_id: RoomId,
        members: Vec<UserId>,
        reply: Reply<()>,
    },
    /// Read one user's rooms
    ListRooms {
        user_id: UserId,
        reply: Reply<Vec<RoomId>>,
    },
}

fn user_key(user_id: &UserId) -> String {
    format!("user:{user_id}")
}

/// The directory actor
pub struct Directory {
    store: ScopedStore,
    receiver: mpsc::Receiver<DirectoryCommand>,
}

impl Directory {
    pub fn new(store: ScopedStore, receiver: mpsc::Receiver<DirectoryCommand>) -> Self {
        Self { store, receiver }
    }

    pub async fn run(mut self) {
        info!("Directory started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                DirectoryCommand::RegisterRoom {
                    room_id,
                    members,
                    reply,
                } => {
                    let _ = reply.send(self.register_room(room_id, members).await);
                }
                DirectoryCommand::ListRooms { user_id, reply } => {
                    let _ = reply.send(self.list_rooms(&user_id).await);
                }
            }
        }

        info!("Directory shutting down");
    }

    async fn register_room(&self, room_id: RoomId, members: Vec<UserId>) -> AppResult<()> {
        for user_id in &members {
            let key = user_key(user_id);
            let mut rooms = self.store.get::<Vec<RoomId>>(&key).await?.unwrap_or_default();
            if !rooms.contains(&room_id) {
                rooms.push(room_id.clone());
            }
            self.store.put(&key, &rooms).await?;
        }
        debug!(room = %room_id, members = members.len(), "Room registered");
        Ok(())
    }

    async fn list_rooms(&self, user_id: &UserId) -> AppResult<Vec<RoomId>> {
        Ok(self
            .store
            .get::<Vec<RoomId>>(&user_key(user_id))
            .await?
            .unwrap_or_default())
    }
}

/// Cloneable address of the directory actor
#[derive(Debug, Clone)]
pub struct DirectoryHandle {
    sender: mpsc::Sender<DirectoryCommand>,
}

impl DirectoryHandle {
    /// Spawn the directory on its own task
    pub fn spawn(store: &Store, buffer: usize) -> Self {
        let (sender, receiver) = mpsc::channel(buffer);
        tokio::spawn(Directory::new(store.scoped(NAMESPACE), receiver).run());
        Self { sender }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> DirectoryCommand,
    ) -> AppResult<T> {
        let unavailable = || AppError::ActorUnavailable("directory".to_string());
        let (reply, rx) = oneshot::channel();
        self.sender.send(make(reply)).await.map_err(|_| unavailable())?;
        rx.await.map_err(|_| unavailable())?
    }

    pub async fn register_room(&self, room_id: RoomId, members: Vec<UserId>) -> AppResult<()> {
        self.request(|reply| DirectoryCommand::RegisterRoom {
            room_id,
            members,
            reply,
        })
        .await
    }

    pub async fn list_rooms(&self, user_id: UserId) -> AppResult<Vec<RoomId>> {
        self.request(|reply| DirectoryCommand::ListRooms { user_id, reply })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn room(id: &str) -> RoomId {
        RoomId::new(id).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_user_has_no_rooms() {
        let store = Store::in_memory().await.unwrap();
        let directory = DirectoryHandle::spawn(&store, 16);

        assert!(directory.list_rooms(user("nobody")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_register_is_idempotent() {
        let store = Store::in_memory().await.unwrap();
        let directory = DirectoryHandle::spawn(&store, 16);

        directory.register_room(room("r1"), vec![user("u1")]).await.unwrap();
        directory.register_room(room("r1"), vec![user("u1")]).await.unwrap();

        assert_eq!(directory.list_rooms(user("u1")).await.unwrap(), vec![room("r1")]);
    }

    #[tokio::test]
    async fn test_rooms_listed_in_registration_order() {
        let store = Store::in_memory().await.unwrap();
        let directory = DirectoryHandle::spawn(&store, 16);

        directory
            .register_room(room("r1"), vec![user("u1"), user("u2")])
            .await
            .unwrap();
        directory.register_room(room("r2"), vec![user("u2")]).await.unwrap();

        assert_eq!(directory.list_rooms(user("u1")).await.unwrap(), vec![room("r1")]);
        assert_eq!(
            directory.list_rooms(user("u2")).await.unwrap(),
            vec![room("r1"), room("r2")]
        );
    }

    #[tokio::test]
    async fn test_concurrent_registrations_for_same_user() {
        let store = Store::in_memory().await.unwrap();
        let directory = DirectoryHandle::spawn(&store, 64);

        let tasks: Vec<_> = (0..20)
            .map(|i| {
                let directory = directory.clone();
                tokio::spawn(async move {
                    directory
                        .register_room(room(&format!("r{i}")), vec![user("u1")])
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(directory.list_rooms(user("u1")).await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_index_survives_restart() {
        let store = Store::in_memory().await.unwrap();
        let directory = DirectoryHandle::spawn(&store, 16);
        directory.register_room(room("r1"), vec![user("u1")]).await.unwrap();
        drop(directory);

        let restarted = DirectoryHandle::spawn(&store, 16);
        assert_eq!(restarted.list_rooms(user("u1")).await.unwrap(), vec![room("r1")]);
    }
}
