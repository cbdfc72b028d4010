//! Room actor implementation
//!
//! One actor per room owns the room's live connections, metadata and message
//! log. Everything addressed to the room goes through its command queue and
//! is handled one command at a time, so the actor is the only writer of the
//! room's state.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::connection::Connection;
use crate::error::{AppError, AppResult};
use crate::message::{ClientMessage, ServerMessage};
use crate::room::{MessageLog, MessageRecord, MetadataPatch, RoomMetadata};
use crate::store::{ScopedStore, Store};
use crate::types::{ConnectionId, RoomId, UserId};

/// Storage key of the room metadata
const META_KEY: &str = "meta";

/// Storage key of the message log
const MESSAGES_KEY: &str = "messages";

type Reply<T> = oneshot::Sender<AppResult<T>>;

/// Commands sent to a room actor
#[derive(Debug)]
pub enum RoomCommand {
    /// Replace the metadata wholesale
    SetMetadata { meta: RoomMetadata, reply: Reply<()> },
    /// Write the metadata only if none exists yet
    InitMetadata { meta: RoomMetadata, reply: Reply<bool> },
    /// Merge fields into the metadata
    UpdateMetadata { patch: MetadataPatch, reply: Reply<()> },
    /// New transport opened
    Open {
        connection_id: ConnectionId,
        user_id: UserId,
        display_name: String,
        sender: mpsc::Sender<ServerMessage>,
    },
    /// Raw text frame received from a transport
    Incoming {
        connection_id: ConnectionId,
        raw: String,
    },
    /// Transport closed
    Close {
        connection_id: ConnectionId,
        user_id: UserId,
    },
    /// Read the current room state
    Snapshot { reply: oneshot::Sender<RoomSnapshot> },
}

/// Point-in-time view of a room
#[derive(Debug, Clone, PartialEq)]
pub struct RoomSnapshot {
    pub meta: RoomMetadata,
    pub messages: Vec<MessageRecord>,
    pub connections: usize,
}

/// The room actor
pub struct RoomActor {
    id: RoomId,
    store: ScopedStore,
    meta: RoomMetadata,
    log: MessageLog,
    /// Open connections keyed by user, one per user
    connections: HashMap<UserId, Connection>,
    /// Command receiver channel
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    /// Load the room's persisted state and build the actor
    pub async fn load(
        id: RoomId,
        store: ScopedStore,
        receiver: mpsc::Receiver<RoomCommand>,
    ) -> AppResult<Self> {
        let meta = store.get::<RoomMetadata>(META_KEY).await?.unwrap_or_default();
        let log = store
            .get::<Vec<MessageRecord>>(MESSAGES_KEY)
            .await?
            .map(MessageLog::from)
            .unwrap_or_default();

        debug!(room = %id, messages = log.len(), "Room state loaded");

        Ok(Self {
            id,
            store,
            meta,
            log,
            connections: HashMap::new(),
            receiver,
        })
    }

    /// Run the room event loop
    ///
    /// Continuously receives and processes commands until all senders are dropped.
    pub async fn run(mut self) {
        info!(room = %self.id, "Room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd).await;
        }

        info!(room = %self.id, "Room actor shutting down");
    }

    /// Process a single command
    async fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::SetMetadata { meta, reply } => {
                let _ = reply.send(self.write_metadata(meta).await);
            }
            RoomCommand::InitMetadata { meta, reply } => {
                let _ = reply.send(self.handle_init_metadata(meta).await);
            }
            RoomCommand::UpdateMetadata { patch, reply } => {
                let _ = reply.send(self.handle_update_metadata(patch).await);
            }
            RoomCommand::Open {
                connection_id,
                user_id,
                display_name,
                sender,
            } => {
                self.handle_open(Connection::new(connection_id, user_id, display_name, sender));
            }
            RoomCommand::Incoming { connection_id, raw } => {
                self.handle_incoming(connection_id, &raw).await;
            }
            RoomCommand::Close {
                connection_id,
                user_id,
            } => {
                self.handle_close(connection_id, user_id);
            }
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(RoomSnapshot {
                    meta: self.meta.clone(),
                    messages: self.log.to_vec(),
                    connections: self.connections.len(),
                });
            }
        }
    }

    /// Persist then commit new metadata
    async fn write_metadata(&mut self, meta: RoomMetadata) -> AppResult<()> {
        self.store.put(META_KEY, &meta).await?;
        self.meta = meta;
        debug!(room = %self.id, "Metadata written");
        Ok(())
    }

    async fn handle_init_metadata(&mut self, meta: RoomMetadata) -> AppResult<bool> {
        if self.store.get::<RoomMetadata>(META_KEY).await?.is_some() {
            return Ok(false);
        }
        self.write_metadata(meta).await?;
        Ok(true)
    }

    async fn handle_update_metadata(&mut self, patch: MetadataPatch) -> AppResult<()> {
        let mut meta = self.meta.clone();
        meta.merge(patch);
        self.write_metadata(meta).await
    }

    /// Send a connection the room state and register it
    ///
    /// A connection that cannot take both greeting frames is dropped without
    /// being registered. A previous entry for the same user is replaced;
    /// dropping it stops all further delivery to the old transport.
    fn handle_open(&mut self, conn: Connection) {
        info!(
            room = %self.id,
            user = %conn.user_id,
            display = %conn.display_name,
            "Connection opened"
        );

        // meta strictly before history, both before any live chat
        let greeting = conn
            .send(ServerMessage::Meta {
                meta: self.meta.clone(),
            })
            .and_then(|_| {
                conn.send(ServerMessage::History {
                    messages: self.log.to_vec(),
                })
            });
        if let Err(e) = greeting {
            warn!(room = %self.id, user = %conn.user_id, "Connection not registered: {}", e);
            return;
        }

        if let Some(old) = self.connections.insert(conn.user_id.clone(), conn) {
            debug!(room = %self.id, user = %old.user_id, "Superseded previous connection");
        }

        debug!(room = %self.id, "Open connections: {}", self.connections.len());
    }

    /// Parse and apply one frame from a transport
    async fn handle_incoming(&mut self, connection_id: ConnectionId, raw: &str) {
        let Some(msg) = ClientMessage::parse(raw) else {
            debug!(room = %self.id, connection = %connection_id, "Discarded unparsable frame");
            return;
        };

        match msg {
            ClientMessage::Chat(record) => {
                if let Err(e) = self.handle_chat(record).await {
                    error!(room = %self.id, "Failed to persist chat message: {}", e);
                }
            }
            ClientMessage::MetaUpdate { data } => {
                if let Err(e) = self.handle_update_metadata(data).await {
                    error!(room = %self.id, "Failed to persist metadata update: {}", e);
                }
            }
            ClientMessage::Unknown => {
                debug!(room = %self.id, connection = %connection_id, "Ignored unknown frame type");
            }
        }
    }

    /// Append to the log, persist, then broadcast to every connection
    async fn handle_chat(&mut self, record: MessageRecord) -> AppResult<()> {
        let mut log = self.log.clone();
        log.push(record.clone());
        self.store.put(MESSAGES_KEY, &log).await?;
        self.log = log;

        self.broadcast(ServerMessage::Chat(record));
        Ok(())
    }

    /// Best-effort send to all open connections, sender included
    fn broadcast(&self, msg: ServerMessage) {
        for conn in self.connections.values() {
            if let Err(e) = conn.send(msg.clone()) {
                debug!(room = %self.id, user = %conn.user_id, "Dropped delivery: {}", e);
            }
        }
    }

    /// Remove the user's entry if it still belongs to the closing transport
    fn handle_close(&mut self, connection_id: ConnectionId, user_id: UserId) {
        match self.connections.get(&user_id) {
            Some(current) if current.id == connection_id => {
                self.connections.remove(&user_id);
                info!(room = %self.id, user = %user_id, "Connection closed");
            }
            _ => {
                debug!(room = %self.id, user = %user_id, "Ignored close of stale connection");
            }
        }
    }
}

/// Cloneable address of a running room actor
#[derive(Debug, Clone)]
pub struct RoomHandle {
    id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// Spawn the actor for `id` on its own task and return its handle
    pub fn spawn(id: RoomId, store: &Store, buffer: usize) -> Self {
        let (sender, receiver) = mpsc::channel(buffer);
        let scoped = store.scoped(format!("room:{id}"));
        let task_id = id.clone();

        tokio::spawn(async move {
            match RoomActor::load(task_id.clone(), scoped, receiver).await {
                Ok(actor) => actor.run().await,
                Err(e) => error!(room = %task_id, "Failed to load room: {}", e),
            }
        });

        Self { id, sender }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    /// Whether the actor task has stopped
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn send(&self, cmd: RoomCommand) -> AppResult<()> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| AppError::ActorUnavailable(format!("room {}", self.id)))
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> AppResult<T> {
        let (reply, rx) = oneshot::channel();
        self.send(make(reply)).await?;
        rx.await
            .map_err(|_| AppError::ActorUnavailable(format!("room {}", self.id)))
    }

    pub async fn set_metadata(&self, meta: RoomMetadata) -> AppResult<()> {
        self.request(|reply| RoomCommand::SetMetadata { meta, reply })
            .await?
    }

    pub async fn init_metadata(&self, meta: RoomMetadata) -> AppResult<bool> {
        self.request(|reply| RoomCommand::InitMetadata { meta, reply })
            .await?
    }

    pub async fn update_metadata(&self, patch: MetadataPatch) -> AppResult<()> {
        self.request(|reply| RoomCommand::UpdateMetadata { patch, reply })
            .await?
    }

    pub async fn open(
        &self,
        connection_id: ConnectionId,
        user_id: UserId,
        display_name: String,
        sender: mpsc::Sender<ServerMessage>,
    ) -> AppResult<()> {
        self.send(RoomCommand::Open {
            connection_id,
            user_id,
            display_name,
            sender,
        })
        .await
    }

    pub async fn incoming(&self, connection_id: ConnectionId, raw: String) -> AppResult<()> {
        self.send(RoomCommand::Incoming { connection_id, raw }).await
    }

    pub async fn close(&self, connection_id: ConnectionId, user_id: UserId) -> AppResult<()> {
        self.send(RoomCommand::Close {
            connection_id,
            user_id,
        })
        .await
    }

    pub async fn snapshot(&self) -> AppResult<RoomSnapshot> {
        self.request(|reply| RoomCommand::Snapshot { reply }).await
    }
}
