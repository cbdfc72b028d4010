//! Connection entry definition
//!
//! Represents one user's open transport within a room and its outbound channel.

use tokio::sync::mpsc;

use crate::error::SendError;
use crate::message::ServerMessage;
use crate::types::{ConnectionId, UserId};

/// Open connection in a room
///
/// Lives only in the owning room actor's memory. Dropping it closes the
/// outbound channel, which ends delivery to that transport.
#[derive(Debug)]
pub struct Connection {
    /// Identifier of the transport behind this entry
    pub id: ConnectionId,
    pub user_id: UserId,
    pub display_name: String,
    /// Room → transport message channel
    sender: mpsc::Sender<ServerMessage>,
}

impl Connection {
    pub fn new(
        id: ConnectionId,
        user_id: UserId,
        display_name: String,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Self {
        Self {
            id,
            user_id,
            display_name,
            sender,
        }
    }

    /// Queue a message for this connection without waiting
    ///
    /// Fails if the transport has gone away or its queue is full.
    pub fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.sender.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::ChannelFull,
            mpsc::error::TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }
}
