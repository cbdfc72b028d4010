//! WebSocket connection handler
//!
//! Bridges one upgraded socket to its room actor: frames read from the
//! socket become room commands, messages from the room are written back.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::config::MIN_CONNECTION_BUFFER;
use crate::message::ServerMessage;
use crate::room_actor::RoomHandle;
use crate::types::{ConnectionId, UserId};

/// Drive an upgraded socket until the client goes away
///
/// The socket's lifetime follows the read side. If the room drops this
/// connection's entry (a newer connection for the same user replaced it),
/// only the write side stops; the socket stays open until the client closes.
pub async fn handle_socket(
    socket: WebSocket,
    room: RoomHandle,
    user_id: UserId,
    display_name: String,
    buffer: usize,
) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let connection_id = ConnectionId::new();

    // Create channel for room -> client messages
    let buffer = buffer.max(MIN_CONNECTION_BUFFER);
    let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(buffer);

    if let Err(e) = room
        .open(connection_id, user_id.clone(), display_name, msg_tx)
        .await
    {
        error!(room = %room.id(), user = %user_id, "Failed to register connection: {}", e);
        return;
    }

    // Spawn write task (ServerMessage -> WebSocket)
    let write_task = tokio::spawn(async move {
        while let Some(msg) = msg_rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json.into())).await.is_err() {
                        debug!("WebSocket send failed, ending write task");
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to serialize message: {}", e);
                    // Continue - don't break on serialization errors
                }
            }
        }
        debug!("Write task ended for connection");
    });

    // Read loop (WebSocket -> RoomCommand)
    while let Some(msg_result) = ws_receiver.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                if room
                    .incoming(connection_id, text.as_str().to_owned())
                    .await
                    .is_err()
                {
                    debug!("Room closed, ending read loop for {}", connection_id);
                    break;
                }
            }
            Ok(Message::Close(_)) => {
                debug!("Connection {} sent close frame", connection_id);
                break;
            }
            Ok(_) => {
                // Binary, ping and pong frames - ignore
            }
            Err(e) => {
                debug!("WebSocket error for {}: {}", connection_id, e);
                break;
            }
        }
    }

    write_task.abort();

    let _ = room.close(connection_id, user_id.clone()).await;

    info!(room = %room.id(), user = %user_id, "Socket closed");
}
