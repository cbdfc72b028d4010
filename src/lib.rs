//! Group and Direct WebSocket Chat Rooms
//!
//! A chat server where users join named rooms, exchange messages over
//! WebSockets, and list the rooms they belong to from any session.
//!
//! # Features
//! - Group rooms with random ids, direct rooms with ids derived from both users
//! - Live fan-out of chat messages to every open connection in a room
//! - Last 200 messages per room replayed to each new connection
//! - Room metadata and history persisted in SQLite
//! - Per-user room directory
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - Each room is a `RoomActor` task owning its connections, metadata and log
//! - A single `Directory` task owns the user → rooms index
//! - `RoomRegistry` maps room ids to actor handles, spawning actors on demand
//! - No locks around room state - all access goes through message passing
//!
//! # Example
//! ```ignore
//! use chat_rooms::{build_router, AppState, Config, Store};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::default();
//!     let store = Store::connect(&config.database_url).await.unwrap();
//!     let app = build_router(AppState::new(store, &config));
//!
//!     let listener = tokio::net::TcpListener::bind(&config.bind_addr).await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

pub mod config;
pub mod connection;
pub mod directory;
pub mod error;
pub mod handler;
pub mod message;
pub mod registry;
pub mod room;
pub mod room_actor;
pub mod router;
pub mod store;
pub mod types;

// Re-export main types for convenience
pub use config::Config;
pub use connection::Connection;
pub use directory::{Directory, DirectoryHandle};
pub use error::{AppError, AppResult, SendError};
pub use message::{ClientMessage, ServerMessage};
pub use registry::RoomRegistry;
pub use room::{MessageLog, MessageRecord, MetadataPatch, RoomMetadata};
pub use room_actor::{RoomActor, RoomHandle, RoomSnapshot};
pub use router::{build_router, AppState};
pub use store::Store;
pub use types::{ConnectionId, RoomId, UserId};
