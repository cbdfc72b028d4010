//! Error types for the chat server
//!
//! Defines application-level errors and per-connection send errors.
//! Uses thiserror for ergonomic error definitions.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::types::RoomId;

pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors
///
/// `InvalidRequest` is the caller's fault and maps to 400; everything else
/// maps to 500.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or malformed required field
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Durable store error
    #[error("Storage error: {0}")]
    Store(#[from] sqlx::Error),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// The addressed actor task has stopped
    #[error("Actor unavailable: {0}")]
    ActorUnavailable(String),

    /// Room metadata was written but directory registration failed
    #[error("Room {room_id} created but not registered: {source}")]
    PartialCreate {
        room_id: RoomId,
        #[source]
        source: Box<AppError>,
    },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = match self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (code, self.to_string()).into_response()
    }
}

/// Message send errors
///
/// Occurs when delivering an event to one connection's outbound queue.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,

    /// The connection is not draining its queue fast enough
    #[error("Channel full")]
    ChannelFull,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let bad = AppError::InvalidRequest("missing user".into()).into_response();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let down = AppError::ActorUnavailable("directory".into()).into_response();
        assert_eq!(down.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
