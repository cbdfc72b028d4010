//! Identifier types for the chat server
//!
//! Provides newtype wrappers for type safety:
//! - `UserId`: client-generated opaque user identifier
//! - `RoomId`: room identifier, random for groups and deterministic for direct rooms
//! - `ConnectionId`: UUID-based identifier of one open transport

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Prefix of generated group room identifiers
const GROUP_ROOM_PREFIX: &str = "room_";

/// Prefix of deterministic direct room identifiers
const DIRECT_ROOM_PREFIX: &str = "dm_";

/// Opaque user identifier (newtype pattern)
///
/// Users pick their own ids client-side; the server only requires a
/// non-empty string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Create a user id, rejecting blank input
    pub fn new(id: impl Into<String>) -> Result<Self, AppError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(AppError::InvalidRequest("user id must not be empty".to_string()));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = AppError;

    fn try_from(id: String) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Room identifier
///
/// Group rooms get a random `room_<uuid>` id. Direct rooms are derived from
/// their two participants so both sides compute the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomId(String);

impl RoomId {
    /// Wrap an existing room id, rejecting blank input
    pub fn new(id: impl Into<String>) -> Result<Self, AppError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(AppError::InvalidRequest("room id must not be empty".to_string()));
        }
        Ok(Self(id))
    }

    /// Generate a fresh group room id
    pub fn generate() -> Self {
        Self(format!("{GROUP_ROOM_PREFIX}{}", Uuid::new_v4()))
    }

    /// Direct room id for a pair of users
    ///
    /// Order of arguments does not matter.
    pub fn direct(a: &UserId, b: &UserId) -> Self {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Self(format!("{DIRECT_ROOM_PREFIX}{first}_{second}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoomId {
    type Error = AppError;

    fn try_from(id: String) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl From<RoomId> for String {
    fn from(id: RoomId) -> Self {
        id.0
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of one open transport
///
/// Distinguishes a user's current connection from a superseded one, so a
/// late close event from the old transport can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random connection ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
