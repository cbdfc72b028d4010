//! Server configuration
//!
//! Read from the command line and environment (a `.env` file is loaded by
//! the binary before this runs).

use std::env;

/// Default server address
pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Default database location
pub const DEFAULT_DATABASE_URL: &str = "sqlite://chat.db?mode=rwc";

/// Channel buffer size for actor commands
const DEFAULT_COMMAND_BUFFER: usize = 256;

/// Channel buffer size for room → connection messages
const DEFAULT_CONNECTION_BUFFER: usize = 64;

/// A new connection's queue must hold the meta and history frames
pub const MIN_CONNECTION_BUFFER: usize = 2;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_url: String,
    pub command_buffer: usize,
    pub connection_buffer: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_ADDR.to_string(),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            command_buffer: DEFAULT_COMMAND_BUFFER,
            connection_buffer: DEFAULT_CONNECTION_BUFFER,
        }
    }
}

impl Config {
    /// Bind address from the first argument or `CHAT_BIND_ADDR`, the rest
    /// from `CHAT_*` variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: env::args()
                .nth(1)
                .or_else(|| env::var("CHAT_BIND_ADDR").ok())
                .unwrap_or(defaults.bind_addr),
            database_url: env::var("CHAT_DATABASE_URL").unwrap_or(defaults.database_url),
            command_buffer: parse_buffer(env::var("CHAT_COMMAND_BUFFER").ok(), 1)
                .unwrap_or(defaults.command_buffer),
            connection_buffer: parse_buffer(
                env::var("CHAT_CONNECTION_BUFFER").ok(),
                MIN_CONNECTION_BUFFER,
            )
            .unwrap_or(defaults.connection_buffer),
        }
    }
}

/// Buffer size of at least `min`; unset, invalid or too small values are ignored
fn parse_buffer(value: Option<String>, min: usize) -> Option<usize> {
    value
        .and_then(|v| v.parse().ok())
        .filter(|&n| n >= min)
}
