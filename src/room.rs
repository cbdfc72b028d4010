//! Room state definitions
//!
//! Persisted per-room data: metadata and the bounded message log.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::types::UserId;

/// Maximum number of messages kept in a room's history
pub const HISTORY_CAPACITY: usize = 200;

/// Room metadata
///
/// Created on the first metadata write; before that the room reports the
/// empty default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomMetadata {
    pub name: String,
    pub members: Vec<UserId>,
    pub creator: String,
}

/// Partial metadata update, last write wins per field
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MetadataPatch {
    pub name: Option<String>,
    pub members: Option<Vec<UserId>>,
    pub creator: Option<UserId>,
}

impl RoomMetadata {
    pub fn new(name: String, members: Vec<UserId>, creator: &UserId) -> Self {
        Self {
            name,
            members,
            creator: creator.to_string(),
        }
    }

    /// Merge the fields present in `patch` into this metadata
    pub fn merge(&mut self, patch: MetadataPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(members) = patch.members {
            self.members = members;
        }
        if let Some(creator) = patch.creator {
            self.creator = creator.into();
        }
    }
}

/// One chat message as stored and replayed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub text: String,
    pub sender: UserId,
    /// Epoch millis as sent by the client
    #[serde(rename = "ts")]
    pub timestamp: i64,
}

/// Bounded FIFO message log
///
/// Pushing past `HISTORY_CAPACITY` evicts the oldest record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MessageLog(VecDeque<MessageRecord>);

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record, evicting from the front when over capacity
    pub fn push(&mut self, record: MessageRecord) {
        self.0.push_back(record);
        while self.0.len() > HISTORY_CAPACITY {
            self.0.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Records oldest first
    pub fn to_vec(&self) -> Vec<MessageRecord> {
        self.0.iter().cloned().collect()
    }
}

/// Keeps only the newest `HISTORY_CAPACITY` records
impl From<Vec<MessageRecord>> for MessageLog {
    fn from(records: Vec<MessageRecord>) -> Self {
        let skip = records.len().saturating_sub(HISTORY_CAPACITY);
        Self(records.into_iter().skip(skip).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn record(ts: i64) -> MessageRecord {
        MessageRecord {
            text: format!("message {ts}"),
            sender: user("u1"),
            timestamp: ts,
        }
    }

    #[test]
    fn test_log_evicts_oldest() {
        let mut log = MessageLog::new();
        for ts in 1..=(HISTORY_CAPACITY as i64 + 1) {
            log.push(record(ts));
        }

        assert_eq!(log.len(), HISTORY_CAPACITY);
        let records = log.to_vec();
        assert_eq!(records.first().unwrap().timestamp, 2);
        assert_eq!(records.last().unwrap().timestamp, HISTORY_CAPACITY as i64 + 1);
        assert!(records.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn test_log_from_oversized_vec_keeps_newest() {
        let records: Vec<_> = (0..250).map(record).collect();
        let log = MessageLog::from(records);

        assert_eq!(log.len(), HISTORY_CAPACITY);
        assert_eq!(log.to_vec()[0].timestamp, 50);
    }

    #[test]
    fn test_record_wire_format() {
        let json = serde_json::to_value(record(1000)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"text": "message 1000", "sender": "u1", "ts": 1000})
        );
    }

    #[test]
    fn test_metadata_merge_last_write_wins() {
        let mut meta = RoomMetadata::new("Team".into(), vec![user("u1"), user("u2")], &user("u1"));

        meta.merge(MetadataPatch {
            name: Some("Renamed".into()),
            ..Default::default()
        });

        assert_eq!(meta.name, "Renamed");
        assert_eq!(meta.members, vec![user("u1"), user("u2")]);
        assert_eq!(meta.creator, "u1");
    }

    #[test]
    fn test_metadata_merge_into_empty() {
        let mut meta = RoomMetadata::default();
        let patch: MetadataPatch = serde_json::from_str(r#"{"members": ["u3"]}"#).unwrap();

        meta.merge(patch);

        assert_eq!(meta.members, vec![user("u3")]);
        assert!(meta.name.is_empty());
    }
}
