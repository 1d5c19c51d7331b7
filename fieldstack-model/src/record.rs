use fieldstack_types::{OwnerId, Timestamp};
use serde::{Deserialize, Serialize};

/// A record that can carry custom values.
///
/// The record's own columns live in `data` as a JSON object; custom
/// values are stored separately and never appear here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: OwnerId,
    pub entity_type: String,
    pub data: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Record {
    /// Creates a record of `entity_type` with a fresh id.
    pub fn new(entity_type: impl Into<String>, data: serde_json::Value) -> Self {
        let now = Timestamp::now();
        Self {
            id: OwnerId::new(),
            entity_type: entity_type.into(),
            data,
            created_at: now,
            updated_at: now,
        }
    }

    /// Extract a string value from `data` using a JSON pointer (e.g., "/subject").
    pub fn get_str(&self, pointer: &str) -> Option<&str> {
        self.data.pointer(pointer).and_then(|v| v.as_str())
    }

    /// Sets a top-level column. Returns false if `data` is not an object
    /// or the column already held `value`.
    pub fn set(&mut self, key: &str, value: serde_json::Value) -> bool {
        let Some(obj) = self.data.as_object_mut() else {
            return false;
        };
        if obj.get(key) == Some(&value) {
            return false;
        }
        obj.insert(key.to_string(), value);
        true
    }
}
