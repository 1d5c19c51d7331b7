//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::EngineResult;

/// Configuration for a [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Bump the owner's `updated_at` when a save changed only custom values.
    pub touch_on_value_change: bool,
    /// Ask the session's `ReferenceResolver` whether referenced objects exist.
    pub validate_references: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            touch_on_value_change: true,
            validate_references: true,
        }
    }
}

impl EngineConfig {
    /// Parses a JSON document; missing keys keep their defaults.
    pub fn from_json_str(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
