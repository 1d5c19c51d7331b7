//! Wall-clock timestamps for record bookkeeping.
//!
//! Records carry `created_at` / `updated_at` in milliseconds since the
//! Unix epoch. `updated_at` doubles as a cache key for consumers, so a
//! touch must always move it forward, even when two touches land in the
//! same millisecond.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

fn wall_clock_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

impl Timestamp {
    /// Creates a timestamp at the current time.
    #[must_use]
    pub fn now() -> Self {
        Self(wall_clock_millis())
    }

    /// Creates a timestamp from milliseconds since the epoch.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Returns milliseconds since the epoch.
    #[must_use]
    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Returns the timestamp to store after touching a record last
    /// updated at `self`.
    ///
    /// The result is the current time, or `self + 1` if the clock has not
    /// moved past `self` yet.
    #[must_use]
    pub fn touch(&self) -> Self {
        let now = wall_clock_millis();
        if now > self.0 {
            Self(now)
        } else {
            Self(self.0.saturating_add(1))
        }
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
