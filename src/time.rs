use std::sync::{Arc, Mutex};

use chrono::Duration;
use serde::Deserialize;

use crate::model::{now, Timestamp};

/// Source of the current time for the view recorder.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        now()
    }
}

/// A clock that only moves when told to. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<Mutex<Timestamp>>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current = *current + by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Minimum time between two counted views of the same (resource, user) pair.
///
/// Deserializes from a whole number of minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(from = "u32")]
pub struct DebounceWindow(Duration);

impl DebounceWindow {
    pub fn minutes(minutes: u32) -> Self {
        Self(Duration::minutes(minutes.into()))
    }

    pub fn duration(self) -> Duration {
        self.0
    }

    /// Whether a view at `now` should be counted given the last counted view at `last`.
    pub fn has_elapsed(self, last: Timestamp, now: Timestamp) -> bool {
        now - last >= self.0
    }
}

impl Default for DebounceWindow {
    fn default() -> Self {
        Self::minutes(15)
    }
}

impl From<u32> for DebounceWindow {
    fn from(minutes: u32) -> Self {
        Self::minutes(minutes)
    }
}
