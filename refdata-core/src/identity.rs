//! Identity and time types for reference-data versions

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use std::sync::RwLock;

/// Stable string key derived from an entity's business fields.
pub type EntityIdentity = String;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Opaque serialized entity payload.
pub type Blob = Vec<u8>;

/// Convert a timestamp to signed nanoseconds since the Unix epoch.
///
/// This is the column-store representation of version times. Timestamps
/// outside the representable range (roughly years 1677..2262) saturate.
pub fn timestamp_to_nanos(ts: Timestamp) -> i64 {
    match ts.timestamp_nanos_opt() {
        Some(nanos) => nanos,
        None if ts.timestamp() < 0 => i64::MIN,
        None => i64::MAX,
    }
}

/// Convert signed nanoseconds since the Unix epoch back to a timestamp.
pub fn timestamp_from_nanos(nanos: i64) -> Timestamp {
    Utc.timestamp_nanos(nanos)
}

/// Source of "now" for write paths.
pub trait Clock: Send + Sync {
    /// Current time as seen by this clock.
    fn now(&self) -> Timestamp;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// Manually driven clock for deterministic tests.
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<Timestamp>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, ts: Timestamp) {
        match self.now.write() {
            Ok(mut now) => *now = ts,
            Err(poisoned) => *poisoned.into_inner() = ts,
        }
    }

    /// Move the clock forward (or backward, for a negative delta).
    pub fn advance(&self, delta: ChronoDuration) {
        let next = self.now() + delta;
        self.set(next);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        match self.now.read() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
