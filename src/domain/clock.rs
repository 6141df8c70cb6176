//! Monotonic bar counter.

use chrono::{DateTime, Utc};

/// Advances exactly once per distinct, strictly newer closed-bar timestamp.
#[derive(Debug, Clone, Default)]
pub struct BarClock {
    current: u64,
    last_time: Option<DateTime<Utc>>,
}

impl BarClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the new bar index, or `None` when `time` is not newer than the
    /// last accepted bar (a re-poll of the same bar, or an out-of-order one).
    pub fn advance(&mut self, time: DateTime<Utc>) -> Option<u64> {
        if let Some(last) = self.last_time {
            if time <= last {
                return None;
            }
        }
        self.last_time = Some(time);
        self.current += 1;
        Some(self.current)
    }
}
