//! Periodic liveness marker on the device document.

use log::debug;

use super::document::heartbeat_patch;
use crate::app::ports::Document;

/// Decides when the next heartbeat is due.
pub struct Heartbeat {
    interval_ms: i64,
    last_ms: Option<i64>,
}

impl Heartbeat {
    pub fn new(interval_secs: u32) -> Self {
        Self {
            interval_ms: i64::from(interval_secs) * 1000,
            last_ms: None,
        }
    }

    /// The heartbeat patch if one is due at `now_ms`.  The first call is
    /// always due.  A clock that jumps backwards restarts the interval.
    pub fn poll(&mut self, now_ms: i64) -> Option<Document> {
        let due = match self.last_ms {
            None => true,
            Some(last) if now_ms < last => true,
            Some(last) => now_ms - last >= self.interval_ms,
        };
        if !due {
            return None;
        }
        self.last_ms = Some(now_ms);
        debug!("Heartbeat: due at {}", now_ms);
        Some(heartbeat_patch(now_ms))
    }
}
