//! Wall-clock time adapter.
//!
//! Provides local wall-clock readings for scheduling and epoch
//! milliseconds for remote timestamps.
//!
//! - [`LocalClock`] reads the host clock in the host's time zone.
//! - [`FixedOffsetClock`] pins a UTC offset, for hosts whose zone database
//!   does not match the kiosk's location.

use chrono::{FixedOffset, Local, Utc};

use crate::app::ports::{ClockReading, TimePort};

/// Host clock in the host's configured time zone.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalClock;

impl LocalClock {
    pub fn new() -> Self {
        Self
    }
}

impl TimePort for LocalClock {
    fn now(&self) -> ClockReading {
        let now = Local::now();
        ClockReading {
            local: now.naive_local(),
            epoch_ms: now.timestamp_millis(),
        }
    }
}

/// Host clock shifted to a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct FixedOffsetClock {
    offset: FixedOffset,
}

impl FixedOffsetClock {
    /// `None` if the offset is out of range (±24h).
    pub fn new(offset_secs: i32) -> Option<Self> {
        FixedOffset::east_opt(offset_secs).map(|offset| Self { offset })
    }
}

impl TimePort for FixedOffsetClock {
    fn now(&self) -> ClockReading {
        let now = Utc::now().with_timezone(&self.offset);
        ClockReading {
            local: now.naive_local(),
            epoch_ms: now.timestamp_millis(),
        }
    }
}
