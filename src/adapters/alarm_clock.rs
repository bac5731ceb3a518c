//! In-process alarm table.
//!
//! Implements [`AlarmScheduler`] for hosts without an OS alarm service.
//! The daemon polls [`AlarmClock::take_due`] every loop iteration.
//!
//! Due alarms come out ordered by their nominal time, then by id, so
//! catching up on several missed triggers replays them in the order the
//! schedule meant them to happen.

use chrono::NaiveDateTime;
use heapless::Vec;
use log::debug;

use crate::app::ports::{AlarmId, AlarmRequest, AlarmScheduler, PlatformError};

/// One slot per [`AlarmId`], plus headroom.
pub const MAX_ALARMS: usize = 4;

#[derive(Debug, Default)]
pub struct AlarmClock {
    alarms: Vec<AlarmRequest, MAX_ALARMS>,
}

impl AlarmClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return every alarm with `fire_at <= now`.
    pub fn take_due(&mut self, now: NaiveDateTime) -> Vec<AlarmRequest, MAX_ALARMS> {
        let mut due: Vec<AlarmRequest, MAX_ALARMS> = Vec::new();
        self.alarms.retain(|a| {
            if a.fire_at <= now {
                // Capacity matches the table, so this cannot overflow.
                let _ = due.push(*a);
                false
            } else {
                true
            }
        });
        due.sort_unstable_by_key(|a| (a.nominal, a.id));
        due
    }

    /// Earliest pending fire time.
    pub fn next_fire(&self) -> Option<NaiveDateTime> {
        self.alarms.iter().map(|a| a.fire_at).min()
    }

    pub fn get(&self, id: AlarmId) -> Option<&AlarmRequest> {
        self.alarms.iter().find(|a| a.id == id)
    }

    pub fn len(&self) -> usize {
        self.alarms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alarms.is_empty()
    }
}

impl AlarmScheduler for AlarmClock {
    fn program(&mut self, alarm: AlarmRequest) -> Result<(), PlatformError> {
        self.alarms.retain(|a| a.id != alarm.id);
        self.alarms
            .push(alarm)
            .map_err(|_| PlatformError::Failed("alarm table full".into()))?;
        debug!("AlarmClock: {} at {}", alarm.id.tag(), alarm.fire_at);
        Ok(())
    }

    fn cancel(&mut self, id: AlarmId) {
        self.alarms.retain(|a| a.id != id);
    }
}
