//! Durable cache of the most recently received weekly schedule.
//!
//! The document is stored verbatim so what the operator sent is exactly
//! what is re-read after a restart.  Anything unreadable on the way back
//! out is treated as "no schedule": the caller defaults to awake.

use chrono::Weekday;
use log::{debug, info, warn};

use super::{DaySchedule, WeeklySchedule, day_key};
use crate::app::ports::StoragePort;
use crate::error::ScheduleError;
use crate::state::KioskState;

/// Why `load_today` did or did not produce an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayLookup {
    /// Nothing stored, or the stored copy is unreadable.
    NoSchedule,
    /// A schedule is stored but has no entry for the day.
    Missing,
    Disabled(DaySchedule),
    Enabled(DaySchedule),
}

impl DayLookup {
    /// The entry to apply, if the day is enabled.
    pub fn active(self) -> Option<DaySchedule> {
        match self {
            Self::Enabled(day) => Some(day),
            _ => None,
        }
    }
}

pub struct ScheduleStore<S> {
    state: KioskState<S>,
}

impl<S: StoragePort> ScheduleStore<S> {
    pub fn new(state: KioskState<S>) -> Self {
        Self { state }
    }

    /// Validate and persist a schedule document.
    ///
    /// A malformed document is rejected and the previously stored copy
    /// stays in place.  Re-evaluating today is the caller's job (see
    /// [`KioskService::on_schedule_json`](crate::app::service::KioskService::on_schedule_json)).
    pub fn save(&self, json: &str) -> Result<WeeklySchedule, ScheduleError> {
        let schedule = WeeklySchedule::parse(json).inspect_err(|e| {
            warn!("ScheduleStore: rejected schedule: {}", e);
        })?;
        self.state.set_full_schedule(json)?;
        info!("ScheduleStore: full schedule saved ({} bytes)", json.len());
        Ok(schedule)
    }

    /// The stored schedule, or `None` if absent or unreadable.
    pub fn load(&self) -> Option<WeeklySchedule> {
        let json = match self.state.full_schedule() {
            Ok(Some(json)) => json,
            Ok(None) => {
                debug!("ScheduleStore: no schedule stored");
                return None;
            }
            Err(e) => {
                warn!("ScheduleStore: read failed: {}", e);
                return None;
            }
        };
        WeeklySchedule::parse(&json)
            .inspect_err(|e| warn!("ScheduleStore: stored schedule unreadable: {}", e))
            .ok()
    }

    pub fn load_day(&self, weekday: Weekday) -> DayLookup {
        let Some(schedule) = self.load() else {
            return DayLookup::NoSchedule;
        };
        match schedule.day(weekday) {
            None => DayLookup::Missing,
            Some(day) if day.enabled => DayLookup::Enabled(*day),
            Some(day) => DayLookup::Disabled(*day),
        }
    }

    /// Today's entry if one is stored and enabled.
    pub fn load_today(&self, weekday: Weekday) -> Option<DaySchedule> {
        let lookup = self.load_day(weekday);
        match lookup {
            DayLookup::NoSchedule => {}
            DayLookup::Missing => info!("ScheduleStore: no entry for {}", day_key(weekday)),
            DayLookup::Disabled(_) => info!("ScheduleStore: {} is disabled", day_key(weekday)),
            DayLookup::Enabled(day) => debug!(
                "ScheduleStore: {} sleep={} wake={}",
                day_key(weekday),
                day.sleep,
                day.wake
            ),
        }
        lookup.active()
    }
}
