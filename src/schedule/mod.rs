//! Weekly sleep/wake schedule model.
//!
//! The remote config document is a JSON object keyed by lowercase English
//! day names, each value a [`DaySchedule`]:
//!
//! ```json
//! { "monday": { "enabled": true, "sleep": "23:00", "wake": "07:00" }, ... }
//! ```
//!
//! [`evaluator`] decides what should be in effect at a given instant and
//! [`store`] keeps the last received document across restarts.

pub mod evaluator;
pub mod store;

use core::fmt;
use core::str::FromStr;

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ScheduleError;

pub use evaluator::{evaluate, evaluate_day};
pub use store::{DayLookup, ScheduleStore};

// ═══════════════════════════════════════════════════════════════
//  Time of day
// ═══════════════════════════════════════════════════════════════

/// A 24-hour wall-clock time with minute resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    /// Build from components.  `None` if out of range.
    pub const fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self { hour, minute })
        } else {
            None
        }
    }

    pub const fn hour(self) -> u8 {
        self.hour
    }

    pub const fn minute(self) -> u8 {
        self.minute
    }

    /// Minutes since midnight (0..1440).
    pub const fn minutes(self) -> u16 {
        self.hour as u16 * 60 + self.minute as u16
    }

    /// Truncates seconds and sub-seconds.
    pub fn from_naive(time: NaiveTime) -> Self {
        use chrono::Timelike;
        Self {
            hour: time.hour() as u8,
            minute: time.minute() as u8,
        }
    }

    pub fn to_naive(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour as u32, self.minute as u32, 0).unwrap_or(NaiveTime::MIN)
    }
}

impl FromStr for TimeOfDay {
    type Err = ScheduleError;

    /// Accepts `H:MM` and `HH:MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ScheduleError::InvalidTime(s.to_owned());
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;

        let digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        if !digits(h) || h.len() > 2 || !digits(m) || m.len() != 2 {
            return Err(invalid());
        }

        let hour: u8 = h.parse().map_err(|_| invalid())?;
        let minute: u8 = m.parse().map_err(|_| invalid())?;
        Self::new(hour, minute).ok_or_else(invalid)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = ScheduleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Schedule documents
// ═══════════════════════════════════════════════════════════════

/// One day's sleep/wake window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySchedule {
    /// When false, only the day-switch timer is programmed for this day.
    #[serde(default)]
    pub enabled: bool,
    pub sleep: TimeOfDay,
    pub wake: TimeOfDay,
}

/// The full weekly schedule.  Absent days mean "no schedule that day".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklySchedule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monday: Option<DaySchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tuesday: Option<DaySchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wednesday: Option<DaySchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thursday: Option<DaySchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friday: Option<DaySchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saturday: Option<DaySchedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunday: Option<DaySchedule>,
}

impl WeeklySchedule {
    /// Parse and validate a weekly schedule document.
    ///
    /// The top level must be a JSON object.  Unknown keys are ignored; a
    /// present day entry must carry valid `sleep` and `wake` times.
    pub fn parse(json: &str) -> Result<Self, ScheduleError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| ScheduleError::Malformed(e.to_string()))?;
        if !value.is_object() {
            return Err(ScheduleError::Malformed("top level is not an object".into()));
        }
        serde_json::from_value(value).map_err(|e| ScheduleError::Malformed(e.to_string()))
    }

    /// Same entry for every day of the week.
    pub fn every_day(entry: DaySchedule) -> Self {
        Self {
            monday: Some(entry),
            tuesday: Some(entry),
            wednesday: Some(entry),
            thursday: Some(entry),
            friday: Some(entry),
            saturday: Some(entry),
            sunday: Some(entry),
        }
    }

    /// Schedule seeded into an empty remote document: every day present but
    /// disabled, 23:00 → 07:00.
    pub fn seed() -> Self {
        Self::every_day(DaySchedule {
            enabled: false,
            sleep: TimeOfDay { hour: 23, minute: 0 },
            wake: TimeOfDay { hour: 7, minute: 0 },
        })
    }

    pub fn day(&self, weekday: Weekday) -> Option<&DaySchedule> {
        self.slot(weekday).as_ref()
    }

    pub fn set_day(&mut self, weekday: Weekday, entry: Option<DaySchedule>) {
        *self.slot_mut(weekday) = entry;
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".into())
    }

    fn slot(&self, weekday: Weekday) -> &Option<DaySchedule> {
        match weekday {
            Weekday::Mon => &self.monday,
            Weekday::Tue => &self.tuesday,
            Weekday::Wed => &self.wednesday,
            Weekday::Thu => &self.thursday,
            Weekday::Fri => &self.friday,
            Weekday::Sat => &self.saturday,
            Weekday::Sun => &self.sunday,
        }
    }

    fn slot_mut(&mut self, weekday: Weekday) -> &mut Option<DaySchedule> {
        match weekday {
            Weekday::Mon => &mut self.monday,
            Weekday::Tue => &mut self.tuesday,
            Weekday::Wed => &mut self.wednesday,
            Weekday::Thu => &mut self.thursday,
            Weekday::Fri => &mut self.friday,
            Weekday::Sat => &mut self.saturday,
            Weekday::Sun => &mut self.sunday,
        }
    }
}

/// Lowercase English key used in schedule documents.
pub fn day_key(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

// ═══════════════════════════════════════════════════════════════
//  Evaluation result
// ═══════════════════════════════════════════════════════════════

/// The action that should be in effect at an instant.  Recomputed on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScheduleAction {
    Sleep,
    Wake,
}

impl ScheduleAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sleep => "sleep",
            Self::Wake => "wake",
        }
    }
}
