//! Outbound application events.
//!
//! The [`KioskService`](super::service::KioskService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to the console, forward to the
//! remote document, and so on.

use chrono::Weekday;

use crate::power::PowerState;
use crate::remote::document::{CommandAck, KioskSettings};
use crate::schedule::{DaySchedule, ScheduleAction};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service booted; carries the power state derived from the schedule.
    Started(PowerState),

    /// Action Dispatch moved between power states.  `from` is `None` for the
    /// first dispatch after boot.
    PowerChanged {
        from: Option<PowerState>,
        to: PowerState,
    },

    /// Today's schedule was (re)applied.  `entry` is `None` when no enabled
    /// schedule covers today.
    ScheduleApplied {
        day: Weekday,
        entry: Option<DaySchedule>,
        action: ScheduleAction,
    },

    /// A remote command finished and its ack was produced.
    CommandHandled(CommandAck),

    /// The device moved to another tenant.
    TenantChanged { from: String, to: String },

    /// Brightness and volume from the settings document were applied.
    SettingsApplied(KioskSettings),
}
