//! Alarm scheduling engine.
//!
//! Translates a day's sleep/wake window into concrete OS timers through the
//! [`AlarmScheduler`] port, and keeps a self-rescheduling day-switch timer
//! that rolls the schedule over at local midnight.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    ScheduleStore (today)                     │
//! │                            │                                 │
//! │                            ▼                                 │
//! │  ┌───────────────────────────────────────────────────────┐   │
//! │  │                   ScheduleManager                     │   │
//! │  │  cancel → program Sleep + Wake   ·   evaluate(now)    │   │
//! │  └────────┬───────────────────────────────┬──────────────┘   │
//! │           │                               │                  │
//! │           ▼                               ▼                  │
//! │   AlarmScheduler port             PowerDispatcher (now)      │
//! │   kiosk.sleep · kiosk.wake                                   │
//! │   kiosk.day_switch @ 00:00:05 ──▶ apply_today (next day)     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Timers are always cancelled before they are reprogrammed, so applying
//! the same schedule twice never leaves a stale duplicate behind.

use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Weekday};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{AlarmId, AlarmRequest, AlarmScheduler, StoragePort};
use crate::config::KioskConfig;
use crate::schedule::{DaySchedule, ScheduleAction, ScheduleStore, TimeOfDay, evaluate_day};

// ═══════════════════════════════════════════════════════════════
//  Policy
// ═══════════════════════════════════════════════════════════════

/// What to do with a trigger time that has already passed today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PastTriggerPolicy {
    /// Fire right away.  Paired with the immediate evaluate-and-apply of
    /// [`ScheduleManager::apply_today`], so nothing waits on the timer.
    #[default]
    FireImmediately,
    /// Move the trigger to the same time tomorrow.
    RollToTomorrow,
}

/// Outcome of applying today's schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TodayPlan {
    pub day: Weekday,
    /// `None` when no enabled schedule covers today.
    pub entry: Option<DaySchedule>,
    /// What should be in effect right now.
    pub action: ScheduleAction,
}

// ═══════════════════════════════════════════════════════════════
//  Engine
// ═══════════════════════════════════════════════════════════════

pub struct ScheduleManager {
    policy: PastTriggerPolicy,
    /// Delay after local midnight at which the day-switch timer fires.
    day_switch_offset: Duration,
}

impl ScheduleManager {
    pub fn new(policy: PastTriggerPolicy, day_switch_offset_secs: u32) -> Self {
        Self {
            policy,
            day_switch_offset: Duration::seconds(day_switch_offset_secs as i64),
        }
    }

    pub fn from_config(config: &KioskConfig) -> Self {
        Self::new(config.past_trigger_policy, config.day_switch_offset_secs)
    }

    pub fn policy(&self) -> PastTriggerPolicy {
        self.policy
    }

    /// The timer request for `time` on the calendar day of `now`.
    pub fn trigger_for(&self, id: AlarmId, time: TimeOfDay, now: NaiveDateTime) -> AlarmRequest {
        let today = now.date().and_time(time.to_naive());
        let (nominal, fire_at) = if today >= now {
            (today, today)
        } else {
            match self.policy {
                PastTriggerPolicy::FireImmediately => (today, now),
                PastTriggerPolicy::RollToTomorrow => {
                    let tomorrow = today + Duration::days(1);
                    (tomorrow, tomorrow)
                }
            }
        };
        AlarmRequest {
            id,
            nominal,
            fire_at,
            wake_device: true,
        }
    }

    /// Cancel any programmed sleep/wake timers, then program exactly one of
    /// each for the current day.
    pub fn apply_schedule(
        &self,
        sleep: TimeOfDay,
        wake: TimeOfDay,
        now: NaiveDateTime,
        alarms: &mut impl AlarmScheduler,
    ) {
        self.cancel_transitions(alarms);

        for (id, time) in [(AlarmId::Sleep, sleep), (AlarmId::Wake, wake)] {
            let request = self.trigger_for(id, time, now);
            match alarms.program(request) {
                Ok(()) => info!(
                    "Scheduler: {} set for {} (fires {}, past={})",
                    id.tag(),
                    request.nominal,
                    request.fire_at,
                    request.nominal.date().and_time(time.to_naive()) < now
                ),
                Err(e) => warn!("Scheduler: programming {} failed: {}", id.tag(), e),
            }
        }
    }

    /// The next local `00:00:00 + offset` strictly after `now`.
    pub fn next_day_switch(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date().and_time(NaiveTime::MIN) + self.day_switch_offset;
        if today > now {
            today
        } else {
            today + Duration::days(1)
        }
    }

    /// Program (or re-program) the day-switch timer.
    pub fn schedule_day_switch(&self, now: NaiveDateTime, alarms: &mut impl AlarmScheduler) {
        let at = self.next_day_switch(now);
        let request = AlarmRequest {
            id: AlarmId::DaySwitch,
            nominal: at,
            fire_at: at,
            wake_device: true,
        };
        match alarms.program(request) {
            Ok(()) => info!("Scheduler: day switch set for {}", at),
            Err(e) => warn!("Scheduler: programming day switch failed: {}", e),
        }
    }

    /// Cancel the sleep and wake timers, leaving the day switch alone.
    pub fn cancel_transitions(&self, alarms: &mut impl AlarmScheduler) {
        alarms.cancel(AlarmId::Sleep);
        alarms.cancel(AlarmId::Wake);
    }

    /// Cancel every timer class.  Safe to call with nothing programmed.
    pub fn cancel_all(&self, alarms: &mut impl AlarmScheduler) {
        for id in AlarmId::ALL {
            alarms.cancel(id);
        }
        info!("Scheduler: all schedule alarms cancelled");
    }

    /// Program today's timers from the stored schedule and decide what
    /// should be in effect right now.
    ///
    /// A missing, disabled or unreadable entry leaves only the day-switch
    /// timer active and resolves to [`ScheduleAction::Wake`].
    pub fn apply_today<S: StoragePort>(
        &self,
        store: &ScheduleStore<S>,
        now: NaiveDateTime,
        alarms: &mut impl AlarmScheduler,
    ) -> TodayPlan {
        let day = now.date().weekday();
        match store.load_today(day) {
            Some(entry) => {
                self.apply_schedule(entry.sleep, entry.wake, now, alarms);
                let action = evaluate_day(&entry, now.time());
                info!(
                    "Scheduler: {:?} sleep={} wake={} now={} -> {}",
                    day,
                    entry.sleep,
                    entry.wake,
                    now.time().format("%H:%M"),
                    action.as_str()
                );
                TodayPlan {
                    day,
                    entry: Some(entry),
                    action,
                }
            }
            None => {
                self.cancel_transitions(alarms);
                info!("Scheduler: no active schedule for {:?}, staying awake", day);
                TodayPlan {
                    day,
                    entry: None,
                    action: ScheduleAction::Wake,
                }
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
