//! Sleep/wake window evaluation.
//!
//! Pure functions: given the sleep and wake times of a day and the current
//! time, decide which action should be in effect.  All three values are
//! compared as minutes since midnight.
//!
//! ```text
//!   S > W  (overnight, e.g. 21:00 → 07:00)   Sleep iff N >= S || N < W
//!   S <= W (same day,  e.g. 02:00 → 23:00)   Sleep iff N >= S && N < W
//! ```
//!
//! With `S == W` the same-day branch can never be satisfied, so a
//! zero-width window always evaluates to `Wake`.

use chrono::NaiveTime;

use super::{DaySchedule, ScheduleAction, TimeOfDay};

/// Decide whether `now` falls inside the sleep window.
pub fn evaluate(sleep: TimeOfDay, wake: TimeOfDay, now: TimeOfDay) -> ScheduleAction {
    let (s, w, n) = (sleep.minutes(), wake.minutes(), now.minutes());

    let asleep = if s > w {
        n >= s || n < w
    } else {
        n >= s && n < w
    };

    if asleep {
        ScheduleAction::Sleep
    } else {
        ScheduleAction::Wake
    }
}

/// Evaluate a day entry at a wall-clock time (seconds are ignored).
///
/// The `enabled` flag is not consulted here; callers decide what a
/// disabled day means.
pub fn evaluate_day(day: &DaySchedule, now: NaiveTime) -> ScheduleAction {
    evaluate(day.sleep, day.wake, TimeOfDay::from_naive(now))
}
