//! Action dispatch: turns a [`ScheduleAction`] into a screen lock or wake.
//!
//! ```text
//!               apply(Sleep) ok
//!   None ──┬──────────────────────▶ Asleep ◀─┐
//!          │    apply(Wake) ok               │ apply(Sleep) ok
//!          └──────────────────────▶ Awake  ──┘
//!
//!   apply(Wake) err ──▶ retry armed ──tick(now >= due)──▶ one more wake
//! ```
//!
//! The primitive always runs, even when the state already matches: both
//! lock and wake are idempotent on the device, and a lock that silently
//! failed earlier gets another chance.

use chrono::{Duration, NaiveDateTime};
use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{EventSink, PlatformError, ScreenLockController, WakeController};
use crate::schedule::ScheduleAction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerState {
    Awake,
    Asleep,
}

impl PowerState {
    pub fn for_action(action: ScheduleAction) -> Self {
        match action {
            ScheduleAction::Sleep => Self::Asleep,
            ScheduleAction::Wake => Self::Awake,
        }
    }
}

pub struct PowerDispatcher {
    /// `None` until the first successful dispatch.
    state: Option<PowerState>,
    retry_delay: Duration,
    /// When the single wake retry is due, if one is armed.
    wake_retry_at: Option<NaiveDateTime>,
}

impl PowerDispatcher {
    pub fn new(wake_retry_delay_ms: u32) -> Self {
        Self {
            state: None,
            retry_delay: Duration::milliseconds(i64::from(wake_retry_delay_ms)),
            wake_retry_at: None,
        }
    }

    pub fn state(&self) -> Option<PowerState> {
        self.state
    }

    pub fn wake_retry_at(&self) -> Option<NaiveDateTime> {
        self.wake_retry_at
    }

    /// Put `action` into effect now.
    pub fn apply(
        &mut self,
        action: ScheduleAction,
        now: NaiveDateTime,
        hw: &mut (impl ScreenLockController + WakeController),
        sink: &mut impl EventSink,
    ) -> Result<(), PlatformError> {
        // Any new decision supersedes a pending retry.
        self.wake_retry_at = None;

        let result = run(action, hw);
        match &result {
            Ok(()) => self.transition(PowerState::for_action(action), sink),
            Err(e) => match action {
                ScheduleAction::Wake => {
                    let at = now + self.retry_delay;
                    warn!("Power: wake failed ({}), retrying at {}", e, at.time());
                    self.wake_retry_at = Some(at);
                }
                ScheduleAction::Sleep => warn!("Power: lock failed ({})", e),
            },
        }
        result
    }

    /// Run the pending wake retry if it is due.  `None` when nothing ran.
    pub fn tick(
        &mut self,
        now: NaiveDateTime,
        hw: &mut (impl ScreenLockController + WakeController),
        sink: &mut impl EventSink,
    ) -> Option<Result<(), PlatformError>> {
        let due = self.wake_retry_at.filter(|at| *at <= now)?;
        self.wake_retry_at = None;
        info!("Power: retrying wake scheduled for {}", due.time());

        let result = run(ScheduleAction::Wake, hw);
        match &result {
            Ok(()) => self.transition(PowerState::Awake, sink),
            Err(e) => warn!("Power: wake retry failed ({}), giving up", e),
        }
        Some(result)
    }

    fn transition(&mut self, to: PowerState, sink: &mut impl EventSink) {
        let from = self.state;
        self.state = Some(to);
        if from != Some(to) {
            info!("Power: {:?} -> {:?}", from, to);
            sink.emit(&AppEvent::PowerChanged { from, to });
        }
    }
}

fn run(
    action: ScheduleAction,
    hw: &mut (impl ScreenLockController + WakeController),
) -> Result<(), PlatformError> {
    match action {
        ScheduleAction::Sleep => hw.lock_screen(),
        ScheduleAction::Wake => hw.wake_screen(),
    }
}
