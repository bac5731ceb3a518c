//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events
//! through the `log` facade.  The daemon routes them to stderr.

use log::info;

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::schedule::day_key;

/// Adapter that logs every [`AppEvent`].
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(state) => {
                info!("START | initial_state={:?}", state);
            }
            AppEvent::PowerChanged { from, to } => {
                info!("POWER | {:?} -> {:?}", from, to);
            }
            AppEvent::ScheduleApplied { day, entry, action } => match entry {
                Some(e) => info!(
                    "SCHED | {} sleep={} wake={} -> {}",
                    day_key(*day),
                    e.sleep,
                    e.wake,
                    action.as_str()
                ),
                None => info!("SCHED | {} inactive -> {}", day_key(*day), action.as_str()),
            },
            AppEvent::CommandHandled(ack) => {
                info!(
                    "CMD   | id={} status={:?} msg={}",
                    ack.last_command_id, ack.last_command_status, ack.last_command_message
                );
            }
            AppEvent::TenantChanged { from, to } => {
                info!("TENANT| {} -> {}", from, to);
            }
            AppEvent::SettingsApplied(s) => {
                info!(
                    "DISP  | brightness={} volume={} volume_locked={}",
                    s.brightness, s.volume, s.volume_locked
                );
            }
        }
    }
}
