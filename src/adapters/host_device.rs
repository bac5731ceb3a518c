//! Host device adapter.
//!
//! Implements every device-facing port for a kiosk driven from a regular
//! host: each primitive runs an optional shell hook from
//! [`HostHooks`], and alarms are kept in an in-process [`AlarmClock`].
//!
//! | Primitive   | Hook         | Environment                    |
//! |-------------|--------------|--------------------------------|
//! | lock screen | `lock`       | –                              |
//! | wake screen | `wake`       | –                              |
//! | reload      | `reload`     | –                              |
//! | open url    | `open_url`   | `KIOSK_URL`: target page       |
//! | update      | `update`     | `KIOSK_URL`: package           |
//! | brightness  | `brightness` | `KIOSK_VALUE`: 0–255           |
//! | volume      | `volume`     | `KIOSK_VALUE`: percent 0–100   |
//!
//! A missing hook is logged and counts as success, so the agent runs
//! unattended on a development machine.

use std::process::Command;

use log::{info, warn};

use super::alarm_clock::AlarmClock;
use crate::app::ports::{
    AlarmId, AlarmRequest, AlarmScheduler, ContentController, DisplaySettingsController,
    PlatformError, ScreenLockController, UpdateInstaller, WakeController,
};
use crate::config::HostHooks;

pub struct HostDevice {
    hooks: HostHooks,
    alarms: AlarmClock,
}

impl HostDevice {
    pub fn new(hooks: HostHooks) -> Self {
        Self {
            hooks,
            alarms: AlarmClock::new(),
        }
    }

    pub fn alarms(&self) -> &AlarmClock {
        &self.alarms
    }

    pub fn alarms_mut(&mut self) -> &mut AlarmClock {
        &mut self.alarms
    }
}

fn run_hook(
    name: &str,
    hook: Option<&str>,
    env: Option<(&str, &str)>,
) -> Result<(), PlatformError> {
    let Some(line) = hook else {
        info!("HostDevice: {} (no hook configured)", name);
        return Ok(());
    };

    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(line);
    if let Some((key, value)) = env {
        cmd.env(key, value);
    }
    let status = cmd.status().map_err(|e| {
        warn!("HostDevice: {} hook could not start: {}", name, e);
        PlatformError::Failed(format!("{} hook: {}", name, e))
    })?;
    if status.success() {
        info!("HostDevice: {} hook ok", name);
        Ok(())
    } else {
        Err(PlatformError::Failed(format!("{} hook {}", name, status)))
    }
}

impl ScreenLockController for HostDevice {
    fn lock_screen(&mut self) -> Result<(), PlatformError> {
        run_hook("lock", self.hooks.lock.as_deref(), None)
    }
}

impl WakeController for HostDevice {
    fn wake_screen(&mut self) -> Result<(), PlatformError> {
        run_hook("wake", self.hooks.wake.as_deref(), None)
    }
}

impl ContentController for HostDevice {
    fn reload(&mut self) -> Result<(), PlatformError> {
        run_hook("reload", self.hooks.reload.as_deref(), None)
    }

    fn open_url(&mut self, url: &str) -> Result<(), PlatformError> {
        run_hook("open_url", self.hooks.open_url.as_deref(), Some(("KIOSK_URL", url)))
    }
}

impl DisplaySettingsController for HostDevice {
    fn set_brightness(&mut self, level: u8) -> Result<(), PlatformError> {
        let value = level.to_string();
        run_hook("brightness", self.hooks.brightness.as_deref(), Some(("KIOSK_VALUE", value.as_str())))
    }

    fn set_volume(&mut self, percent: u8) -> Result<(), PlatformError> {
        let value = percent.to_string();
        run_hook("volume", self.hooks.volume.as_deref(), Some(("KIOSK_VALUE", value.as_str())))
    }
}

impl UpdateInstaller for HostDevice {
    fn start_update(&mut self, url: &str) -> Result<(), PlatformError> {
        run_hook("update", self.hooks.update.as_deref(), Some(("KIOSK_URL", url)))
    }
}

impl AlarmScheduler for HostDevice {
    fn program(&mut self, alarm: AlarmRequest) -> Result<(), PlatformError> {
        self.alarms.program(alarm)
    }

    fn cancel(&mut self, id: AlarmId) {
        self.alarms.cancel(id);
    }
}
