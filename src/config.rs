//! Agent configuration parameters
//!
//! All tunable parameters of the kiosk agent.  Persisted through
//! [`ConfigPort`](crate::app::ports::ConfigPort); the daemon additionally
//! overlays an optional `config.json` from its data directory.

use serde::{Deserialize, Serialize};

pub use crate::scheduler::PastTriggerPolicy;

/// Optional shell command lines run by the host device adapter.
///
/// An absent hook means the primitive is only logged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostHooks {
    pub lock: Option<String>,
    pub wake: Option<String>,
    pub reload: Option<String>,
    /// Receives the URL as `$KIOSK_URL`.
    pub open_url: Option<String>,
    /// Receives the package URL as `$KIOSK_URL`.
    pub update: Option<String>,
    /// Receives the backlight level (0–255) as `$KIOSK_VALUE`.
    pub brightness: Option<String>,
    /// Receives the volume percentage as `$KIOSK_VALUE`.
    pub volume: Option<String>,
}

/// Core agent configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KioskConfig {
    // --- Identity ---
    /// Tenant used until one is assigned remotely
    pub default_tenant: String,
    /// Model name, also the device id prefix
    pub device_model: String,

    // --- Content ---
    /// Tenant landing page; `{company}` and `{device}` are substituted
    pub content_url_template: String,
    /// Package fetched by `update` when the command carries no URL
    pub update_url: String,

    // --- Scheduling ---
    /// Seconds after local midnight the day-switch timer fires
    pub day_switch_offset_secs: u32,
    /// Delay before the single retry of a failed wake (milliseconds)
    pub wake_retry_delay_ms: u32,
    pub past_trigger_policy: PastTriggerPolicy,

    // --- Timing ---
    /// Device document heartbeat interval (seconds)
    pub heartbeat_interval_secs: u32,
    /// Daemon loop period (milliseconds)
    pub poll_interval_ms: u32,

    pub hooks: HostHooks,
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            // Identity
            default_tenant: "synergy3".into(),
            device_model: "kiosk".into(),

            // Content
            content_url_template:
                "https://360synergy.net/kiosk3/public/feedback.html?company={company}&id={device}"
                    .into(),
            update_url: "https://github.com/bbondarenkosynergy3/kiosk-v2/releases/latest/download/synergy360-kiosk-release-v.apk".into(),

            // Scheduling
            day_switch_offset_secs: 5,
            wake_retry_delay_ms: 2000,
            past_trigger_policy: PastTriggerPolicy::FireImmediately,

            // Timing
            heartbeat_interval_secs: 30, // 2/min
            poll_interval_ms: 1000,      // 1 Hz

            hooks: HostHooks::default(),
        }
    }
}

impl KioskConfig {
    /// The tenant landing page for `company` and `device_id`.
    pub fn content_url(&self, company: &str, device_id: &str) -> String {
        self.content_url_template
            .replace("{company}", company)
            .replace("{device}", device_id)
    }
}
