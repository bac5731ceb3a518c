//! Remote document layout and the typed views over it.
//!
//! ```text
//!   company/<tenant>/devices/<device_id>      command slot · ack · heartbeat
//!   company/<tenant>/settings/schedule        { fullJson, updatedAt }
//!   company/<tenant>/settings/kiosk           { brightness, volume, volumeLocked, updatedAt }
//!   deviceAssignments/<hardware_id>           { company, deviceId, updatedAt }
//! ```
//!
//! Snapshots are read tolerantly: a field of the wrong type is treated as
//! absent rather than failing the whole document.

use core::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::app::commands::IDLE_TAG;
use crate::app::ports::{Document, RemoteError};

// ───────────────────────────────────────────────────────────────
// Paths
// ───────────────────────────────────────────────────────────────

/// Slash-separated path of a remote document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocPath(String);

impl DocPath {
    /// Build a path from segments.  Each segment must be non-empty and
    /// must not contain `/`.
    pub fn new<'a>(segments: impl IntoIterator<Item = &'a str>) -> Result<Self, RemoteError> {
        let mut path = String::new();
        for seg in segments {
            if seg.is_empty() || seg.contains('/') || seg == "." || seg == ".." {
                return Err(RemoteError::Malformed(format!("bad path segment '{}'", seg)));
            }
            if !path.is_empty() {
                path.push('/');
            }
            path.push_str(seg);
        }
        if path.is_empty() {
            return Err(RemoteError::Malformed("empty path".into()));
        }
        Ok(Self(path))
    }

    /// `company/<tenant>/devices/<device_id>`
    pub fn device(tenant: &str, device_id: &str) -> Result<Self, RemoteError> {
        Self::new(["company", tenant, "devices", device_id])
    }

    /// `company/<tenant>/settings/schedule`
    pub fn schedule(tenant: &str) -> Result<Self, RemoteError> {
        Self::new(["company", tenant, "settings", "schedule"])
    }

    /// `company/<tenant>/settings/kiosk`
    pub fn settings(tenant: &str) -> Result<Self, RemoteError> {
        Self::new(["company", tenant, "settings", "kiosk"])
    }

    /// `deviceAssignments/<hardware_id>`
    pub fn assignment(hardware_id: &str) -> Result<Self, RemoteError> {
        Self::new(["deviceAssignments", hardware_id])
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ───────────────────────────────────────────────────────────────
// Device document
// ───────────────────────────────────────────────────────────────

/// Snapshot of a device document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceDocument {
    pub command: Option<String>,
    pub command_id: Option<String>,
    pub payload: Document,
    /// The whole snapshot, for fields the typed view does not cover.
    pub body: Document,
}

impl DeviceDocument {
    pub fn from_body(body: Document) -> Self {
        let command = body.get("command").and_then(Value::as_str).map(str::to_owned);
        // Some consoles write numeric ids.
        let command_id = match body.get("commandId") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        let payload = body
            .get("payload")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        Self {
            command,
            command_id,
            payload,
            body,
        }
    }

    /// True when the slot shows something other than the idle tag.
    pub fn has_pending_command(&self) -> bool {
        self.command
            .as_deref()
            .map(str::trim)
            .is_some_and(|c| !c.is_empty() && c != IDLE_TAG)
    }

    pub fn company(&self) -> Option<&str> {
        self.body.get("company").and_then(Value::as_str)
    }
}

// ───────────────────────────────────────────────────────────────
// Command ack
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AckStatus {
    Ok,
    Error,
}

impl AckStatus {
    pub fn from_ok(ok: bool) -> Self {
        if ok { Self::Ok } else { Self::Error }
    }
}

/// Outcome of one command, merged back into the device document.
///
/// `command` is always the idle tag so the slot reads as free again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandAck {
    pub command: String,
    pub last_command_id: String,
    pub last_command_status: AckStatus,
    pub last_command_message: String,
    /// Epoch milliseconds.
    pub last_command_at: i64,
}

impl CommandAck {
    pub fn new(id: &str, status: AckStatus, message: &str, at_ms: i64) -> Self {
        Self {
            command: IDLE_TAG.to_owned(),
            last_command_id: id.to_owned(),
            last_command_status: status,
            last_command_message: message.to_owned(),
            last_command_at: at_ms,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.last_command_status == AckStatus::Ok
    }

    /// The merge patch carrying this ack.
    pub fn to_patch(&self) -> Document {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Document::new(),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Schedule document
// ───────────────────────────────────────────────────────────────

/// The `fullJson` field of a schedule document, if it carries one that is
/// not blank.
pub fn schedule_json(doc: Option<&Document>) -> Option<&str> {
    doc?.get("fullJson")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// `{fullJson, updatedAt}`
pub fn schedule_patch(full_json: &str, now_ms: i64) -> Document {
    object(json!({
        "fullJson": full_json,
        "updatedAt": now_ms,
    }))
}

// ───────────────────────────────────────────────────────────────
// Kiosk settings document
// ───────────────────────────────────────────────────────────────

const BRIGHTNESS: &str = "brightness";
const VOLUME: &str = "volume";
const VOLUME_LOCKED: &str = "volumeLocked";

pub const DEFAULT_BRIGHTNESS: u8 = 128;
pub const DEFAULT_VOLUME: u8 = 50;
pub const MAX_VOLUME: u8 = 100;

/// Display levels pushed from the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KioskSettings {
    /// Backlight, 0–255.
    pub brightness: u8,
    /// Media volume in percent, 0–100.
    pub volume: u8,
    /// Hardware volume keys are ignored while set.
    pub volume_locked: bool,
}

impl Default for KioskSettings {
    fn default() -> Self {
        Self {
            brightness: DEFAULT_BRIGHTNESS,
            volume: DEFAULT_VOLUME,
            volume_locked: false,
        }
    }
}

impl KioskSettings {
    /// Read a snapshot.  Out-of-range levels are clamped; an absent or
    /// non-numeric field takes its default.
    pub fn from_document(doc: &Document) -> Self {
        let defaults = Self::default();
        Self {
            brightness: level(doc.get(BRIGHTNESS), u8::MAX).unwrap_or(defaults.brightness),
            volume: level(doc.get(VOLUME), MAX_VOLUME).unwrap_or(defaults.volume),
            volume_locked: doc
                .get(VOLUME_LOCKED)
                .and_then(Value::as_bool)
                .unwrap_or(defaults.volume_locked),
        }
    }

    /// Defaults for the keys `doc` lacks, or `None` when all are present.
    /// Present keys are never overwritten, whatever their value.
    pub fn backfill_patch(doc: &Document) -> Option<Document> {
        let defaults = Self::default().fields();
        let missing: Document = defaults
            .into_iter()
            .filter(|(key, _)| !doc.contains_key(key))
            .collect();
        (!missing.is_empty()).then_some(missing)
    }

    /// Full document for a tenant that has none yet.
    pub fn seed_patch(now_ms: i64) -> Document {
        let mut doc = Self::default().fields();
        doc.insert("updatedAt".into(), now_ms.into());
        doc
    }

    fn fields(&self) -> Document {
        object(json!({
            BRIGHTNESS: self.brightness,
            VOLUME: self.volume,
            VOLUME_LOCKED: self.volume_locked,
        }))
    }
}

/// A numeric field clamped to `0..=max`.  Fractions are truncated.
fn level(value: Option<&Value>, max: u8) -> Option<u8> {
    let value = value?;
    let n = value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))?;
    u8::try_from(n.clamp(0, i64::from(max))).ok()
}

// ───────────────────────────────────────────────────────────────
// Device assignment
// ───────────────────────────────────────────────────────────────

/// Which tenant and device id the backend has on record for this
/// hardware.  Survives a wiped local store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceAssignment {
    pub company: Option<String>,
    pub device_id: Option<String>,
}

impl DeviceAssignment {
    pub fn from_body(body: &Document) -> Self {
        let field = |key: &str| {
            body.get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        };
        Self {
            company: field("company"),
            device_id: field("deviceId"),
        }
    }
}

/// `{company, deviceId, updatedAt}`
pub fn assignment_patch(company: &str, device_id: &str, now_ms: i64) -> Document {
    object(json!({
        "company": company,
        "deviceId": device_id,
        "updatedAt": now_ms,
    }))
}

// ───────────────────────────────────────────────────────────────
// Registration and liveness
// ───────────────────────────────────────────────────────────────

/// Identity fields merged into the device document on every start.
pub fn registration_patch(device_id: &str, company: &str, model: &str, now_ms: i64) -> Document {
    object(json!({
        "deviceId": device_id,
        "company": company,
        "model": model,
        "status": "online",
        "lastSeen": now_ms,
    }))
}

/// Initial command slot for a document that does not exist yet.
pub fn idle_slot_patch() -> Document {
    object(json!({
        "command": IDLE_TAG,
        "commandId": "init",
    }))
}

pub fn heartbeat_patch(now_ms: i64) -> Document {
    object(json!({
        "status": "online",
        "lastSeen": now_ms,
        "heartbeat": true,
    }))
}

fn object(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}
