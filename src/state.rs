//! Persisted agent state.
//!
//! [`KioskState`] is the only owner of the shared mutable state that must
//! survive restarts: the last received schedule document, the last handled
//! command id (and its ack), the device identity, the current tenant and
//! the volume-key lock.
//! It is cloned into the [`ScheduleStore`](crate::schedule::ScheduleStore)
//! and the [`CommandChannel`](crate::remote::command::CommandChannel)
//! constructors, so tests can hand each an isolated fake store.

use std::sync::Arc;

use log::warn;

use crate::app::ports::{StorageError, StoragePort};
use crate::remote::document::CommandAck;

const SCHEDULE_NAMESPACE: &str = "schedule_prefs";
const FULL_SCHEDULE_KEY: &str = "full_schedule";

const KIOSK_NAMESPACE: &str = "kiosk_prefs";
const LAST_COMMAND_ID_KEY: &str = "last_cmd_id";
const LAST_ACK_KEY: &str = "last_cmd_ack";
const DEVICE_ID_KEY: &str = "device_id";
const COMPANY_KEY: &str = "company";
const VOLUME_LOCKED_KEY: &str = "volume_locked";

/// Typed view over the shared key-value store.
pub struct KioskState<S> {
    storage: Arc<S>,
}

impl<S> Clone for KioskState<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<S: StoragePort> KioskState<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    // ── Schedule ──────────────────────────────────────────────

    /// The schedule document exactly as last received.
    pub fn full_schedule(&self) -> Result<Option<String>, StorageError> {
        self.read_string(SCHEDULE_NAMESPACE, FULL_SCHEDULE_KEY)
    }

    pub fn set_full_schedule(&self, json: &str) -> Result<(), StorageError> {
        self.storage
            .write(SCHEDULE_NAMESPACE, FULL_SCHEDULE_KEY, json.as_bytes())
    }

    // ── Command de-duplication ────────────────────────────────

    pub fn last_command_id(&self) -> Result<Option<String>, StorageError> {
        self.read_string(KIOSK_NAMESPACE, LAST_COMMAND_ID_KEY)
    }

    /// Record `ack` as the outcome of the last handled command.
    ///
    /// The id is written last, so a crash in between re-executes the
    /// command at worst once more rather than losing its ack.
    pub fn record_handled(&self, ack: &CommandAck) -> Result<(), StorageError> {
        let encoded = serde_json::to_vec(ack).map_err(|_| StorageError::Corrupted)?;
        self.storage.write(KIOSK_NAMESPACE, LAST_ACK_KEY, &encoded)?;
        self.storage.write(
            KIOSK_NAMESPACE,
            LAST_COMMAND_ID_KEY,
            ack.last_command_id.as_bytes(),
        )
    }

    /// Ack of the last handled command, if it is still readable.
    pub fn last_ack(&self) -> Option<CommandAck> {
        match self.storage.read(KIOSK_NAMESPACE, LAST_ACK_KEY) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .inspect_err(|e| warn!("KioskState: stored ack unreadable: {}", e))
                .ok(),
            Err(StorageError::NotFound) => None,
            Err(e) => {
                warn!("KioskState: stored ack read failed: {}", e);
                None
            }
        }
    }

    // ── Identity ──────────────────────────────────────────────

    pub fn device_id(&self) -> Result<Option<String>, StorageError> {
        self.read_string(KIOSK_NAMESPACE, DEVICE_ID_KEY)
    }

    pub fn set_device_id(&self, id: &str) -> Result<(), StorageError> {
        self.storage
            .write(KIOSK_NAMESPACE, DEVICE_ID_KEY, id.as_bytes())
    }

    /// Current tenant, or `fallback` when none has been assigned.
    pub fn company_or(&self, fallback: &str) -> String {
        match self.read_string(KIOSK_NAMESPACE, COMPANY_KEY) {
            Ok(Some(company)) if !company.is_empty() => company,
            Ok(_) => fallback.to_owned(),
            Err(e) => {
                warn!("KioskState: company read failed ({}), using '{}'", e, fallback);
                fallback.to_owned()
            }
        }
    }

    pub fn set_company(&self, company: &str) -> Result<(), StorageError> {
        self.storage
            .write(KIOSK_NAMESPACE, COMPANY_KEY, company.as_bytes())
    }

    // ── Display ───────────────────────────────────────────────

    /// Whether hardware volume keys are locked.  Unlocked when unset.
    pub fn volume_locked(&self) -> bool {
        matches!(
            self.read_string(KIOSK_NAMESPACE, VOLUME_LOCKED_KEY),
            Ok(Some(v)) if v == "true"
        )
    }

    pub fn set_volume_locked(&self, locked: bool) -> Result<(), StorageError> {
        let value: &[u8] = if locked { b"true" } else { b"false" };
        self.storage
            .write(KIOSK_NAMESPACE, VOLUME_LOCKED_KEY, value)
    }

    // ── Internal ──────────────────────────────────────────────

    fn read_string(&self, namespace: &str, key: &str) -> Result<Option<String>, StorageError> {
        match self.storage.read(namespace, key) {
            Ok(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| StorageError::Corrupted),
            Err(StorageError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
