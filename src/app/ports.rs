//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ KioskService (domain)
//! ```
//!
//! Driven adapters (screen, alarms, content, storage, remote documents)
//! implement these traits.  The [`KioskService`](super::service::KioskService)
//! consumes them via generics, so the domain core never touches a platform
//! API directly and every path can be exercised with mocks.
//!
//! ## Failure policy
//!
//! - Platform primitives are best-effort.  Their errors are typed so callers
//!   can log them and fold them into a command ack, never to abort the loop.
//! - **StoragePort** writes MUST be atomic per call.
//! - **ConfigPort** implementations MUST validate before persisting.

use chrono::NaiveDateTime;
use serde_json::{Map, Value};

use crate::config::KioskConfig;
use crate::remote::document::DocPath;
use crate::remote::subscription::Subscription;

/// A remote document body: a JSON object.
pub type Document = Map<String, Value>;

// ───────────────────────────────────────────────────────────────
// Time port
// ───────────────────────────────────────────────────────────────

/// One reading of the wall clock.
///
/// The domain schedules in local wall-clock time (`local`), while acks and
/// heartbeats are stamped in epoch milliseconds (`epoch_ms`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockReading {
    pub local: NaiveDateTime,
    pub epoch_ms: i64,
}

/// Source of the current time.
pub trait TimePort {
    fn now(&self) -> ClockReading;
}

// ───────────────────────────────────────────────────────────────
// Screen ports (driven adapter: domain → device power)
// ───────────────────────────────────────────────────────────────

/// Locks the screen through the device-management privilege.
pub trait ScreenLockController {
    fn lock_screen(&mut self) -> Result<(), PlatformError>;
}

/// Turns the screen on, simulating a physical power-button press.
pub trait WakeController {
    fn wake_screen(&mut self) -> Result<(), PlatformError>;
}

// ───────────────────────────────────────────────────────────────
// Alarm port (driven adapter: domain → OS timers)
// ───────────────────────────────────────────────────────────────

/// Stable identifier of each timer class.  Programming an id that is
/// already active replaces the old timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AlarmId {
    Sleep,
    Wake,
    DaySwitch,
}

impl AlarmId {
    /// Every timer class, in cancellation order.
    pub const ALL: [AlarmId; 3] = [AlarmId::Sleep, AlarmId::Wake, AlarmId::DaySwitch];

    /// Broadcast-style trigger name carried by the timer.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Sleep => "kiosk.sleep",
            Self::Wake => "kiosk.wake",
            Self::DaySwitch => "kiosk.day_switch",
        }
    }
}

/// A one-shot timer to program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmRequest {
    pub id: AlarmId,
    /// Wall-clock time the schedule asked for.
    pub nominal: NaiveDateTime,
    /// When the timer actually fires.  Equal to `nominal` unless a past
    /// trigger was pulled forward to "now".
    pub fire_at: NaiveDateTime,
    /// Fire even when the device is idle / in low-power mode.
    pub wake_device: bool,
}

/// Programs and cancels OS-level wake-up timers.
pub trait AlarmScheduler {
    /// Program `alarm`, replacing any active timer with the same id.
    fn program(&mut self, alarm: AlarmRequest) -> Result<(), PlatformError>;

    /// Cancel the timer with `id`.  A no-op when none is active.
    fn cancel(&mut self, id: AlarmId);
}

// ───────────────────────────────────────────────────────────────
// Content, display and update ports (external collaborators)
// ───────────────────────────────────────────────────────────────

/// The pinned kiosk content surface.
pub trait ContentController {
    fn reload(&mut self) -> Result<(), PlatformError>;
    fn open_url(&mut self, url: &str) -> Result<(), PlatformError>;
}

/// Screen brightness and media volume.
pub trait DisplaySettingsController {
    /// `level` is the raw backlight value, 0–255.
    fn set_brightness(&mut self, level: u8) -> Result<(), PlatformError>;
    /// `percent` of the maximum media volume, 0–100.
    fn set_volume(&mut self, percent: u8) -> Result<(), PlatformError>;
}

/// Starts an over-the-air package update.  Download and install happen
/// outside the agent; this only kicks the process off.
pub trait UpdateInstaller {
    fn start_update(&mut self, url: &str) -> Result<(), PlatformError>;
}

/// Everything the service drives on the device, bundled so one `&mut`
/// satisfies every capability without a double borrow.
pub trait DevicePort:
    ScreenLockController
    + WakeController
    + AlarmScheduler
    + ContentController
    + DisplaySettingsController
    + UpdateInstaller
{
}

impl<T> DevicePort for T where
    T: ScreenLockController
        + WakeController
        + AlarmScheduler
        + ContentController
        + DisplaySettingsController
        + UpdateInstaller
{
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists agent configuration.
///
/// Implementations MUST validate config values before persisting and
/// reject invalid ranges with [`ConfigError::ValidationFailed`] instead of
/// clamping them.
pub trait ConfigPort {
    /// Returns [`KioskConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<KioskConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &KioskConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ local key-value store)
// ───────────────────────────────────────────────────────────────

/// Persistent, namespaced key-value storage.
///
/// Methods take `&self`: the store is shared between the schedule store
/// and the command channel, so implementations synchronise internally.
/// Every write MUST be atomic, with no partial value visible after a crash.
pub trait StoragePort {
    fn read(&self, namespace: &str, key: &str) -> Result<Vec<u8>, StorageError>;

    fn write(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Returns `Ok(())` even if the key didn't exist.
    fn delete(&self, namespace: &str, key: &str) -> Result<(), StorageError>;

    fn exists(&self, namespace: &str, key: &str) -> bool;
}

impl<T: StoragePort + ?Sized> StoragePort for std::sync::Arc<T> {
    fn read(&self, namespace: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        (**self).read(namespace, key)
    }

    fn write(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        (**self).write(namespace, key, data)
    }

    fn delete(&self, namespace: &str, key: &str) -> Result<(), StorageError> {
        (**self).delete(namespace, key)
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        (**self).exists(namespace, key)
    }
}

// ───────────────────────────────────────────────────────────────
// Remote document port (driven adapter: domain ↔ cloud documents)
// ───────────────────────────────────────────────────────────────

/// The cloud document database that carries schedules and commands.
///
/// Reads and writes are asynchronous operations that resolve to a result;
/// change notifications arrive through a cancellable [`Subscription`].
#[allow(async_fn_in_trait)]
pub trait RemoteDocumentPort {
    /// Read a document.  `Ok(None)` when it does not exist.
    async fn fetch(&self, path: &DocPath) -> Result<Option<Document>, RemoteError>;

    /// Merge `patch` into the document (creating it if absent).
    async fn merge(&self, path: &DocPath, patch: Document) -> Result<(), RemoteError>;

    /// Observe a document.  The current state is delivered first, then
    /// every change until the subscription is cancelled.
    fn subscribe(&self, path: &DocPath) -> Result<Subscription<Option<Document>>, RemoteError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage medium is full.
    Full,
    /// Generic I/O error.
    IoError,
    /// Stored bytes could not be decoded.
    Corrupted,
}

/// Errors from platform primitives (lock, wake, alarms, content, update).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// The agent lacks the privilege for this primitive.
    NotPermitted(&'static str),
    /// The primitive ran and failed.
    Failed(String),
}

/// Errors from [`RemoteDocumentPort`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Backend unreachable.
    Unavailable(String),
    /// Backend refused the operation.
    Rejected(String),
    /// Document body is not a JSON object or could not be encoded.
    Malformed(String),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
            Self::Corrupted => write!(f, "stored value corrupted"),
        }
    }
}

impl core::fmt::Display for PlatformError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotPermitted(what) => write!(f, "not permitted: {}", what),
            Self::Failed(msg) => write!(f, "{}", msg),
        }
    }
}

impl core::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "remote unavailable: {}", msg),
            Self::Rejected(msg) => write!(f, "remote rejected: {}", msg),
            Self::Malformed(msg) => write!(f, "malformed document: {}", msg),
        }
    }
}

impl core::error::Error for ConfigError {}
impl core::error::Error for StorageError {}
impl core::error::Error for PlatformError {}
impl core::error::Error for RemoteError {}
