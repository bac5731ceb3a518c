//! Mock platform adapters for integration tests.
//!
//! Records every device primitive so tests can assert on the full call
//! history without a real screen, OS timers or a cloud backend.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use kiosk::adapters::alarm_clock::AlarmClock;
use kiosk::app::events::AppEvent;
use kiosk::app::ports::{
    AlarmId, AlarmRequest, AlarmScheduler, ClockReading, ContentController,
    DisplaySettingsController, Document, EventSink, PlatformError, RemoteDocumentPort, RemoteError, ScreenLockController, StorageError,
    StoragePort, UpdateInstaller, WakeController,
};
use kiosk::remote::document::DocPath;
use kiosk::remote::subscription::{SnapshotFeed, Subscription, subscription};

// ── Clock helpers ─────────────────────────────────────────────

/// 2024-01-01 is a Monday.
pub fn day(d: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, d)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

pub fn reading(local: NaiveDateTime) -> ClockReading {
    ClockReading {
        local,
        epoch_ms: local.and_utc().timestamp_millis(),
    }
}

/// Monday 2024-01-01 at `h:m`.
pub fn at(h: u32, m: u32) -> ClockReading {
    reading(day(1, h, m, 0))
}

// ── Device call record ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum PlatformCall {
    Lock,
    Wake,
    Program(AlarmRequest),
    Cancel(AlarmId),
    Reload,
    OpenUrl(String),
    Brightness(u8),
    Volume(u8),
    StartUpdate(String),
}

// ── MockPlatform ──────────────────────────────────────────────

#[derive(Default)]
pub struct MockPlatform {
    pub calls: Vec<PlatformCall>,
    pub alarms: AlarmClock,
    pub fail_lock: bool,
    /// Number of upcoming wakes that fail.
    pub fail_wakes: usize,
    pub fail_update: bool,
}

#[allow(dead_code)]
impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, call: &PlatformCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    pub fn locks(&self) -> usize {
        self.count(&PlatformCall::Lock)
    }

    pub fn wakes(&self) -> usize {
        self.count(&PlatformCall::Wake)
    }

    /// Last screen primitive issued, if any.
    pub fn last_power_call(&self) -> Option<&PlatformCall> {
        self.calls
            .iter()
            .rev()
            .find(|c| matches!(c, PlatformCall::Lock | PlatformCall::Wake))
    }

    pub fn opened_urls(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                PlatformCall::OpenUrl(url) => Some(url.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Last brightness and volume applied, if any.
    pub fn display_levels(&self) -> (Option<u8>, Option<u8>) {
        let mut levels = (None, None);
        for call in &self.calls {
            match call {
                PlatformCall::Brightness(b) => levels.0 = Some(*b),
                PlatformCall::Volume(v) => levels.1 = Some(*v),
                _ => {}
            }
        }
        levels
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl ScreenLockController for MockPlatform {
    fn lock_screen(&mut self) -> Result<(), PlatformError> {
        self.calls.push(PlatformCall::Lock);
        if self.fail_lock {
            return Err(PlatformError::NotPermitted("device owner"));
        }
        Ok(())
    }
}

impl WakeController for MockPlatform {
    fn wake_screen(&mut self) -> Result<(), PlatformError> {
        self.calls.push(PlatformCall::Wake);
        if self.fail_wakes > 0 {
            self.fail_wakes -= 1;
            return Err(PlatformError::Failed("wake refused".into()));
        }
        Ok(())
    }
}

impl AlarmScheduler for MockPlatform {
    fn program(&mut self, alarm: AlarmRequest) -> Result<(), PlatformError> {
        self.calls.push(PlatformCall::Program(alarm));
        self.alarms.program(alarm)
    }

    fn cancel(&mut self, id: AlarmId) {
        self.calls.push(PlatformCall::Cancel(id));
        self.alarms.cancel(id);
    }
}

impl ContentController for MockPlatform {
    fn reload(&mut self) -> Result<(), PlatformError> {
        self.calls.push(PlatformCall::Reload);
        Ok(())
    }

    fn open_url(&mut self, url: &str) -> Result<(), PlatformError> {
        self.calls.push(PlatformCall::OpenUrl(url.to_owned()));
        Ok(())
    }
}

impl DisplaySettingsController for MockPlatform {
    fn set_brightness(&mut self, level: u8) -> Result<(), PlatformError> {
        self.calls.push(PlatformCall::Brightness(level));
        Ok(())
    }

    fn set_volume(&mut self, percent: u8) -> Result<(), PlatformError> {
        self.calls.push(PlatformCall::Volume(percent));
        Ok(())
    }
}

impl UpdateInstaller for MockPlatform {
    fn start_update(&mut self, url: &str) -> Result<(), PlatformError> {
        self.calls.push(PlatformCall::StartUpdate(url.to_owned()));
        if self.fail_update {
            return Err(PlatformError::Failed("installer missing".into()));
        }
        Ok(())
    }
}

// ── MemoryStore ───────────────────────────────────────────────

/// In-memory `StoragePort` with a write-failure toggle.
#[derive(Default)]
pub struct MemoryStore {
    data: RefCell<HashMap<String, Vec<u8>>>,
    pub fail_writes: Cell<bool>,
}

#[allow(dead_code)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self, namespace: &str, key: &str) -> Option<Vec<u8>> {
        self.data.borrow().get(&format!("{namespace}::{key}")).cloned()
    }
}

impl StoragePort for MemoryStore {
    fn read(&self, namespace: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        self.raw(namespace, key).ok_or(StorageError::NotFound)
    }

    fn write(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        if self.fail_writes.get() {
            return Err(StorageError::IoError);
        }
        self.data
            .borrow_mut()
            .insert(format!("{namespace}::{key}"), data.to_vec());
        Ok(())
    }

    fn delete(&self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.data.borrow_mut().remove(&format!("{namespace}::{key}"));
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.data
            .borrow()
            .contains_key(&format!("{namespace}::{key}"))
    }
}

// ── MockRemote ────────────────────────────────────────────────

/// In-memory document database.  Merges are shallow, logged and pushed
/// to live subscriptions.
#[derive(Default)]
pub struct MockRemote {
    docs: RefCell<HashMap<String, Document>>,
    pub merges: RefCell<Vec<(String, Document)>>,
    feeds: RefCell<Vec<(String, SnapshotFeed<Option<Document>>)>>,
    pub fail_merges: Cell<bool>,
    pub fail_fetches: Cell<bool>,
}

#[allow(dead_code)]
impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, path: &str, body: serde_json::Value) {
        let body = body.as_object().cloned().expect("document body must be an object");
        self.docs.borrow_mut().insert(path.to_owned(), body);
    }

    pub fn get(&self, path: &str) -> Option<Document> {
        self.docs.borrow().get(path).cloned()
    }

    /// Merges written to `path`, in order.
    pub fn merges_to(&self, path: &str) -> Vec<Document> {
        self.merges
            .borrow()
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, patch)| patch.clone())
            .collect()
    }

    /// Merges that carried an ack, in order.
    pub fn ack_writes(&self) -> Vec<(String, Document)> {
        self.merges
            .borrow()
            .iter()
            .filter(|(_, patch)| patch.contains_key("lastCommandId"))
            .cloned()
            .collect()
    }
}

impl RemoteDocumentPort for MockRemote {
    async fn fetch(&self, path: &DocPath) -> Result<Option<Document>, RemoteError> {
        if self.fail_fetches.get() {
            return Err(RemoteError::Unavailable("offline".into()));
        }
        Ok(self.get(path.as_str()))
    }

    async fn merge(&self, path: &DocPath, patch: Document) -> Result<(), RemoteError> {
        if self.fail_merges.get() {
            return Err(RemoteError::Unavailable("offline".into()));
        }
        let key = path.as_str().to_owned();
        self.merges.borrow_mut().push((key.clone(), patch.clone()));

        let snapshot = {
            let mut docs = self.docs.borrow_mut();
            let doc = docs.entry(key.clone()).or_default();
            doc.extend(patch);
            doc.clone()
        };
        self.feeds.borrow_mut().retain(|(watched, feed)| {
            watched != &key || feed.publish(Some(snapshot.clone()))
        });
        Ok(())
    }

    fn subscribe(&self, path: &DocPath) -> Result<Subscription<Option<Document>>, RemoteError> {
        let (feed, sub) = subscription();
        feed.publish(self.get(path.as_str()));
        self.feeds
            .borrow_mut()
            .push((path.as_str().to_owned(), feed));
        Ok(sub)
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&AppEvent> {
        self.events.last()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
