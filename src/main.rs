//! kioskd: kiosk agent daemon
//!
//! Hexagonal architecture driven by a single polling loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HostDevice          LogEventSink   FileStore      LocalClock  │
//! │  (Screen+Alarms+     (EventSink)    (Config+KV)    (TimePort)  │
//! │   Content+Display+   JsonDocStore (RemoteDocumentPort)         │
//! │   Update)                                                      │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              KioskService (pure logic)                 │    │
//! │  │  ScheduleStore · ScheduleManager · PowerDispatcher ·   │    │
//! │  │  CommandChannel                                        │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `kioskd [DATA_DIR]` (or `KIOSK_DATA_DIR`).  The data directory
//! holds the key-value image, an optional `config.json` overlay and the
//! `remote/` document tree.
#![deny(unused_must_use)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures_lite::future::block_on;
use log::{info, warn};
use serde_json::Value;

use kiosk::adapters::device_id::{ensure_device_id, host_hardware_id};
use kiosk::adapters::file_store::FileStore;
use kiosk::adapters::host_device::HostDevice;
use kiosk::adapters::json_docs::JsonDocStore;
use kiosk::adapters::log_sink::LogEventSink;
use kiosk::adapters::time::{FixedOffsetClock, LocalClock};
use kiosk::app::ports::{
    ConfigPort, Document, RemoteDocumentPort, RemoteError, StorageError, TimePort,
};
use kiosk::app::service::KioskService;
use kiosk::config::KioskConfig;
use kiosk::remote::document::DocPath;
use kiosk::remote::heartbeat::Heartbeat;
use kiosk::remote::subscription::Subscription;
use kiosk::state::KioskState;

const DEFAULT_DATA_DIR: &str = "kiosk-data";
const STORE_FILE: &str = "store.bin";
const CONFIG_OVERLAY: &str = "config.json";
const REMOTE_DIR: &str = "remote";

// ── Subscriptions ─────────────────────────────────────────────
//
// All three remote documents are tenant-scoped, so they are opened
// together and replaced together when the tenant changes.  Dropping the
// old set cancels it.

struct Feeds {
    schedule: Option<Subscription<Option<Document>>>,
    settings: Option<Subscription<Option<Document>>>,
    device: Option<Subscription<Option<Document>>>,
}

impl Feeds {
    fn open(service: &KioskService<FileStore>, docs: &JsonDocStore) -> Self {
        let open = |path: std::result::Result<DocPath, RemoteError>| {
            path.and_then(|p| docs.subscribe(&p))
                .inspect_err(|e| warn!("Subscribe failed: {}", e))
                .ok()
        };
        Self {
            schedule: open(service.schedule_path()),
            settings: open(service.settings_path()),
            device: open(service.device_path()),
        }
    }
}

// ── Startup helpers ───────────────────────────────────────────

fn data_dir() -> PathBuf {
    std::env::args_os()
        .nth(1)
        .or_else(|| std::env::var_os("KIOSK_DATA_DIR"))
        .map_or_else(|| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from)
}

/// Open the key-value image, moving an unreadable one aside.
fn open_store(path: &Path) -> kiosk::Result<FileStore> {
    match FileStore::open(path) {
        Err(StorageError::Corrupted) => {
            let aside = path.with_extension("corrupt");
            warn!(
                "Store image unreadable, moving it to {} and starting fresh",
                aside.display()
            );
            fs::rename(path, &aside).map_err(|_| StorageError::IoError)?;
            Ok(FileStore::open(path)?)
        }
        other => Ok(other?),
    }
}

/// Stored config with the optional `config.json` overlay applied on top.
/// The result is validated and persisted.
fn load_config(store: &FileStore, dir: &Path) -> Result<KioskConfig> {
    let mut config = store.load().unwrap_or_else(|e| {
        warn!("Stored config unusable ({}), using defaults", e);
        KioskConfig::default()
    });

    let overlay = dir.join(CONFIG_OVERLAY);
    if overlay.exists() {
        let text = fs::read_to_string(&overlay)
            .with_context(|| format!("reading {}", overlay.display()))?;
        let patch: Value = serde_json::from_str(&text)
            .with_context(|| format!("parsing {}", overlay.display()))?;

        let mut merged = serde_json::to_value(&config)?;
        if let (Value::Object(base), Value::Object(fields)) = (&mut merged, patch) {
            base.extend(fields);
        }
        config = serde_json::from_value(merged)
            .with_context(|| format!("applying {}", overlay.display()))?;
        info!("Config overlay applied from {}", overlay.display());
    }

    store
        .save(&config)
        .with_context(|| format!("config rejected ({})", overlay.display()))?;
    Ok(config)
}

fn clock() -> Box<dyn TimePort> {
    match std::env::var("KIOSK_UTC_OFFSET_SECS").ok().map(|s| s.parse::<i32>()) {
        Some(Ok(secs)) => match FixedOffsetClock::new(secs) {
            Some(clock) => {
                info!("Clock: fixed UTC offset {}s", secs);
                return Box::new(clock);
            }
            None => warn!("KIOSK_UTC_OFFSET_SECS={} out of range, using local time", secs),
        },
        Some(Err(e)) => warn!("KIOSK_UTC_OFFSET_SECS unparsable ({}), using local time", e),
        None => {}
    }
    Box::new(LocalClock::new())
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. Logging ────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .init();

    info!("╔══════════════════════════════════════╗");
    info!("║  kioskd v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Storage + config ───────────────────────────────────
    let dir = data_dir();
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    let storage = Arc::new(open_store(&dir.join(STORE_FILE))?);
    let config = load_config(&storage, &dir)?;

    // ── 3. Identity ───────────────────────────────────────────
    let state = KioskState::new(Arc::clone(&storage));
    let device_id = ensure_device_id(&state, &config.device_model)?;
    info!("Device ID: {}", device_id);

    // ── 4. Adapters + service ─────────────────────────────────
    let clock = clock();
    let docs = JsonDocStore::new(dir.join(REMOTE_DIR));
    let mut hw = HostDevice::new(config.hooks.clone());
    let mut sink = LogEventSink::new();
    let hardware_id = host_hardware_id().unwrap_or_else(|| device_id.clone());
    let mut service =
        KioskService::new(config.clone(), state, device_id).with_hardware_id(hardware_id);

    // ── 5. Boot restore, then go online ───────────────────────
    service.boot(clock.now(), &mut hw, &mut sink);
    if let Err(e) = block_on(service.resolve_tenant(&docs, clock.now())) {
        warn!("Tenant assignment unavailable ({}), staying on '{}'", e, service.tenant());
    }
    info!("Tenant: {}", service.tenant());
    if let Err(e) = block_on(service.register(&docs, clock.now())) {
        warn!("Registration failed: {}", e);
    }
    let mut feeds = Feeds::open(&service, &docs);
    let mut heartbeat = Heartbeat::new(config.heartbeat_interval_secs);
    let period = Duration::from_millis(u64::from(config.poll_interval_ms));

    info!("Agent ready. Entering event loop.");

    // ── 6. Event loop ─────────────────────────────────────────
    loop {
        docs.poll();

        // Schedule snapshots
        while let Some(snap) = feeds.schedule.as_ref().and_then(Subscription::try_next) {
            let result = block_on(service.on_schedule_document(
                snap.as_ref(),
                &docs,
                clock.now(),
                &mut hw,
                &mut sink,
            ));
            if let Err(e) = result {
                warn!("Schedule update ignored: {}", e);
            }
        }

        // Display settings
        while let Some(snap) = feeds.settings.as_ref().and_then(Subscription::try_next) {
            block_on(service.on_settings_document(
                snap.as_ref(),
                &docs,
                clock.now(),
                &mut hw,
                &mut sink,
            ));
        }

        // Device snapshots (commands)
        let tenant = service.tenant().to_owned();
        while let Some(snap) = feeds.device.as_ref().and_then(Subscription::try_next) {
            block_on(service.on_device_document(snap, &docs, clock.now(), &mut hw, &mut sink));
            if service.tenant() != tenant {
                break;
            }
        }
        if service.tenant() != tenant {
            info!("Tenant changed, re-subscribing");
            feeds = Feeds::open(&service, &docs);
            if let Err(e) = block_on(service.register(&docs, clock.now())) {
                warn!("Registration failed: {}", e);
            }
        }

        // Timers
        let now = clock.now();
        for alarm in hw.alarms_mut().take_due(now.local) {
            service.on_alarm(alarm, now, &mut hw, &mut sink);
        }
        service.tick(now, &mut hw, &mut sink);

        // Liveness
        if let Some(patch) = heartbeat.poll(now.epoch_ms) {
            match service.device_path() {
                Ok(path) => {
                    if let Err(e) = block_on(docs.merge(&path, patch)) {
                        warn!("Heartbeat failed: {}", e);
                    }
                }
                Err(e) => warn!("Heartbeat skipped: {}", e),
            }
        }

        std::thread::sleep(period);
    }
}
