//! Integration tests for remote commands: device document snapshot →
//! CommandChannel → device primitive → ack.

use std::sync::Arc;

use futures_lite::future::block_on;
use serde_json::{Value, json};

use kiosk::app::events::AppEvent;
use kiosk::app::ports::{ClockReading, Document};
use kiosk::app::service::KioskService;
use kiosk::config::KioskConfig;
use kiosk::power::PowerState;
use kiosk::remote::document::{AckStatus, CommandAck};
use kiosk::state::KioskState;

use crate::mock_platform::{
    MemoryStore, MockPlatform, MockRemote, PlatformCall, RecordingSink, at,
};

const DEVICE: &str = "kiosk_test01";
const DEVICE_PATH: &str = "company/synergy3/devices/kiosk_test01";
const ASSIGNMENT_PATH: &str = "deviceAssignments/kiosk_test01";

struct Rig {
    svc: KioskService<MemoryStore>,
    store: Arc<MemoryStore>,
    hw: MockPlatform,
    sink: RecordingSink,
    remote: MockRemote,
}

impl Rig {
    fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    fn with_store(store: Arc<MemoryStore>) -> Self {
        let state = KioskState::new(Arc::clone(&store));
        Self {
            svc: KioskService::new(KioskConfig::default(), state, DEVICE.into()),
            store,
            hw: MockPlatform::new(),
            sink: RecordingSink::new(),
            remote: MockRemote::new(),
        }
    }

    fn deliver_at(&mut self, body: Value, now: ClockReading) -> Option<CommandAck> {
        let doc: Document = body.as_object().cloned().unwrap();
        block_on(self.svc.on_device_document(
            Some(doc),
            &self.remote,
            now,
            &mut self.hw,
            &mut self.sink,
        ))
    }

    fn deliver(&mut self, body: Value) -> Option<CommandAck> {
        self.deliver_at(body, at(12, 0))
    }
}

// ── Acks ──────────────────────────────────────────────────────

#[test]
fn unknown_command_is_acked_as_error() {
    let mut rig = Rig::new();

    let ack = rig
        .deliver(json!({"command": "ping williams", "commandId": "abc"}))
        .unwrap();

    assert_eq!(ack.last_command_status, AckStatus::Error);
    assert!(ack.last_command_message.contains("unknown"));
    assert!(rig.hw.calls.is_empty());

    let doc = rig.remote.get(DEVICE_PATH).unwrap();
    assert_eq!(doc["command"], "idle");
    assert_eq!(doc["lastCommandId"], "abc");
    assert_eq!(doc["lastCommandStatus"], "error");
    assert_eq!(doc["lastCommandAt"], at(12, 0).epoch_ms);
}

#[test]
fn ping_is_acked_ok() {
    let mut rig = Rig::new();
    let ack = rig.deliver(json!({"command": "ping", "commandId": "p1"})).unwrap();
    assert!(ack.is_ok());
    assert_eq!(ack.last_command_message, "pong");
    assert_eq!(rig.sink.last(), Some(&AppEvent::CommandHandled(ack)));
}

#[test]
fn idle_slot_and_deleted_document_are_ignored() {
    let mut rig = Rig::new();
    assert!(rig.deliver(json!({"command": "idle", "commandId": "init"})).is_none());
    assert!(
        block_on(rig.svc.on_device_document(None, &rig.remote, at(12, 0), &mut rig.hw, &mut rig.sink))
            .is_none()
    );
    assert!(rig.remote.merges.borrow().is_empty());
    assert!(rig.sink.events.is_empty());
}

// ── At-most-once ──────────────────────────────────────────────

#[test]
fn redelivery_executes_once_and_acks_twice() {
    let mut rig = Rig::new();
    let snapshot = json!({"command": "sleep", "commandId": "abc"});

    assert!(rig.deliver(snapshot.clone()).is_some());
    assert!(rig.deliver_at(snapshot, at(12, 5)).is_none());

    assert_eq!(rig.hw.locks(), 1);
    let acks = rig.remote.ack_writes();
    assert_eq!(acks.len(), 2);
    assert_eq!(acks[0], acks[1], "identical ack, original timestamp");
    assert_eq!(acks[0].0, DEVICE_PATH);
}

#[test]
fn handled_command_is_not_rerun_once_slot_is_idle() {
    let mut rig = Rig::new();
    rig.deliver(json!({"command": "reload", "commandId": "r1"}));
    // The ack turned the slot idle; the echo snapshot carries the old id.
    rig.deliver(json!({"command": "idle", "commandId": "r1"}));

    assert_eq!(rig.hw.count(&PlatformCall::Reload), 1);
    assert_eq!(rig.remote.ack_writes().len(), 1);
}

#[test]
fn new_id_with_same_tag_runs_again() {
    let mut rig = Rig::new();
    rig.deliver(json!({"command": "reload", "commandId": "r1"}));
    rig.deliver(json!({"command": "reload", "commandId": "r2"}));
    assert_eq!(rig.hw.count(&PlatformCall::Reload), 2);
}

#[test]
fn handled_id_survives_restart() {
    let store = Arc::new(MemoryStore::new());
    let snapshot = json!({"command": "sleep", "commandId": "boot-1"});

    let mut first = Rig::with_store(Arc::clone(&store));
    first.deliver(snapshot.clone());

    let mut second = Rig::with_store(store);
    assert!(second.deliver(snapshot).is_none());
    assert_eq!(second.hw.locks(), 0);
    assert_eq!(second.remote.ack_writes().len(), 1, "stored ack re-sent");
}

#[test]
fn failed_ack_write_still_marks_command_handled() {
    let mut rig = Rig::new();
    rig.remote.fail_merges.set(true);
    let snapshot = json!({"command": "sleep", "commandId": "c1"});

    assert!(rig.deliver(snapshot.clone()).is_some());
    assert!(rig.remote.ack_writes().is_empty());

    rig.remote.fail_merges.set(false);
    assert!(rig.deliver(snapshot).is_none());
    assert_eq!(rig.hw.locks(), 1);
    assert_eq!(rig.remote.ack_writes().len(), 1, "ack delivered on retry");
}

#[test]
fn failed_command_is_acked_and_not_retried() {
    let mut rig = Rig::new();
    rig.hw.fail_lock = true;
    let snapshot = json!({"command": "sleep", "commandId": "c1"});

    let ack = rig.deliver(snapshot.clone()).unwrap();
    assert_eq!(ack.last_command_status, AckStatus::Error);
    assert!(ack.last_command_message.starts_with("lock failed"));

    rig.deliver(snapshot);
    assert_eq!(rig.hw.locks(), 1);
}

// ── Primitives ────────────────────────────────────────────────

#[test]
fn sleep_and_wake_commands_drive_power_state() {
    let mut rig = Rig::new();
    rig.deliver(json!({"command": "sleep", "commandId": "1"}));
    assert_eq!(rig.svc.power_state(), Some(PowerState::Asleep));
    rig.deliver(json!({"command": "wake", "commandId": "2"}));
    assert_eq!(rig.svc.power_state(), Some(PowerState::Awake));
}

#[test]
fn open_url_requires_url() {
    let mut rig = Rig::new();
    let ack = rig
        .deliver(json!({"command": "open_url", "commandId": "u1"}))
        .unwrap();
    assert_eq!(ack.last_command_message, "missing url");

    let ack = rig
        .deliver(json!({
            "command": "open_url",
            "commandId": "u2",
            "payload": {"url": "https://example.test/menu"}
        }))
        .unwrap();
    assert!(ack.is_ok());
    assert_eq!(rig.hw.opened_urls(), vec!["https://example.test/menu"]);
}

#[test]
fn update_falls_back_to_configured_package() {
    let mut rig = Rig::new();
    rig.deliver(json!({"command": "update", "commandId": "u1"}));
    rig.deliver(json!({
        "command": "update_now",
        "commandId": "u2",
        "payload": {"url": "https://example.test/app.apk"}
    }));

    let default_url = KioskConfig::default().update_url;
    assert_eq!(
        rig.hw.calls,
        vec![
            PlatformCall::StartUpdate(default_url),
            PlatformCall::StartUpdate("https://example.test/app.apk".into()),
        ]
    );
}

#[test]
fn failed_update_reports_error() {
    let mut rig = Rig::new();
    rig.hw.fail_update = true;
    let ack = rig.deliver(json!({"command": "update", "commandId": "u1"})).unwrap();
    assert!(!ack.is_ok());
    assert!(ack.last_command_message.starts_with("update failed"));
}

// ── Tenant switch ─────────────────────────────────────────────

#[test]
fn set_company_moves_device_to_new_tenant() {
    let mut rig = Rig::new();
    let ack = rig
        .deliver(json!({
            "command": "set_company",
            "commandId": "t1",
            "payload": {"newCompany": "acme"},
            "model": "kiosk"
        }))
        .unwrap();

    assert!(ack.is_ok());
    assert_eq!(ack.last_command_message, "company switched");
    assert_eq!(rig.svc.tenant(), "acme");

    // Copied body plus the ack land on the new path.
    let moved = rig.remote.get("company/acme/devices/kiosk_test01").unwrap();
    assert_eq!(moved["company"], "acme");
    assert_eq!(moved["model"], "kiosk");
    assert_eq!(moved["lastCommandId"], "t1");
    assert_eq!(moved["command"], "idle");
    assert!(rig.remote.get(DEVICE_PATH).is_none());

    let url = KioskConfig::default().content_url("acme", DEVICE);
    assert_eq!(rig.hw.opened_urls(), vec![url.as_str()]);
    assert!(rig.sink.events.contains(&AppEvent::TenantChanged {
        from: "synergy3".into(),
        to: "acme".into(),
    }));

    // Persisted for the next start.
    let restarted = KioskService::new(
        KioskConfig::default(),
        KioskState::new(Arc::clone(&rig.store)),
        DEVICE.into(),
    );
    assert_eq!(restarted.tenant(), "acme");
}

#[test]
fn set_company_updates_assignment_before_copying() {
    let mut rig = Rig::new();
    rig.remote.put(
        ASSIGNMENT_PATH,
        json!({"company": "synergy3", "deviceId": DEVICE, "updatedAt": 1}),
    );

    rig.deliver_at(
        json!({"command": "set_company", "commandId": "t1", "payload": {"newCompany": "acme"}}),
        at(14, 0),
    );

    let record = rig.remote.get(ASSIGNMENT_PATH).unwrap();
    assert_eq!(record["company"], "acme");
    assert_eq!(record["deviceId"], DEVICE);
    assert_eq!(record["updatedAt"], at(14, 0).epoch_ms);

    let order: Vec<String> = rig.remote.merges.borrow().iter().map(|(p, _)| p.clone()).collect();
    assert_eq!(order[0], ASSIGNMENT_PATH);
    assert_eq!(order[1], "company/acme/devices/kiosk_test01");
    assert_eq!(
        rig.svc.settings_path().unwrap().as_str(),
        "company/acme/settings/kiosk"
    );
}

#[test]
fn rejected_company_leaves_assignment_alone() {
    let mut rig = Rig::new();
    rig.deliver(json!({"command": "set_company", "commandId": "t1", "payload": {"newCompany": ".."}}));
    assert!(rig.remote.get(ASSIGNMENT_PATH).is_none());
    assert_eq!(rig.svc.tenant(), "synergy3");
}

#[test]
fn set_company_reads_top_level_field() {
    let mut rig = Rig::new();
    rig.deliver(json!({"command": "set_company", "commandId": "t1", "newCompany": "globex"}));
    assert_eq!(rig.svc.tenant(), "globex");
}

#[test]
fn set_company_rejects_bad_names() {
    let mut rig = Rig::new();

    let ack = rig.deliver(json!({"command": "set_company", "commandId": "t1"})).unwrap();
    assert_eq!(ack.last_command_message, "missing company");

    let ack = rig
        .deliver(json!({"command": "set_company", "commandId": "t2", "payload": {"newCompany": "a/b"}}))
        .unwrap();
    assert!(ack.last_command_message.starts_with("invalid company"));

    assert_eq!(rig.svc.tenant(), "synergy3");
    assert_eq!(rig.remote.ack_writes().len(), 2);
    assert!(rig.remote.ack_writes().iter().all(|(path, _)| path == DEVICE_PATH));
}

#[test]
fn set_company_failure_keeps_tenant() {
    let mut rig = Rig::new();
    rig.remote.fail_merges.set(true);
    let ack = rig
        .deliver(json!({"command": "set_company", "commandId": "t1", "payload": {"company": "acme"}}))
        .unwrap();
    assert!(ack.last_command_message.starts_with("company switch failed"));
    assert_eq!(rig.svc.tenant(), "synergy3");
}
