//! Fuzz target: device document → remote command
//!
//! Parses arbitrary JSON into a device document snapshot and extracts the
//! pending command, verifying:
//! - No panics for any JSON object
//! - An extracted command always has a non-blank tag and id
//! - The idle slot never yields a command
//! - The same object read as kiosk settings stays in range, and its
//!   backfill patch completes it
//!
//! cargo fuzz run fuzz_device_document

#![no_main]

use libfuzzer_sys::fuzz_target;
use kiosk::app::commands::{IDLE_TAG, RemoteCommand};
use kiosk::remote::document::{DeviceDocument, KioskSettings, MAX_VOLUME};
use serde_json::Value;

fuzz_target!(|data: &[u8]| {
    let Ok(Value::Object(body)) = serde_json::from_slice::<Value>(data) else {
        return;
    };

    let settings = KioskSettings::from_document(&body);
    assert!(settings.volume <= MAX_VOLUME);
    let mut completed = body.clone();
    completed.extend(KioskSettings::backfill_patch(&body).unwrap_or_default());
    assert!(KioskSettings::backfill_patch(&completed).is_none());

    let doc = DeviceDocument::from_body(body);
    let pending = doc.has_pending_command();

    match RemoteCommand::from_document(&doc) {
        Some(cmd) => {
            assert!(pending, "command extracted from a free slot");
            assert!(!cmd.tag.trim().is_empty());
            assert_ne!(cmd.tag, IDLE_TAG);
            assert!(!cmd.id.is_empty());
        }
        None => {}
    }
});
