//! Device identity.
//!
//! Produces a stable, human-readable device id in the form
//! `<model>_<8 hex>`, e.g. `kiosk_3fa90c17`.  The suffix is the first
//! four bytes of a SHA-256 over the model, the wall-clock nanos and the
//! process id.  It is generated once and persisted; later starts reuse it.
//! This id is:
//! - The device document name under `company/<tenant>/devices/`
//! - Substituted for `{device}` in the tenant content URL
//!
//! The host's machine id keys the remote tenant assignment, since it
//! outlives the data directory.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use log::info;

use crate::app::ports::{StorageError, StoragePort};
use crate::state::KioskState;

/// Hex characters in the id suffix.
const SUFFIX_LEN: usize = 8;

const MACHINE_ID_PATHS: [&str; 2] = ["/etc/machine-id", "/var/lib/dbus/machine-id"];

/// Derive an id from `model` and a seed.
pub fn derive_device_id(model: &str, nanos: u128, pid: u32) -> String {
    let mut h = hmac_sha256::Hash::new();
    h.update(model.as_bytes());
    h.update(nanos.to_le_bytes());
    h.update(pid.to_le_bytes());
    let digest = h.finalize();

    let mut id = String::with_capacity(model.len() + 1 + SUFFIX_LEN);
    id.push_str(model);
    id.push('_');
    for byte in &digest[..SUFFIX_LEN / 2] {
        use core::fmt::Write;
        let _ = write!(id, "{:02x}", byte);
    }
    id
}

/// The persisted device id, generating and storing one on first use.
pub fn ensure_device_id<S: StoragePort>(
    state: &KioskState<S>,
    model: &str,
) -> Result<String, StorageError> {
    if let Some(id) = state.device_id()?.filter(|id| !id.is_empty()) {
        return Ok(id);
    }
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let id = derive_device_id(model, nanos, std::process::id());
    state.set_device_id(&id)?;
    info!("DeviceId: generated {}", id);
    Ok(id)
}

/// The host's machine id, if one is readable.
pub fn host_hardware_id() -> Option<String> {
    first_machine_id(MACHINE_ID_PATHS.iter().map(Path::new))
}

fn first_machine_id<'a>(paths: impl IntoIterator<Item = &'a Path>) -> Option<String> {
    paths.into_iter().find_map(|path| {
        std::fs::read_to_string(path)
            .ok()
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty() && !s.contains('/'))
    })
}
