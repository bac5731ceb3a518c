//! File-backed key-value store.
//!
//! Implements both [`ConfigPort`] and [`StoragePort`] for the kiosk agent.
//!
//! - Namespace isolation: keys are stored as `namespace::key`.
//! - Atomic writes: the whole image is postcard-encoded to a temp file and
//!   renamed over the original, so a crash leaves either the old or the
//!   new image on disk, never a torn one.
//! - Config validation: all fields are range-checked before persistence.
//!
//! [`FileStore::in_memory`] skips the disk entirely (tests, dry runs).

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort, StorageError, StoragePort};
use crate::config::KioskConfig;
use crate::remote::document::DocPath;

const CONFIG_NAMESPACE: &str = "kiosk";
const CONFIG_KEY: &str = "syscfg";

type Image = BTreeMap<String, Vec<u8>>;

pub struct FileStore {
    store: Mutex<Image>,
    /// `None` for the in-memory backend.
    path: Option<PathBuf>,
}

impl FileStore {
    /// Open (or create) the store image at `path`.
    ///
    /// A missing file is an empty store.  An unreadable image is
    /// [`StorageError::Corrupted`]; the caller decides whether to start
    /// over.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let image = match fs::read(&path) {
            Ok(bytes) => postcard::from_bytes::<Image>(&bytes).map_err(|_| {
                warn!("FileStore: image {} unreadable", path.display());
                StorageError::Corrupted
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("FileStore: no image at {}, starting empty", path.display());
                Image::new()
            }
            Err(e) => {
                warn!("FileStore: reading {} failed: {}", path.display(), e);
                return Err(StorageError::IoError);
            }
        };
        info!(
            "FileStore: opened {} ({} keys)",
            path.display(),
            image.len()
        );
        Ok(Self {
            store: Mutex::new(image),
            path: Some(path),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            store: Mutex::new(Image::new()),
            path: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Image>, StorageError> {
        self.store.lock().map_err(|_| StorageError::IoError)
    }

    /// Write the image to disk: temp file, then rename.
    fn flush(&self, image: &Image) -> Result<(), StorageError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let bytes = postcard::to_allocvec(image).map_err(|_| StorageError::Corrupted)?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, &bytes)
            .and_then(|()| fs::rename(&tmp, path))
            .map_err(|e| {
                warn!("FileStore: flushing {} failed: {}", path.display(), e);
                match e.kind() {
                    ErrorKind::StorageFull => StorageError::Full,
                    _ => StorageError::IoError,
                }
            })
    }

    /// Store (or, with `None`, remove) one key and flush; on a failed flush the
    /// in-memory image is rolled back so memory and disk agree.
    fn update(&self, composite: String, value: Option<Vec<u8>>) -> Result<(), StorageError> {
        let mut image = self.lock()?;
        let previous = match value {
            Some(data) => image.insert(composite.clone(), data),
            None => image.remove(&composite),
        };
        if let Err(e) = self.flush(&image) {
            match previous {
                Some(old) => image.insert(composite, old),
                None => image.remove(&composite),
            };
            return Err(e);
        }
        Ok(())
    }
}

/// Tenant and model names end up as remote path segments, so they follow
/// the segment rules plus printable ASCII only.
fn validate_name(name: &str, what: &'static str) -> Result<(), ConfigError> {
    let printable = name.bytes().all(|b| b == b' ' || b.is_ascii_graphic());
    if !printable || DocPath::new([name]).is_err() {
        return Err(ConfigError::ValidationFailed(what));
    }
    Ok(())
}

fn validate_config(cfg: &KioskConfig) -> Result<(), ConfigError> {
    validate_name(
        &cfg.default_tenant,
        "default_tenant must be non-empty printable ASCII without '/'",
    )?;
    validate_name(
        &cfg.device_model,
        "device_model must be non-empty printable ASCII without '/'",
    )?;
    if cfg.content_url_template.trim().is_empty() {
        return Err(ConfigError::ValidationFailed(
            "content_url_template must be non-empty",
        ));
    }
    if cfg.update_url.trim().is_empty() {
        return Err(ConfigError::ValidationFailed("update_url must be non-empty"));
    }
    if cfg.day_switch_offset_secs > 3599 {
        return Err(ConfigError::ValidationFailed(
            "day_switch_offset_secs must be 0–3599",
        ));
    }
    if !(100..=60_000).contains(&cfg.wake_retry_delay_ms) {
        return Err(ConfigError::ValidationFailed(
            "wake_retry_delay_ms must be 100–60000",
        ));
    }
    if !(5..=3600).contains(&cfg.heartbeat_interval_secs) {
        return Err(ConfigError::ValidationFailed(
            "heartbeat_interval_secs must be 5–3600",
        ));
    }
    if !(100..=10_000).contains(&cfg.poll_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "poll_interval_ms must be 100–10000",
        ));
    }
    let hooks = [
        &cfg.hooks.lock,
        &cfg.hooks.wake,
        &cfg.hooks.reload,
        &cfg.hooks.open_url,
        &cfg.hooks.update,
        &cfg.hooks.brightness,
        &cfg.hooks.volume,
    ];
    if hooks
        .iter()
        .any(|h| h.as_deref().is_some_and(|cmd| cmd.trim().is_empty()))
    {
        return Err(ConfigError::ValidationFailed("hooks, if set, must be non-empty"));
    }
    Ok(())
}

impl ConfigPort for FileStore {
    fn load(&self) -> Result<KioskConfig, ConfigError> {
        let key = Self::composite_key(CONFIG_NAMESPACE, CONFIG_KEY);
        let image = self.lock().map_err(|_| ConfigError::IoError)?;
        if let Some(bytes) = image.get(&key) {
            let cfg: KioskConfig = postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
            info!("FileStore: loaded config from store");
            Ok(cfg)
        } else {
            info!("FileStore: no stored config, using defaults");
            Ok(KioskConfig::default())
        }
    }

    fn save(&self, config: &KioskConfig) -> Result<(), ConfigError> {
        validate_config(config)?;
        let key = Self::composite_key(CONFIG_NAMESPACE, CONFIG_KEY);
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        self.update(key, Some(bytes)).map_err(|_| ConfigError::IoError)?;
        info!("FileStore: config saved");
        Ok(())
    }
}

impl StoragePort for FileStore {
    fn read(&self, namespace: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let composite = Self::composite_key(namespace, key);
        self.lock()?
            .get(&composite)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    fn write(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.update(Self::composite_key(namespace, key), Some(data.to_vec()))
    }

    fn delete(&self, namespace: &str, key: &str) -> Result<(), StorageError> {
        let composite = Self::composite_key(namespace, key);
        if !self.lock()?.contains_key(&composite) {
            return Ok(());
        }
        self.update(composite, None)
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        let composite = Self::composite_key(namespace, key);
        self.lock().is_ok_and(|image| image.contains_key(&composite))
    }
}
