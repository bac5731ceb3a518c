//! Directory-backed remote document store.
//!
//! Implements [`RemoteDocumentPort`] over a directory tree: the document
//! at `company/acme/devices/kiosk_1` lives in
//! `<root>/company/acme/devices/kiosk_1.json`.  An operator (or a sync
//! tool) edits those files; [`JsonDocStore::poll`] notices the change and
//! pushes a snapshot to every live subscription.
//!
//! ```text
//!   operator edit ──▶ file ──poll()──▶ SnapshotFeed ──▶ Subscription
//!   merge()       ──▶ file ──────────▶ SnapshotFeed ──▶ Subscription
//! ```
//!
//! Writes go through a temp file and a rename, so a reader never sees a
//! half-written document.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use log::{debug, info, warn};
use serde_json::Value;

use crate::app::ports::{Document, RemoteDocumentPort, RemoteError};
use crate::remote::document::DocPath;
use crate::remote::subscription::{SnapshotFeed, Subscription, subscription};

struct Watch {
    /// Last snapshot delivered.
    last: Option<Document>,
    feeds: Vec<SnapshotFeed<Option<Document>>>,
}

pub struct JsonDocStore {
    root: PathBuf,
    watches: Mutex<HashMap<DocPath, Watch>>,
}

impl JsonDocStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        info!("JsonDocStore: documents under {}", root.display());
        Self {
            root,
            watches: Mutex::new(HashMap::new()),
        }
    }

    fn file_for(&self, path: &DocPath) -> PathBuf {
        let mut file = self.root.clone();
        let mut segments = path.segments().peekable();
        while let Some(seg) = segments.next() {
            if segments.peek().is_some() {
                file.push(seg);
            } else {
                file.push(format!("{}.json", seg));
            }
        }
        file
    }

    fn read(&self, path: &DocPath) -> Result<Option<Document>, RemoteError> {
        let file = self.file_for(path);
        let bytes = match fs::read(&file) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(RemoteError::Unavailable(format!("{}: {}", file.display(), e))),
        };
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(doc)) => Ok(Some(doc)),
            Ok(_) => Err(RemoteError::Malformed(format!("{} is not an object", path))),
            Err(e) => Err(RemoteError::Malformed(format!("{}: {}", path, e))),
        }
    }

    fn write(&self, path: &DocPath, doc: &Document) -> Result<(), RemoteError> {
        let file = self.file_for(path);
        let io = |e: std::io::Error| RemoteError::Unavailable(format!("{}: {}", file.display(), e));
        if let Some(dir) = file.parent() {
            fs::create_dir_all(dir).map_err(io)?;
        }
        let bytes =
            serde_json::to_vec_pretty(doc).map_err(|e| RemoteError::Malformed(e.to_string()))?;
        let tmp = file.with_extension("json.tmp");
        fs::write(&tmp, bytes).map_err(io)?;
        fs::rename(&tmp, &file).map_err(io)
    }

    /// Deliver `snapshot` to the watchers of `path` if it differs from the
    /// last one they saw.  Returns whether anything was published.
    fn notify(watch: &mut Watch, path: &DocPath, snapshot: Option<Document>) -> bool {
        watch.feeds.retain(|f| !f.is_cancelled());
        if watch.last == snapshot {
            return false;
        }
        debug!("JsonDocStore: {} changed", path);
        for feed in &watch.feeds {
            feed.publish(snapshot.clone());
        }
        watch.last = snapshot;
        true
    }

    /// Re-read every watched document and publish the ones that changed.
    /// Returns the number of documents that changed.
    pub fn poll(&self) -> usize {
        let Ok(mut watches) = self.watches.lock() else {
            return 0;
        };
        watches.retain(|_, w| w.feeds.iter().any(|f| !f.is_cancelled()));

        let mut changed = 0;
        for (path, watch) in watches.iter_mut() {
            match self.read(path) {
                Ok(snapshot) => {
                    if Self::notify(watch, path, snapshot) {
                        changed += 1;
                    }
                }
                Err(e) => warn!("JsonDocStore: {}", e),
            }
        }
        changed
    }
}

impl RemoteDocumentPort for JsonDocStore {
    async fn fetch(&self, path: &DocPath) -> Result<Option<Document>, RemoteError> {
        self.read(path)
    }

    async fn merge(&self, path: &DocPath, patch: Document) -> Result<(), RemoteError> {
        let mut doc = self.read(path)?.unwrap_or_default();
        for (key, value) in patch {
            doc.insert(key, value);
        }
        self.write(path, &doc)?;

        let mut watches = self
            .watches
            .lock()
            .map_err(|_| RemoteError::Unavailable("watch table poisoned".into()))?;
        if let Some(watch) = watches.get_mut(path) {
            Self::notify(watch, path, Some(doc));
        }
        Ok(())
    }

    fn subscribe(&self, path: &DocPath) -> Result<Subscription<Option<Document>>, RemoteError> {
        let current = self.read(path)?;
        let (feed, sub) = subscription();
        feed.publish(current.clone());

        let mut watches = self
            .watches
            .lock()
            .map_err(|_| RemoteError::Unavailable("watch table poisoned".into()))?;
        let watch = watches.entry(path.clone()).or_insert_with(|| Watch {
            last: current.clone(),
            feeds: Vec::new(),
        });
        watch.last = current;
        watch.feeds.push(feed);
        info!("JsonDocStore: watching {}", path);
        Ok(sub)
    }
}
