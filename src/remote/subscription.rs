//! Cancellable snapshot subscriptions.
//!
//! A [`SnapshotFeed`] is held by the document backend; the matching
//! [`Subscription`] is handed to the consumer.  Both share a bounded
//! `embassy-sync` channel.
//!
//! ```text
//! ┌──────────────┐  snapshot   ┌──────────────┐
//! │   Backend    │────────────▶│   Consumer   │
//! │ SnapshotFeed │             │ Subscription │
//! └──────────────┘◀── cancel ──└──────────────┘
//! ```
//!
//! Only the latest snapshot matters, so a full channel drops its oldest
//! entry to make room.  After [`Subscription::cancel`] (or drop) the feed
//! stops delivering and anything queued is discarded.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

/// Snapshots buffered per subscription.
const FEED_DEPTH: usize = 4;

struct Shared<T> {
    channel: Channel<CriticalSectionRawMutex, T, FEED_DEPTH>,
    cancelled: AtomicBool,
}

/// Create a connected feed/subscription pair.
pub fn subscription<T>() -> (SnapshotFeed<T>, Subscription<T>) {
    let shared = Arc::new(Shared {
        channel: Channel::new(),
        cancelled: AtomicBool::new(false),
    });
    (
        SnapshotFeed {
            shared: Arc::clone(&shared),
        },
        Subscription { shared },
    )
}

/// Producer side of a subscription.
pub struct SnapshotFeed<T> {
    shared: Arc<Shared<T>>,
}

impl<T> SnapshotFeed<T> {
    /// Deliver a snapshot.  Returns `false` once the consumer has cancelled.
    pub fn publish(&self, snapshot: T) -> bool {
        if self.is_cancelled() {
            return false;
        }
        let mut pending = snapshot;
        loop {
            match self.shared.channel.try_send(pending) {
                Ok(()) => return true,
                Err(embassy_sync::channel::TrySendError::Full(back)) => {
                    let _ = self.shared.channel.try_receive();
                    pending = back;
                }
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::Acquire)
    }
}

/// Consumer side of a subscription.
pub struct Subscription<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Subscription<T> {
    /// Wait for the next snapshot.  `None` once cancelled.
    pub async fn next(&self) -> Option<T> {
        if self.is_cancelled() {
            return None;
        }
        Some(self.shared.channel.receive().await)
    }

    /// Take the next queued snapshot without waiting.
    pub fn try_next(&self) -> Option<T> {
        if self.is_cancelled() {
            return None;
        }
        self.shared.channel.try_receive().ok()
    }

    /// Stop receiving.  Idempotent.
    pub fn cancel(&self) {
        if !self.shared.cancelled.swap(true, Ordering::AcqRel) {
            self.shared.channel.clear();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::Acquire)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.cancel();
    }
}
