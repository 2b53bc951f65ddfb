//! Publication of stabilizer state to downstream consumers.
//!
//! The relay hands a `ReadingSnapshot` to every subscriber on each state
//! mutation and caches the most recent snapshot for polling consumers.
//!
//! Consumers that act on confirmations (the turn controller) must not react
//! to every published snapshot: once a label is confirmed the same value is
//! re-published on every subsequent frame. `ConfirmationLatch` enforces the
//! contract of reacting once per distinct non-empty confirmed label until it
//! is cleared back to empty.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;

use crate::stabilize::ReadingSnapshot;

/// Fan-out point between the completion context and downstream consumers.
///
/// Subscribers receive snapshots over unbounded channels; a subscriber that
/// hangs up is pruned on the next publish. `publish` is called with the
/// admission permit held, so it never races itself.
pub struct RecognitionRelay {
    subscribers: Mutex<Vec<Sender<ReadingSnapshot>>>,
    latest: Mutex<ReadingSnapshot>,
}

impl RecognitionRelay {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            latest: Mutex::new(ReadingSnapshot::default()),
        }
    }

    /// Register a consumer. Snapshots published after this call are
    /// delivered in order.
    pub fn subscribe(&self) -> Receiver<ReadingSnapshot> {
        let (tx, rx) = mpsc::channel();
        self.lock_subscribers().push(tx);
        rx
    }

    /// Deliver a snapshot to all live subscribers and remember it as the
    /// latest state.
    pub fn publish(&self, snapshot: &ReadingSnapshot) {
        {
            let mut latest = self.lock_latest();
            *latest = snapshot.clone();
        }
        let mut subscribers = self.lock_subscribers();
        subscribers.retain(|tx| tx.send(snapshot.clone()).is_ok());
    }

    /// Most recently published snapshot, for consumers that poll.
    pub fn latest(&self) -> ReadingSnapshot {
        self.lock_latest().clone()
    }

    /// Number of live subscribers, for stats logging.
    pub fn subscriber_count(&self) -> usize {
        self.lock_subscribers().len()
    }

    // Publishing must keep working even if a consumer thread panicked while
    // holding a lock; recover the poisoned guard instead of propagating.
    fn lock_subscribers(&self) -> std::sync::MutexGuard<'_, Vec<Sender<ReadingSnapshot>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_latest(&self) -> std::sync::MutexGuard<'_, ReadingSnapshot> {
        self.latest
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for RecognitionRelay {
    fn default() -> Self {
        Self::new()
    }
}

/// Edge detector over the confirmed label.
///
/// Feeding every snapshot through the latch yields `Some(label)` exactly once
/// per distinct non-empty confirmed value. A hard reset (confirmed label back
/// to empty) re-arms the latch, so the same value confirmed again after a
/// reset is reported again.
#[derive(Debug, Default)]
pub struct ConfirmationLatch {
    last_confirmed: String,
}

impl ConfirmationLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe one published snapshot; returns the confirmation to act on,
    /// if any.
    pub fn observe(&mut self, snapshot: &ReadingSnapshot) -> Option<String> {
        if snapshot.confirmed_label == self.last_confirmed {
            return None;
        }
        self.last_confirmed = snapshot.confirmed_label.clone();
        if self.last_confirmed.is_empty() {
            None
        } else {
            Some(self.last_confirmed.clone())
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
