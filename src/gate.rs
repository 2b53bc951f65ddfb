//! Frame admission control.
//!
//! This module provides the single-slot gate that keeps at most one
//! classification in flight at any time:
//!
//! - `AdmissionGate`: cloneable handle over one shared busy flag.
//! - `AdmissionPermit`: scoped guard proving admission; releases on drop.
//!
//! Frames arriving while the gate is busy are dropped by the caller, not
//! queued. `try_acquire` never blocks the producer.
//!
//! The gate MUST NOT:
//! - Queue or buffer admission requests
//! - Be released by any path other than dropping the permit
//! - Admit a second classification while a permit is live

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Single-slot admission gate shared between the frame producer and the
/// classification completion contexts.
///
/// Cloning the gate clones the handle, not the slot: all clones contend for
/// the same single permit.
#[derive(Clone, Debug)]
pub struct AdmissionGate {
    busy: Arc<AtomicBool>,
}

impl AdmissionGate {
    pub fn new() -> Self {
        Self {
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Try to admit one classification.
    ///
    /// Returns `None` when a classification is already in flight; the caller
    /// must drop the frame. Non-blocking on every path.
    pub fn try_acquire(&self) -> Option<AdmissionPermit> {
        match self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => Some(AdmissionPermit {
                busy: self.busy.clone(),
            }),
            Err(_) => None,
        }
    }

    /// Current busy state, for stats and tests.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}

impl Default for AdmissionGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Proof of admission for exactly one classification.
///
/// The gate frees when the permit drops, so release happens on every exit
/// path: successful classification, classifier fault, no-subject reset, and
/// unwinding. There is no manual release method to forget.
#[derive(Debug)]
pub struct AdmissionPermit {
    busy: Arc<AtomicBool>,
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    #[test]
    fn second_acquire_fails_while_permit_live() {
        let gate = AdmissionGate::new();

        let permit = gate.try_acquire().expect("gate starts free");
        assert!(gate.is_busy());
        assert!(gate.try_acquire().is_none());

        drop(permit);
        assert!(!gate.is_busy());
        assert!(gate.try_acquire().is_some());
    }

    #[test]
    fn permit_releases_on_unwind() {
        let gate = AdmissionGate::new();
        let contended = gate.clone();

        let result = std::panic::catch_unwind(move || {
            let _permit = contended.try_acquire().expect("gate starts free");
            panic!("classifier blew up");
        });
        assert!(result.is_err());

        // The unwound path still released the slot.
        assert!(!gate.is_busy());
        assert!(gate.try_acquire().is_some());
    }

    #[test]
    fn at_most_one_winner_under_contention() {
        let gate = AdmissionGate::new();
        let wins = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = gate.clone();
                let wins = wins.clone();
                thread::spawn(move || {
                    if let Some(permit) = gate.try_acquire() {
                        wins.fetch_add(1, Ordering::SeqCst);
                        // Hold the permit long enough for the other threads
                        // to observe contention.
                        thread::sleep(std::time::Duration::from_millis(20));
                        drop(permit);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("contender thread");
        }

        assert_eq!(wins.load(Ordering::SeqCst), 1);
        assert!(!gate.is_busy());
    }

    #[test]
    fn every_acquire_is_eventually_released() {
        let gate = AdmissionGate::new();
        for _ in 0..100 {
            let permit = gate.try_acquire().expect("slot free each round");
            drop(permit);
        }
        assert!(!gate.is_busy());
    }
}
