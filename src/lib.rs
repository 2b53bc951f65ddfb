//! Recognition Stabilizer Kernel (RSK)
//!
//! This crate turns a noisy stream of per-frame classifier labels into a
//! stable, debounced "recognized" signal suitable for driving a turn-based
//! game controller.
//!
//! # Architecture
//!
//! Frames flow through three cooperating pieces:
//!
//! 1. **Admission gate** (`gate`): a single-slot busy flag shared between the
//!    frame producer and the classification completion. Frames arriving while
//!    a classification is in flight are dropped, never queued.
//! 2. **Stabilizer** (`stabilize`): the debouncing state machine. A label is
//!    promoted to "confirmed" only after an unbroken run of identical
//!    readings strictly exceeds the session threshold.
//! 3. **Relay** (`relay`): publishes `(reading, confirmed, progress)`
//!    snapshots to subscribers on every mutation and provides the
//!    exactly-once confirmation latch consumers act on.
//!
//! The `pipeline` module wires them across two threads; `classify` and
//! `ingest` are the pluggable seams for the external classifier and frame
//! source; `controller` carries the stock consumer policy.
//!
//! # Invariants
//!
//! 1. **Single flight**: at most one classification is in flight at a time.
//! 2. **Guaranteed release**: every admission is released on every exit path,
//!    including classifier faults and unwinds.
//! 3. **Run integrity**: the run length grows only while the label repeats
//!    across successful readings; any label change restarts it at zero.
//! 4. **Single promotion**: a confirmed label is never re-promoted while it
//!    remains the current reading.
//! 5. **Hard reset**: a no-subject frame clears the candidate, the run, and
//!    the confirmation; a returning subject re-confirms from scratch.
//! 6. **Bounded progress**: published progress stays within 0..=100.

use anyhow::{anyhow, Result};
use std::sync::OnceLock;

pub mod classify;
pub mod config;
pub mod controller;
pub mod gate;
pub mod ingest;
pub mod pipeline;
pub mod relay;
pub mod stabilize;
pub mod ui;

pub use classify::{BackendRegistry, Classification, ClassifierBackend};
pub use config::StabilizerdConfig;
pub use controller::{TurnCommand, TurnMapper};
pub use gate::{AdmissionGate, AdmissionPermit};
pub use ingest::{CameraConfig, CameraSource, Frame, FrameSource};
pub use pipeline::{PipelineHandle, PipelineSettings, RecognitionPipeline, StatsReport};
pub use relay::{ConfirmationLatch, RecognitionRelay};
pub use stabilize::{ReadingSnapshot, Stabilizer, Transition, DEFAULT_THRESHOLD};

/// Validate a label identifier at the configuration boundary.
///
/// Labels are opaque to the stabilizer itself; this allowlist only keeps
/// configured vocabularies and reset labels to printable, log-safe tokens.
pub fn validate_label(label: &str) -> Result<()> {
    // Compile once for hot paths.
    static LABEL_RE: OnceLock<regex::Regex> = OnceLock::new();
    let re = LABEL_RE.get_or_init(|| regex::Regex::new(r"^[a-z0-9_-]{1,64}$").unwrap());

    let candidate = label.to_lowercase();
    if !re.is_match(&candidate) {
        return Err(anyhow!("label must match ^[a-z0-9_-]{{1,64}}$"));
    }
    Ok(())
}
