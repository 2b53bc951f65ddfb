//! Frame ingestion sources.
//!
//! This module provides the frame-source seam for the recognition pipeline:
//! - `Frame`: one captured RGB frame plus its sequence number
//! - `FrameSource`: trait the producer thread pulls frames from
//! - `CameraSource`: synthetic camera (`stub://` URLs) for demos and tests
//!
//! Real capture hardware sits behind this seam; the core never sees device
//! particulars, orientations, or pixel formats beyond packed RGB.
//!
//! The ingestion layer is responsible for:
//! - Producing frames at (approximately) the configured rate
//! - Tagging frames with monotonically increasing sequence numbers
//!
//! The ingestion layer MUST NOT:
//! - Buffer frames for later classification (backpressure is drop-by-discard
//!   at the admission gate, never a queue)
//! - Block on downstream classification progress

pub mod camera;

pub use camera::{CameraConfig, CameraSource};

use anyhow::Result;

/// One captured frame. Pixels are packed RGB, row-major.
#[derive(Clone, Debug)]
pub struct Frame {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Capture sequence number, starting at 1.
    pub seq: u64,
}

/// Statistics for a frame source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub origin: String,
}

/// A source of ordered frames arriving at an external, uncontrolled rate.
pub trait FrameSource: Send {
    /// Establish the capture session.
    fn connect(&mut self) -> Result<()>;

    /// Capture the next frame.
    fn next_frame(&mut self) -> Result<Frame>;

    /// Whether the source is still delivering.
    fn is_healthy(&self) -> bool {
        true
    }

    /// Capture statistics for health logging.
    fn stats(&self) -> SourceStats;
}
