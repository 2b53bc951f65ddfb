use anyhow::Result;

use crate::classify::result::Classification;

/// Classifier backend trait.
///
/// A backend turns one frame's pixels into at most one label reading.
/// `Ok(None)` means no recognizable subject was present in the frame (for
/// the hand-pose domain: no hand visible). That is a normal input, not an
/// error, and it hard-resets the stabilizer downstream.
///
/// `Err` means the invocation itself failed (malformed input, inference
/// fault). The pipeline logs it and treats the frame as dropped; backends
/// must not be left in a broken state by a failed call.
pub trait ClassifierBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Classify one frame.
    ///
    /// Implementations must treat the pixel slice as read-only and must not
    /// retain it beyond the call.
    fn classify(&mut self, pixels: &[u8], width: u32, height: u32)
        -> Result<Option<Classification>>;

    /// Optional warm-up hook, called once before the first frame.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
