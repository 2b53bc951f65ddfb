use anyhow::Result;
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::classify::backend::ClassifierBackend;
use crate::classify::result::Classification;

/// Frames whose mean pixel value falls below this are treated as empty
/// scenes with no subject to classify.
const MIN_SUBJECT_ENERGY: u32 = 8;

/// Stub backend for testing and synthetic runs.
///
/// Derives a digit label "1".."10" from a pixel hash, so a static scene
/// yields a stable label and a scene change yields a different one. Nearly
/// black frames report no subject. An optional misread rate injects random
/// wrong labels to exercise the stabilizer the way a jittery real classifier
/// would.
pub struct StubBackend {
    misread_rate: f64,
}

impl StubBackend {
    pub fn new() -> Self {
        Self { misread_rate: 0.0 }
    }

    /// Probability in 0..=1 that a classified frame reports a wrong label.
    pub fn with_misread_rate(mut self, rate: f64) -> Self {
        self.misread_rate = rate.clamp(0.0, 1.0);
        self
    }

    fn digit_from_hash(hash: &[u8; 32]) -> u8 {
        hash[0] % 10 + 1
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassifierBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn classify(
        &mut self,
        pixels: &[u8],
        _width: u32,
        _height: u32,
    ) -> Result<Option<Classification>> {
        if pixels.is_empty() {
            return Ok(None);
        }

        // Empty-scene check: sample every 100th pixel, like a cheap
        // presence detector.
        let mut sum: u64 = 0;
        let mut samples: u64 = 0;
        for &p in pixels.iter().step_by(100) {
            sum += u64::from(p);
            samples += 1;
        }
        let mean = (sum / samples.max(1)) as u32;
        if mean < MIN_SUBJECT_ENERGY {
            return Ok(None);
        }

        let hash: [u8; 32] = Sha256::digest(pixels).into();
        let mut digit = Self::digit_from_hash(&hash);

        if self.misread_rate > 0.0 && rand::thread_rng().gen_bool(self.misread_rate) {
            // Wrong label, still in the 1..=10 domain.
            digit = digit % 10 + 1;
        }

        let confidence = 0.6 + f32::from(hash[1]) / 255.0 * 0.4;
        Ok(Some(Classification::new(digit.to_string(), confidence)))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_scene_yields_stable_label() {
        let mut backend = StubBackend::new();
        let pixels = vec![120u8; 64 * 64 * 3];

        let first = backend
            .classify(&pixels, 64, 64)
            .unwrap()
            .expect("subject present");
        for _ in 0..10 {
            let next = backend
                .classify(&pixels, 64, 64)
                .unwrap()
                .expect("subject present");
            assert_eq!(next.label, first.label);
        }
    }

    #[test]
    fn different_scenes_can_yield_different_labels() {
        let mut backend = StubBackend::new();
        let labels: Vec<String> = (0u8..16)
            .map(|scene| {
                let pixels = vec![40 + scene * 10; 32 * 32 * 3];
                backend
                    .classify(&pixels, 32, 32)
                    .unwrap()
                    .expect("subject present")
                    .label
            })
            .collect();

        let distinct: std::collections::HashSet<_> = labels.iter().collect();
        assert!(distinct.len() > 1, "all scenes hashed to one label");
    }

    #[test]
    fn dark_frames_report_no_subject() {
        let mut backend = StubBackend::new();
        let pixels = vec![0u8; 64 * 64 * 3];
        assert_eq!(backend.classify(&pixels, 64, 64).unwrap(), None);
    }

    #[test]
    fn labels_stay_in_digit_domain() {
        let mut backend = StubBackend::new();
        for scene in 0u8..32 {
            let pixels = vec![20 + scene * 7; 16 * 16 * 3];
            if let Some(reading) = backend.classify(&pixels, 16, 16).unwrap() {
                let digit: u8 = reading.label.parse().expect("numeric label");
                assert!((1..=10).contains(&digit));
                assert!((0.0..=1.0).contains(&reading.confidence));
            }
        }
    }
}
