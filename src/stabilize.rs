//! Temporal stabilization of per-frame classification labels.
//!
//! A single classifier reading is unreliable; the stabilizer watches the
//! stream of per-frame labels and promotes a label to "confirmed" only after
//! the same value has been observed for a sustained run of frames.
//!
//! The stabilizer is responsible for:
//! - Tracking the current candidate label and its run length
//! - Promoting a candidate once its run strictly exceeds the threshold
//! - Suppressing re-promotion of an already-confirmed label
//! - Hard-resetting when no subject is present in a frame
//!
//! The stabilizer MUST NOT:
//! - Synchronize internally; exactly one owner mutates it (the completion
//!   context, serialized by the admission gate)
//! - Drop a confirmation for any reason other than a no-subject frame

use serde::{Deserialize, Serialize};

/// Run length a candidate must strictly exceed before promotion.
pub const DEFAULT_THRESHOLD: u32 = 30;

/// Observable stabilizer state, published through the relay on every
/// mutation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadingSnapshot {
    /// Live, unconfirmed candidate ("this is what I currently think I see").
    /// Empty when no run is in progress.
    pub reading_label: String,
    /// Stable output ("this is what has been accepted"). Empty until a
    /// candidate has been promoted.
    pub confirmed_label: String,
    /// How close the current candidate is to acceptance, 0..=100.
    pub progress_pct: f64,
}

/// What a single observation did to the stabilizer state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    /// A different label arrived; it was adopted as the new candidate and the
    /// run restarted from zero.
    CandidateAdopted,
    /// The candidate repeated and its run grew by one frame.
    Accumulating,
    /// The candidate's run exceeded the threshold and it became the
    /// confirmed label.
    Promoted,
    /// The label repeated but is already confirmed; nothing changed.
    AlreadyConfirmed,
    /// A no-subject frame cleared all state.
    Reset,
}

/// Debouncer for a stream of per-frame classification labels.
///
/// One instance lives for the whole recognition session. It is reset in
/// place, never recreated mid-session.
#[derive(Debug)]
pub struct Stabilizer {
    reading_label: String,
    run_length: u32,
    confirmed_label: String,
    progress_pct: f64,
    threshold: u32,
}

impl Stabilizer {
    /// Create a stabilizer with the given promotion threshold.
    ///
    /// A threshold of 0 would promote every second frame; callers validate
    /// configured values (see `config`), and `new` clamps to at least 1 so a
    /// directly constructed stabilizer is never degenerate.
    pub fn new(threshold: u32) -> Self {
        Self {
            reading_label: String::new(),
            run_length: 0,
            confirmed_label: String::new(),
            progress_pct: 0.0,
            threshold: threshold.max(1),
        }
    }

    /// Fold one successfully classified frame into the state.
    ///
    /// Promotion is deliberately strict: the run must *exceed* the threshold,
    /// checked before the increment, so a fresh candidate confirms on its
    /// `threshold + 3`rd consecutive frame (the adopting frame leaves the run
    /// at zero). Both quirks are deliberate and covered by tests below;
    /// changing either shifts every confirmation by a frame.
    pub fn observe_label(&mut self, label: &str) -> Transition {
        if label != self.reading_label {
            // New candidate. The adopting frame does not count toward its run.
            self.reading_label = label.to_string();
            self.set_run_length(0);
            return Transition::CandidateAdopted;
        }

        if self.reading_label == self.confirmed_label {
            // Already promoted; suppress repeat promotion on every frame.
            return Transition::AlreadyConfirmed;
        }

        if self.run_length > self.threshold {
            self.confirmed_label = self.reading_label.clone();
            // Freeze displayed progress at 100%.
            self.set_run_length(self.threshold);
            Transition::Promoted
        } else {
            self.set_run_length(self.run_length + 1);
            Transition::Accumulating
        }
    }

    /// Fold a no-subject frame into the state.
    ///
    /// This is a hard reset: the partial run and any prior confirmation are
    /// discarded, and a returning subject must re-confirm from scratch even
    /// if it is the same value as before.
    pub fn observe_absence(&mut self) -> Transition {
        self.reading_label.clear();
        self.confirmed_label.clear();
        self.set_run_length(0);
        Transition::Reset
    }

    /// Snapshot of the observable fields for publication.
    pub fn snapshot(&self) -> ReadingSnapshot {
        ReadingSnapshot {
            reading_label: self.reading_label.clone(),
            confirmed_label: self.confirmed_label.clone(),
            progress_pct: self.progress_pct,
        }
    }

    pub fn reading_label(&self) -> &str {
        &self.reading_label
    }

    pub fn confirmed_label(&self) -> &str {
        &self.confirmed_label
    }

    pub fn run_length(&self) -> u32 {
        self.run_length
    }

    pub fn progress_pct(&self) -> f64 {
        self.progress_pct
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    fn set_run_length(&mut self, run_length: u32) {
        self.run_length = run_length;
        let pct = f64::from(run_length) / f64::from(self.threshold) * 100.0;
        self.progress_pct = pct.min(100.0);
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(stabilizer: &mut Stabilizer, label: &str, frames: u32) {
        for _ in 0..frames {
            stabilizer.observe_label(label);
        }
    }

    #[test]
    fn adopting_frame_leaves_run_at_zero() {
        let mut s = Stabilizer::new(30);
        assert_eq!(s.observe_label("3"), Transition::CandidateAdopted);
        assert_eq!(s.reading_label(), "3");
        assert_eq!(s.run_length(), 0);
        assert_eq!(s.progress_pct(), 0.0);
    }

    #[test]
    fn run_accumulates_monotonically_by_one() {
        let mut s = Stabilizer::new(30);
        s.observe_label("7");

        let mut prev = s.run_length();
        for _ in 0..25 {
            assert_eq!(s.observe_label("7"), Transition::Accumulating);
            let run = s.run_length();
            assert_eq!(run, prev + 1);
            prev = run;
        }
    }

    #[test]
    fn label_change_resets_run_immediately() {
        let mut s = Stabilizer::new(30);
        s.observe_label("7");
        feed(&mut s, "7", 20);
        assert_eq!(s.run_length(), 20);

        assert_eq!(s.observe_label("4"), Transition::CandidateAdopted);
        assert_eq!(s.reading_label(), "4");
        assert_eq!(s.run_length(), 0);
        assert_eq!(s.progress_pct(), 0.0);
    }

    #[test]
    fn promotion_is_strictly_after_threshold() {
        let mut s = Stabilizer::new(30);

        // Frame 1 adopts; frames 2..=32 raise the run to 31.
        s.observe_label("5");
        feed(&mut s, "5", 31);
        assert_eq!(s.run_length(), 31);
        assert_eq!(s.confirmed_label(), "", "run == 31 has not yet promoted");

        // Frame 33 enters with the run above the threshold and promotes.
        assert_eq!(s.observe_label("5"), Transition::Promoted);
        assert_eq!(s.confirmed_label(), "5");
        assert_eq!(s.run_length(), 30, "run clamps back to threshold");
        assert_eq!(s.progress_pct(), 100.0);
    }

    #[test]
    fn not_confirmed_while_run_equals_threshold() {
        let mut s = Stabilizer::new(30);
        s.observe_label("5");
        feed(&mut s, "5", 30);
        assert_eq!(s.run_length(), 30);
        assert_eq!(s.confirmed_label(), "");
        assert_eq!(s.progress_pct(), 100.0);
    }

    #[test]
    fn no_repromotion_once_confirmed() {
        let mut s = Stabilizer::new(30);
        s.observe_label("5");
        feed(&mut s, "5", 32);
        assert_eq!(s.confirmed_label(), "5");
        let frozen = s.snapshot();

        for _ in 0..50 {
            assert_eq!(s.observe_label("5"), Transition::AlreadyConfirmed);
        }
        assert_eq!(s.snapshot(), frozen, "confirmed state is inert");
    }

    #[test]
    fn hard_reset_clears_everything_and_is_idempotent() {
        let mut s = Stabilizer::new(30);
        s.observe_label("9");
        feed(&mut s, "9", 32);
        assert_eq!(s.confirmed_label(), "9");

        assert_eq!(s.observe_absence(), Transition::Reset);
        let once = s.snapshot();
        assert_eq!(once, ReadingSnapshot::default());

        assert_eq!(s.observe_absence(), Transition::Reset);
        assert_eq!(s.snapshot(), once);
    }

    #[test]
    fn absence_mid_run_restarts_the_run_from_scratch() {
        let mut s = Stabilizer::new(30);

        // 20 frames of "3", then the subject disappears, then 20 more "3".
        s.observe_label("3");
        feed(&mut s, "3", 19);
        s.observe_absence();
        s.observe_label("3");
        feed(&mut s, "3", 19);

        assert_eq!(s.confirmed_label(), "", "split runs never confirm");
        assert_eq!(s.run_length(), 19);
    }

    #[test]
    fn same_value_must_reconfirm_after_reset() {
        let mut s = Stabilizer::new(30);
        s.observe_label("5");
        feed(&mut s, "5", 32);
        assert_eq!(s.confirmed_label(), "5");

        s.observe_absence();

        // The same value returns; a full fresh run is required again.
        s.observe_label("5");
        feed(&mut s, "5", 31);
        assert_eq!(s.confirmed_label(), "");
        s.observe_label("5");
        assert_eq!(s.confirmed_label(), "5");
    }

    #[test]
    fn progress_is_clamped_and_never_negative() {
        let mut s = Stabilizer::new(10);
        s.observe_label("2");
        for _ in 0..40 {
            s.observe_label("2");
            let pct = s.progress_pct();
            assert!((0.0..=100.0).contains(&pct), "progress {} out of range", pct);
        }
        assert_eq!(s.progress_pct(), 100.0);
    }

    #[test]
    fn progress_tracks_ratio_against_threshold() {
        let mut s = Stabilizer::new(20);
        s.observe_label("8");
        feed(&mut s, "8", 5);
        assert_eq!(s.progress_pct(), 25.0);
        feed(&mut s, "8", 5);
        assert_eq!(s.progress_pct(), 50.0);
    }

    #[test]
    fn interleaved_labels_never_accumulate() {
        let mut s = Stabilizer::new(5);
        for _ in 0..50 {
            s.observe_label("1");
            s.observe_label("2");
        }
        assert_eq!(s.confirmed_label(), "");
        assert_eq!(s.run_length(), 0);
    }

    #[test]
    fn switching_away_from_confirmed_starts_a_new_candidate() {
        let mut s = Stabilizer::new(30);
        s.observe_label("5");
        feed(&mut s, "5", 32);
        assert_eq!(s.confirmed_label(), "5");

        // A new value starts accumulating while "5" stays confirmed.
        s.observe_label("6");
        assert_eq!(s.reading_label(), "6");
        assert_eq!(s.confirmed_label(), "5");
        assert_eq!(s.run_length(), 0);

        feed(&mut s, "6", 32);
        assert_eq!(s.confirmed_label(), "6");
    }

    #[test]
    fn degenerate_threshold_is_clamped() {
        let s = Stabilizer::new(0);
        assert_eq!(s.threshold(), 1);
    }
}
