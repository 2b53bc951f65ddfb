//! Recognition pipeline: frame producer and classification completion.
//!
//! Two execution contexts run for the life of a session:
//!
//! - **producer**: pulls frames from the `FrameSource` at its native rate and
//!   asks the admission gate for entry. Frames arriving while a
//!   classification is in flight are dropped on the spot; nothing queues.
//! - **completion**: classifies each admitted frame, folds the outcome into
//!   the stabilizer (its sole owner), publishes a snapshot through the relay,
//!   then releases the gate by dropping the permit.
//!
//! The gate admits one frame at a time, so the channel between the two
//! threads never holds more than one element and the stabilizer is mutated
//! by exactly one completion at a time.
//!
//! Classifier faults are recovered locally: the frame counts as dropped, no
//! state mutation occurs, the fault is logged, and the permit still releases.
//! There is no cancellation and no timeout; admitted work runs to completion.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::classify::ClassifierBackend;
use crate::gate::{AdmissionGate, AdmissionPermit};
use crate::ingest::{Frame, FrameSource};
use crate::relay::RecognitionRelay;
use crate::stabilize::{Stabilizer, Transition};

/// Settings for one pipeline session.
#[derive(Clone, Debug)]
pub struct PipelineSettings {
    /// Run length a candidate must strictly exceed before promotion.
    pub threshold: u32,
    /// Producer pacing between frame captures.
    pub frame_interval: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            threshold: crate::stabilize::DEFAULT_THRESHOLD,
            frame_interval: Duration::from_millis(33),
        }
    }
}

/// Counters shared by both pipeline threads, read by health logging.
#[derive(Debug, Default)]
pub struct PipelineStats {
    frames_seen: AtomicU64,
    frames_admitted: AtomicU64,
    frames_dropped_busy: AtomicU64,
    no_subject_frames: AtomicU64,
    classifier_faults: AtomicU64,
    confirmations: AtomicU64,
}

/// Plain-value copy of the counters for logging and assertions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatsReport {
    pub frames_seen: u64,
    pub frames_admitted: u64,
    pub frames_dropped_busy: u64,
    pub no_subject_frames: u64,
    pub classifier_faults: u64,
    pub confirmations: u64,
}

impl PipelineStats {
    pub fn report(&self) -> StatsReport {
        StatsReport {
            frames_seen: self.frames_seen.load(Ordering::Relaxed),
            frames_admitted: self.frames_admitted.load(Ordering::Relaxed),
            frames_dropped_busy: self.frames_dropped_busy.load(Ordering::Relaxed),
            no_subject_frames: self.no_subject_frames.load(Ordering::Relaxed),
            classifier_faults: self.classifier_faults.load(Ordering::Relaxed),
            confirmations: self.confirmations.load(Ordering::Relaxed),
        }
    }
}

/// One admitted frame travelling from producer to completion, carrying the
/// permit that proves its admission.
struct AdmittedFrame {
    frame: Frame,
    permit: AdmissionPermit,
}

/// Handle for a running pipeline session.
pub struct PipelineHandle {
    stats: Arc<PipelineStats>,
    gate: AdmissionGate,
    shutdown: Arc<AtomicBool>,
    producer: Option<JoinHandle<()>>,
    completion: Option<JoinHandle<()>>,
}

impl PipelineHandle {
    pub fn stats(&self) -> StatsReport {
        self.stats.report()
    }

    /// Shared counters, for callers that need to read stats after `stop`.
    pub fn stats_handle(&self) -> Arc<PipelineStats> {
        self.stats.clone()
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    /// Stop both threads and wait for them to finish.
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.producer.take() {
            join.join()
                .map_err(|_| anyhow!("pipeline producer thread panicked"))?;
        }
        if let Some(join) = self.completion.take() {
            join.join()
                .map_err(|_| anyhow!("pipeline completion thread panicked"))?;
        }
        Ok(())
    }
}

/// Recognition pipeline factory.
pub struct RecognitionPipeline;

impl RecognitionPipeline {
    /// Spawn the producer and completion threads for one session.
    ///
    /// The caller keeps the relay and subscribes to it; the completion thread
    /// publishes every stabilizer mutation through it.
    pub fn spawn(
        mut source: Box<dyn FrameSource>,
        backend: Arc<Mutex<dyn ClassifierBackend>>,
        relay: Arc<RecognitionRelay>,
        settings: PipelineSettings,
    ) -> Result<PipelineHandle> {
        source.connect()?;

        let gate = AdmissionGate::new();
        let stats = Arc::new(PipelineStats::default());
        let shutdown = Arc::new(AtomicBool::new(false));
        let (work_tx, work_rx) = mpsc::channel::<AdmittedFrame>();

        let producer = {
            let gate = gate.clone();
            let stats = stats.clone();
            let shutdown = shutdown.clone();
            let interval = settings.frame_interval;
            std::thread::spawn(move || {
                run_producer(source.as_mut(), &gate, &stats, &shutdown, interval, work_tx);
            })
        };

        let completion = {
            let stats = stats.clone();
            let threshold = settings.threshold;
            std::thread::spawn(move || {
                run_completion(work_rx, backend, relay, stats, threshold);
            })
        };

        Ok(PipelineHandle {
            stats,
            gate,
            shutdown,
            producer: Some(producer),
            completion: Some(completion),
        })
    }
}

fn run_producer(
    source: &mut dyn FrameSource,
    gate: &AdmissionGate,
    stats: &PipelineStats,
    shutdown: &AtomicBool,
    interval: Duration,
    work_tx: mpsc::Sender<AdmittedFrame>,
) {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        let frame = match source.next_frame() {
            Ok(frame) => frame,
            Err(err) => {
                log::warn!("frame capture failed: {}", err);
                std::thread::sleep(interval);
                continue;
            }
        };
        stats.frames_seen.fetch_add(1, Ordering::Relaxed);

        match gate.try_acquire() {
            Some(permit) => {
                stats.frames_admitted.fetch_add(1, Ordering::Relaxed);
                if work_tx.send(AdmittedFrame { frame, permit }).is_err() {
                    // Completion thread is gone; nothing left to admit to.
                    log::error!("completion context disappeared; stopping producer");
                    break;
                }
            }
            None => {
                // Classification in flight: drop the frame, do not queue.
                stats.frames_dropped_busy.fetch_add(1, Ordering::Relaxed);
                log::trace!("frame {} dropped while busy", frame.seq);
            }
        }

        if !interval.is_zero() {
            std::thread::sleep(interval);
        }
    }
    // Dropping work_tx lets the completion loop drain and exit.
}

fn run_completion(
    work_rx: mpsc::Receiver<AdmittedFrame>,
    backend: Arc<Mutex<dyn ClassifierBackend>>,
    relay: Arc<RecognitionRelay>,
    stats: Arc<PipelineStats>,
    threshold: u32,
) {
    {
        let mut guard = match backend.lock() {
            Ok(guard) => guard,
            Err(_) => {
                log::error!("classifier backend lock poisoned before warm-up");
                return;
            }
        };
        if let Err(err) = guard.warm_up() {
            log::warn!("classifier warm-up failed: {}", err);
        }
    }

    let mut stabilizer = Stabilizer::new(threshold);

    for AdmittedFrame { frame, permit } in work_rx {
        let outcome = match backend.lock() {
            Ok(mut guard) => guard.classify(&frame.pixels, frame.width, frame.height),
            Err(_) => Err(anyhow!("classifier backend lock poisoned")),
        };

        match outcome {
            Ok(Some(reading)) => {
                let transition = stabilizer.observe_label(&reading.label);
                if transition == Transition::Promoted {
                    stats.confirmations.fetch_add(1, Ordering::Relaxed);
                    log::info!(
                        "confirmed '{}' after frame {} (confidence {:.2})",
                        reading.label,
                        frame.seq,
                        reading.confidence
                    );
                }
                relay.publish(&stabilizer.snapshot());
            }
            Ok(None) => {
                stats.no_subject_frames.fetch_add(1, Ordering::Relaxed);
                stabilizer.observe_absence();
                relay.publish(&stabilizer.snapshot());
            }
            Err(err) => {
                // Invocation fault: treat the frame as dropped. No state
                // mutation, no publication; the consumer just sees no
                // progress for this frame.
                stats.classifier_faults.fetch_add(1, Ordering::Relaxed);
                log::warn!("classifier fault on frame {}: {}", frame.seq, err);
            }
        }

        // Gate release on every path above.
        drop(permit);
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{ScriptedBackend, StubBackend};
    use crate::ingest::{CameraConfig, CameraSource};
    use crate::relay::ConfirmationLatch;

    fn spawn_scripted(
        backend: ScriptedBackend,
        threshold: u32,
    ) -> (
        PipelineHandle,
        mpsc::Receiver<crate::stabilize::ReadingSnapshot>,
    ) {
        let source = CameraSource::new(CameraConfig {
            url: "stub://pipeline_test".to_string(),
            target_fps: 0,
            width: 32,
            height: 24,
        })
        .expect("stub camera");
        let relay = Arc::new(RecognitionRelay::new());
        // Subscribe before the threads start so no snapshot is missed.
        let rx = relay.subscribe();
        let handle = RecognitionPipeline::spawn(
            Box::new(source),
            Arc::new(Mutex::new(backend)),
            relay,
            PipelineSettings {
                threshold,
                frame_interval: Duration::ZERO,
            },
        )
        .expect("spawn pipeline");
        (handle, rx)
    }

    fn wait_for_confirmation(
        rx: &mpsc::Receiver<crate::stabilize::ReadingSnapshot>,
    ) -> Option<String> {
        let mut latch = ConfirmationLatch::new();
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while std::time::Instant::now() < deadline {
            match rx.recv_timeout(Duration::from_millis(100)) {
                Ok(snapshot) => {
                    if let Some(label) = latch.observe(&snapshot) {
                        return Some(label);
                    }
                }
                Err(mpsc::RecvTimeoutError::Timeout) => continue,
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }
        None
    }

    #[test]
    fn sustained_run_confirms_through_the_pipeline() {
        let backend = ScriptedBackend::repeating("5", 64);
        let (handle, rx) = spawn_scripted(backend, 30);

        let confirmed = wait_for_confirmation(&rx);
        assert_eq!(confirmed.as_deref(), Some("5"));

        handle.stop().expect("stop pipeline");
    }

    #[test]
    fn classifier_faults_do_not_stall_the_gate() {
        use crate::classify::ScriptStep;

        // Faults sprinkled through an otherwise confirmable run.
        let mut steps = Vec::new();
        for i in 0..80 {
            if i % 10 == 3 {
                steps.push(ScriptStep::Fault);
            } else {
                steps.push(ScriptStep::label("8"));
            }
        }
        let backend = ScriptedBackend::new(steps);

        let (handle, rx) = spawn_scripted(backend, 30);

        let confirmed = wait_for_confirmation(&rx);
        assert_eq!(confirmed.as_deref(), Some("8"));

        let stats = handle.stats();
        assert!(stats.classifier_faults > 0, "faults were injected");
        handle.stop().expect("stop pipeline");
    }

    #[test]
    fn stats_accounting_is_consistent() {
        let backend = ScriptedBackend::repeating("2", 40);
        let (handle, _rx) = spawn_scripted(backend, 5);

        std::thread::sleep(Duration::from_millis(200));
        let stats_handle = handle.stats_handle();
        handle.stop().expect("stop pipeline");

        // Read after both threads are joined so the counters are settled.
        let stats = stats_handle.report();
        assert_eq!(
            stats.frames_seen,
            stats.frames_admitted + stats.frames_dropped_busy
        );
    }

    #[test]
    fn stub_backend_sessions_reset_on_empty_scenes() {
        // The synthetic camera inserts empty scenes; the stub classifier must
        // report them as no-subject and the pipeline must count them.
        let source = CameraSource::new(CameraConfig {
            url: "stub://reset_test".to_string(),
            target_fps: 0,
            width: 16,
            height: 16,
        })
        .expect("stub camera");
        let relay = Arc::new(RecognitionRelay::new());
        let handle = RecognitionPipeline::spawn(
            Box::new(source),
            Arc::new(Mutex::new(StubBackend::new())),
            relay.clone(),
            PipelineSettings {
                threshold: 5,
                frame_interval: Duration::ZERO,
            },
        )
        .expect("spawn pipeline");

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        let mut saw_reset = false;
        while std::time::Instant::now() < deadline {
            let stats = handle.stats();
            if stats.no_subject_frames > 0 && stats.confirmations > 0 {
                saw_reset = true;
                break;
            }
            std::thread::sleep(Duration::from_millis(20));
        }

        handle.stop().expect("stop pipeline");
        assert!(saw_reset, "expected confirmations and no-subject resets");
    }
}
