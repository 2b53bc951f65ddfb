//! stabilizerd - Recognition Stabilizer Kernel daemon
//!
//! This daemon:
//! 1. Ingests frames from the configured camera source
//! 2. Admits at most one frame at a time into classification
//! 3. Debounces per-frame labels into stable confirmed readings
//! 4. Publishes reading snapshots through the relay
//! 5. Maps each distinct confirmation to a turn command and logs it

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};

use stabilizer_kernel::classify::StubBackend;
#[cfg(feature = "backend-tract")]
use stabilizer_kernel::classify::TractBackend;
use stabilizer_kernel::{
    BackendRegistry, CameraSource, ClassifierBackend, ConfirmationLatch, PipelineSettings,
    RecognitionPipeline, RecognitionRelay, StabilizerdConfig, TurnCommand, TurnMapper,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = StabilizerdConfig::load()?;
    log::info!(
        "stabilizerd starting: camera={} backend={} threshold={}",
        cfg.camera.url,
        cfg.classifier.backend,
        cfg.stabilizer.threshold
    );

    let backend = select_backend(&cfg)?;

    let source = CameraSource::new(cfg.camera.clone())?;

    let relay = Arc::new(RecognitionRelay::new());
    let snapshots = relay.subscribe();

    let frame_interval = Duration::from_millis(u64::from(1000 / cfg.camera.target_fps.max(1)));
    let handle = RecognitionPipeline::spawn(
        Box::new(source),
        backend,
        relay.clone(),
        PipelineSettings {
            threshold: cfg.stabilizer.threshold,
            frame_interval,
        },
    )?;

    let running = Arc::new(AtomicBool::new(true));
    let running_handler = running.clone();
    ctrlc::set_handler(move || {
        running_handler.store(false, Ordering::SeqCst);
    })
    .map_err(|e| anyhow!("failed to install signal handler: {}", e))?;

    let mapper = TurnMapper::new(cfg.controller.reset_label.clone());
    let mut latch = ConfirmationLatch::new();
    let mut last_health_log = Instant::now();

    log::info!("stabilizerd running; ctrl-c to stop");

    while running.load(Ordering::SeqCst) {
        match snapshots.recv_timeout(Duration::from_millis(200)) {
            Ok(snapshot) => {
                if let Ok(json) = serde_json::to_string(&snapshot) {
                    log::debug!("snapshot {}", json);
                }
                if let Some(label) = latch.observe(&snapshot) {
                    match mapper.map(&label) {
                        TurnCommand::Reset => log::info!("turn command: reset game"),
                        TurnCommand::Move(cell) => log::info!("turn command: play cell {}", cell),
                        TurnCommand::Unmapped => {
                            log::warn!("confirmed label '{}' maps to no command", label)
                        }
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                log::error!("relay disconnected; shutting down");
                break;
            }
        }

        if last_health_log.elapsed() >= Duration::from_secs(5) {
            let stats = handle.stats();
            log::info!(
                "health: seen={} admitted={} dropped_busy={} no_subject={} faults={} confirmations={}",
                stats.frames_seen,
                stats.frames_admitted,
                stats.frames_dropped_busy,
                stats.no_subject_frames,
                stats.classifier_faults,
                stats.confirmations
            );
            last_health_log = Instant::now();
        }
    }

    log::info!("stabilizerd stopping");
    handle.stop()?;
    Ok(())
}

fn select_backend(cfg: &StabilizerdConfig) -> Result<Arc<Mutex<dyn ClassifierBackend>>> {
    let mut registry = BackendRegistry::new();
    registry.register(StubBackend::new().with_misread_rate(cfg.classifier.misread_rate));

    #[cfg(feature = "backend-tract")]
    if let Some(model_path) = &cfg.classifier.model_path {
        let backend = TractBackend::new(
            model_path,
            cfg.classifier.labels.clone(),
            cfg.camera.width,
            cfg.camera.height,
        )?;
        registry.register(backend);
    }

    registry.set_default(&cfg.classifier.backend).map_err(|_| {
        anyhow!(
            "classifier backend '{}' is not available (registered: {:?})",
            cfg.classifier.backend,
            registry.list()
        )
    })?;
    registry
        .default_backend()
        .ok_or_else(|| anyhow!("no classifier backend registered"))
}
