//! demo - end-to-end synthetic run for the Recognition Stabilizer Kernel
//!
//! Plays a scripted classifier through the real two-thread pipeline and
//! renders recognition progress on the terminal. Exits non-zero if the
//! scripted label never confirms.

use std::io::IsTerminal;
use std::sync::mpsc::RecvTimeoutError;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use clap::Parser;

use stabilizer_kernel::classify::{ScriptStep, ScriptedBackend};
use stabilizer_kernel::ui::ProgressMeter;
use stabilizer_kernel::{
    CameraConfig, CameraSource, ConfirmationLatch, PipelineSettings, RecognitionPipeline,
    RecognitionRelay, TurnMapper,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Label the scripted classifier reports.
    #[arg(long, default_value = "5")]
    label: String,
    /// Promotion threshold (consecutive frames a run must strictly exceed).
    #[arg(long, default_value_t = 30)]
    threshold: u32,
    /// Interrupt the run once with a no-subject frame to show the hard reset.
    #[arg(long, default_value_t = false)]
    interrupt: bool,
    /// Producer pacing in milliseconds between frames.
    #[arg(long, default_value_t = 10)]
    frame_ms: u64,
    /// Terminal output: auto, plain, or pretty.
    #[arg(long)]
    ui: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();
    stabilizer_kernel::validate_label(&args.label)?;
    if args.threshold == 0 {
        return Err(anyhow!("threshold must be >= 1"));
    }

    stage("build scripted classifier");
    // A fresh candidate confirms on frame threshold + 3 (adoption frame, then
    // threshold + 1 increments, then the promoting frame); script a margin on
    // top, plus the optional mid-run interruption.
    let confirm_frames = (args.threshold as usize) + 3;
    let mut steps = Vec::new();
    if args.interrupt {
        steps.extend(vec![ScriptStep::label(&args.label); confirm_frames / 2]);
        steps.push(ScriptStep::NoSubject);
    }
    steps.extend(vec![ScriptStep::label(&args.label); confirm_frames + 8]);
    let total_steps = steps.len();
    let backend = ScriptedBackend::new(steps);

    stage("spawn pipeline");
    let source = CameraSource::new(CameraConfig {
        url: "stub://demo".to_string(),
        target_fps: 0,
        width: 320,
        height: 240,
    })?;
    let relay = Arc::new(RecognitionRelay::new());
    let snapshots = relay.subscribe();
    let handle = RecognitionPipeline::spawn(
        Box::new(source),
        Arc::new(Mutex::new(backend)),
        relay,
        PipelineSettings {
            threshold: args.threshold,
            frame_interval: Duration::from_millis(args.frame_ms),
        },
    )?;

    stage("watch recognition progress");
    let mut meter = ProgressMeter::from_args(args.ui.as_deref(), std::io::stderr().is_terminal());
    let mut latch = ConfirmationLatch::new();
    let mapper = TurnMapper::default();

    let mut confirmed: Option<String> = None;
    let mut resets_seen = 0u64;
    let mut last_reading = String::new();
    let deadline = Instant::now() + Duration::from_millis(args.frame_ms * (total_steps as u64 + 50) + 5_000);

    while Instant::now() < deadline {
        match snapshots.recv_timeout(Duration::from_millis(200)) {
            Ok(snapshot) => {
                if !last_reading.is_empty() && snapshot.reading_label.is_empty() {
                    resets_seen += 1;
                }
                last_reading = snapshot.reading_label.clone();
                meter.update(&snapshot);
                if let Some(label) = latch.observe(&snapshot) {
                    confirmed = Some(label);
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    let stats = handle.stats_handle();
    handle.stop()?;
    let stats = stats.report();

    match &confirmed {
        Some(label) => meter.finish(&format!("confirmed '{}'", label)),
        None => meter.finish("no confirmation"),
    }

    println!("demo summary:");
    println!("  scripted steps: {}", total_steps);
    println!("  frames seen: {}", stats.frames_seen);
    println!("  frames admitted: {}", stats.frames_admitted);
    println!("  frames dropped while busy: {}", stats.frames_dropped_busy);
    println!("  no-subject resets observed: {}", resets_seen);
    println!(
        "  confirmed label: {}",
        confirmed.as_deref().unwrap_or("(none)")
    );
    if let Some(label) = &confirmed {
        println!("  turn command: {:?}", mapper.map(label));
    }
    println!("next steps:");
    println!("  cargo run --bin stabilizerd");
    println!("  cargo run --bin demo -- --interrupt --threshold 10");

    match confirmed {
        Some(label) if label == args.label => Ok(()),
        Some(label) => Err(anyhow!(
            "confirmed '{}' but expected '{}'",
            label,
            args.label
        )),
        None => Err(anyhow!("label '{}' never confirmed", args.label)),
    }
}

fn stage(msg: &str) {
    eprintln!("demo: {}", msg);
}
