use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;

use crate::ingest::CameraConfig;

const DEFAULT_CAMERA_URL: &str = "stub://hand_camera";
const DEFAULT_CAMERA_FPS: u32 = 30;
const DEFAULT_CAMERA_WIDTH: u32 = 640;
const DEFAULT_CAMERA_HEIGHT: u32 = 480;
const DEFAULT_BACKEND: &str = "stub";
const DEFAULT_THRESHOLD: u32 = crate::stabilize::DEFAULT_THRESHOLD;
const DEFAULT_RESET_LABEL: &str = "10";

#[derive(Debug, Deserialize, Default)]
struct StabilizerdConfigFile {
    camera: Option<CameraConfigFile>,
    classifier: Option<ClassifierConfigFile>,
    stabilizer: Option<StabilizerConfigFile>,
    controller: Option<ControllerConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    url: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct ClassifierConfigFile {
    backend: Option<String>,
    model_path: Option<String>,
    labels: Option<Vec<String>>,
    misread_rate: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct StabilizerConfigFile {
    threshold: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct ControllerConfigFile {
    reset_label: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StabilizerdConfig {
    pub camera: CameraConfig,
    pub classifier: ClassifierSettings,
    pub stabilizer: StabilizerSettings,
    pub controller: ControllerSettings,
}

#[derive(Debug, Clone)]
pub struct ClassifierSettings {
    /// Registered backend name to classify with.
    pub backend: String,
    /// ONNX model path, for backends that load one.
    pub model_path: Option<String>,
    /// Label vocabulary, in model output order.
    pub labels: Vec<String>,
    /// Synthetic misread probability, honored by the stub backend.
    pub misread_rate: f64,
}

#[derive(Debug, Clone)]
pub struct StabilizerSettings {
    /// Run length a candidate must strictly exceed before promotion.
    pub threshold: u32,
}

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// Confirmed label that resets the game.
    pub reset_label: String,
}

fn default_labels() -> Vec<String> {
    (1..=10).map(|digit| digit.to_string()).collect()
}

impl StabilizerdConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("STABILIZER_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: StabilizerdConfigFile) -> Self {
        let camera = CameraConfig {
            url: file
                .camera
                .as_ref()
                .and_then(|camera| camera.url.clone())
                .unwrap_or_else(|| DEFAULT_CAMERA_URL.to_string()),
            target_fps: file
                .camera
                .as_ref()
                .and_then(|camera| camera.target_fps)
                .unwrap_or(DEFAULT_CAMERA_FPS),
            width: file
                .camera
                .as_ref()
                .and_then(|camera| camera.width)
                .unwrap_or(DEFAULT_CAMERA_WIDTH),
            height: file
                .camera
                .as_ref()
                .and_then(|camera| camera.height)
                .unwrap_or(DEFAULT_CAMERA_HEIGHT),
        };
        let classifier = ClassifierSettings {
            backend: file
                .classifier
                .as_ref()
                .and_then(|classifier| classifier.backend.clone())
                .unwrap_or_else(|| DEFAULT_BACKEND.to_string()),
            model_path: file
                .classifier
                .as_ref()
                .and_then(|classifier| classifier.model_path.clone()),
            labels: file
                .classifier
                .as_ref()
                .and_then(|classifier| classifier.labels.clone())
                .unwrap_or_else(default_labels),
            misread_rate: file
                .classifier
                .as_ref()
                .and_then(|classifier| classifier.misread_rate)
                .unwrap_or(0.0),
        };
        let stabilizer = StabilizerSettings {
            threshold: file
                .stabilizer
                .and_then(|stabilizer| stabilizer.threshold)
                .unwrap_or(DEFAULT_THRESHOLD),
        };
        let controller = ControllerSettings {
            reset_label: file
                .controller
                .and_then(|controller| controller.reset_label)
                .unwrap_or_else(|| DEFAULT_RESET_LABEL.to_string()),
        };
        Self {
            camera,
            classifier,
            stabilizer,
            controller,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("STABILIZER_CAMERA_URL") {
            if !url.trim().is_empty() {
                self.camera.url = url;
            }
        }
        if let Ok(fps) = std::env::var("STABILIZER_TARGET_FPS") {
            let fps: u32 = fps
                .parse()
                .map_err(|_| anyhow!("STABILIZER_TARGET_FPS must be an integer frame rate"))?;
            self.camera.target_fps = fps;
        }
        if let Ok(backend) = std::env::var("STABILIZER_BACKEND") {
            if !backend.trim().is_empty() {
                self.classifier.backend = backend;
            }
        }
        if let Ok(threshold) = std::env::var("STABILIZER_THRESHOLD") {
            let threshold: u32 = threshold
                .parse()
                .map_err(|_| anyhow!("STABILIZER_THRESHOLD must be an integer frame count"))?;
            self.stabilizer.threshold = threshold;
        }
        if let Ok(reset_label) = std::env::var("STABILIZER_RESET_LABEL") {
            if !reset_label.trim().is_empty() {
                self.controller.reset_label = reset_label;
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.stabilizer.threshold == 0 {
            return Err(anyhow!("stabilizer threshold must be greater than zero"));
        }
        if self.camera.target_fps == 0 {
            return Err(anyhow!("camera target_fps must be greater than zero"));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera frame dimensions must be non-zero"));
        }
        if self.classifier.labels.is_empty() {
            return Err(anyhow!("classifier label vocabulary must not be empty"));
        }
        if !(0.0..=1.0).contains(&self.classifier.misread_rate) {
            return Err(anyhow!("classifier misread_rate must be within 0..=1"));
        }
        for label in &self.classifier.labels {
            crate::validate_label(label)?;
        }
        crate::validate_label(&self.controller.reset_label)?;
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<StabilizerdConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
