#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::classify::backend::ClassifierBackend;
use crate::classify::result::Classification;

/// Tract-based backend for ONNX label classification.
///
/// Loads a local model file and performs inference on RGB frames. The model
/// output is a score vector over `labels`; the highest-scoring label is the
/// reading for the frame. A best score below the confidence threshold is
/// reported as no subject, which is what hard-resets the stabilizer when the
/// hand leaves the frame.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    labels: Vec<String>,
    width: u32,
    height: u32,
    confidence_threshold: f32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        labels: Vec<String>,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        if labels.is_empty() {
            return Err(anyhow!("tract backend requires a non-empty label list"));
        }

        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, height as usize, width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            labels,
            width,
            height,
            confidence_threshold: 0.5,
        })
    }

    /// Override the default confidence threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    fn build_input(&self, pixels: &[u8], width: u32, height: u32) -> Result<Tensor> {
        if width != self.width || height != self.height {
            return Err(anyhow!(
                "frame size {}x{} does not match model input {}x{}",
                width,
                height,
                self.width,
                self.height
            ));
        }

        let expected_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;

        if pixels.len() != expected_len {
            return Err(anyhow!(
                "expected {} RGB bytes, received {}",
                expected_len,
                pixels.len()
            ));
        }

        let width = width as usize;
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, height as usize, width),
            |(_, channel, y, x)| {
                let idx = (y * width + x) * 3 + channel;
                pixels[idx] as f32 / 255.0
            },
        );

        Ok(input.into_tensor())
    }

    fn best_score(&self, outputs: TVec<Tensor>) -> Result<(usize, f32)> {
        let output = outputs
            .get(0)
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let scores = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;

        let mut best_idx = 0usize;
        let mut best = f32::NEG_INFINITY;
        for (idx, &score) in scores.iter().enumerate() {
            if score > best {
                best = score;
                best_idx = idx;
            }
        }
        if !best.is_finite() {
            return Ok((0, 0.0));
        }
        Ok((best_idx, best))
    }
}

impl ClassifierBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn warm_up(&mut self) -> Result<()> {
        // tract allocates lazily; the first run is much slower than the rest.
        // Spend it on a blank frame before any real frame is admitted.
        let blank = vec![0u8; (self.width as usize) * (self.height as usize) * 3];
        let input = self.build_input(&blank, self.width, self.height)?;
        self.model
            .run(tvec!(input))
            .context("ONNX warm-up inference failed")?;
        Ok(())
    }

    fn classify(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Option<Classification>> {
        let input = self.build_input(pixels, width, height)?;
        let outputs = self
            .model
            .run(tvec!(input))
            .context("ONNX inference failed")?;
        let (best_idx, confidence) = self.best_score(outputs)?;

        if confidence < self.confidence_threshold {
            return Ok(None);
        }

        let label = self
            .labels
            .get(best_idx)
            .cloned()
            .ok_or_else(|| anyhow!("score index {} outside label list", best_idx))?;

        Ok(Some(Classification::new(label, confidence)))
    }
}
