use serde::{Deserialize, Serialize};

/// One classifier reading for one frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Opaque label identifier. The stabilizer never interprets it; consumer
    /// policy maps labels to actions.
    pub label: String,
    /// Classifier confidence in 0..=1. Informational; the stabilizer relies
    /// on temporal consistency, not on per-frame confidence.
    pub confidence: f32,
}

impl Classification {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}
