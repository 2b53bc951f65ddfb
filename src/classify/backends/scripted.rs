use std::collections::VecDeque;

use anyhow::{anyhow, Result};

use crate::classify::backend::ClassifierBackend;
use crate::classify::result::Classification;

/// One scripted classifier outcome.
#[derive(Clone, Debug)]
pub enum ScriptStep {
    /// A successful reading of the given label.
    Label(String),
    /// No recognizable subject in the frame.
    NoSubject,
    /// The classifier invocation itself fails.
    Fault,
}

impl ScriptStep {
    pub fn label(value: &str) -> Self {
        ScriptStep::Label(value.to_string())
    }
}

/// Scripted backend: plays back a predetermined sequence of outcomes,
/// ignoring pixel content entirely.
///
/// This is the workhorse for tests and the demo; it lets a caller write the
/// exact frame-by-frame story (runs, interruptions, faults) the stabilizer
/// should see. Once the script is exhausted every further frame reports no
/// subject.
pub struct ScriptedBackend {
    steps: VecDeque<ScriptStep>,
    confidence: f32,
    calls: u64,
}

impl ScriptedBackend {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            steps: steps.into(),
            confidence: 0.9,
            calls: 0,
        }
    }

    /// Script that repeats one label `frames` times.
    pub fn repeating(label: &str, frames: usize) -> Self {
        Self::new(vec![ScriptStep::label(label); frames])
    }

    /// Number of classify calls served so far.
    pub fn calls(&self) -> u64 {
        self.calls
    }

    /// Remaining scripted steps.
    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}

impl ClassifierBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn classify(
        &mut self,
        _pixels: &[u8],
        _width: u32,
        _height: u32,
    ) -> Result<Option<Classification>> {
        self.calls += 1;
        match self.steps.pop_front() {
            Some(ScriptStep::Label(label)) => {
                Ok(Some(Classification::new(label, self.confidence)))
            }
            Some(ScriptStep::NoSubject) | None => Ok(None),
            Some(ScriptStep::Fault) => Err(anyhow!("scripted classifier fault")),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
