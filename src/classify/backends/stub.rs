use anyhow::Result;

use crate::classify::backend::Classifier;
use crate::frame::PreprocessedFrame;

/// Stub backend for testing. Scores a frame by its mean normalized intensity.
///
/// Bright frames score high, dark frames score low, so tests and `stub://`
/// clips control the score through pixel values alone.
#[derive(Clone, Copy, Debug, Default)]
pub struct StubClassifier;

impl StubClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl Classifier for StubClassifier {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn classify(&self, frame: &PreprocessedFrame) -> Result<f32> {
        Ok(frame.mean().clamp(0.0, 1.0))
    }
}
