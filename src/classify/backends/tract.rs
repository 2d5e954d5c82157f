#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::Result;
use tract_onnx::prelude::*;

use crate::classify::backend::Classifier;
use crate::error::PipelineError;
use crate::frame::{InputGeometry, PreprocessedFrame, CHANNELS};

/// Tract-based backend for ONNX inference.
///
/// Loads a local model once and runs it on `[1, H, W, 3]` f32 tensors. The model
/// must emit a single positive-class probability (shape `(1, 1)`).
pub struct TractClassifier {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    geometry: InputGeometry,
}

impl TractClassifier {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, geometry: InputGeometry) -> Result<Self> {
        geometry.validate()?;
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .map_err(|e| {
                inference_error(&format!("load ONNX model from {}", model_path.display()), e)
            })?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, geometry.height as usize, geometry.width as usize, CHANNELS),
                ),
            )
            .map_err(|e| inference_error("set input fact", e))?
            .into_optimized()
            .map_err(|e| inference_error("optimize ONNX model", e))?
            .into_runnable()
            .map_err(|e| inference_error("build runnable ONNX model", e))?;

        log::info!(
            "TractClassifier: loaded {} ({}x{})",
            model_path.display(),
            geometry.width,
            geometry.height
        );

        Ok(Self { model, geometry })
    }

    fn build_input(&self, frame: &PreprocessedFrame) -> Result<Tensor> {
        if frame.geometry() != self.geometry
            || frame.as_slice().len() != self.geometry.tensor_len()
        {
            return Err(PipelineError::inference(format!(
                "frame size {}x{} does not match model input {}x{}",
                frame.width(),
                frame.height(),
                self.geometry.width,
                self.geometry.height
            ))
            .into());
        }
        let shape = [
            1,
            self.geometry.height as usize,
            self.geometry.width as usize,
            CHANNELS,
        ];
        Tensor::from_shape(&shape, frame.as_slice())
            .map_err(|e| inference_error("build input tensor", e).into())
    }

    fn extract_probability(&self, outputs: TVec<TValue>) -> Result<f32> {
        let output = outputs
            .first()
            .ok_or_else(|| PipelineError::inference("model produced no outputs"))?;
        let scores = output
            .to_array_view::<f32>()
            .map_err(|e| inference_error("model output tensor was not f32", e))?;
        if scores.len() != 1 {
            return Err(PipelineError::inference(format!(
                "expected a single probability, model returned shape {:?}",
                scores.shape()
            ))
            .into());
        }
        scores
            .iter()
            .copied()
            .next()
            .ok_or_else(|| PipelineError::inference("model output was empty").into())
    }
}

impl Classifier for TractClassifier {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn classify(&self, frame: &PreprocessedFrame) -> Result<f32> {
        let input = self.build_input(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into_tvalue()))
            .map_err(|e| inference_error("ONNX inference failed", e))?;
        self.extract_probability(outputs)
    }

    fn warm_up(&self) -> Result<()> {
        let input = Tensor::zero::<f32>(&[
            1,
            self.geometry.height as usize,
            self.geometry.width as usize,
            CHANNELS,
        ])
        .map_err(|e| inference_error("build warm-up tensor", e))?;
        self.model
            .run(tvec!(input.into_tvalue()))
            .map_err(|e| inference_error("ONNX warm-up failed", e))?;
        Ok(())
    }
}

fn inference_error(action: &str, err: impl std::fmt::Display) -> PipelineError {
    PipelineError::inference(format!("{}: {}", action, err))
}
