//! Decoded frames and classifier preprocessing.
//!
//! - `Frame`: one decoded RGB24 image. Pixels are fixed at construction.
//! - `PreprocessedFrame`: the frame resized to the classifier geometry, scaled to [0,1].
//! - `preprocess`: the only path from one to the other.

use anyhow::Result;
use image::{imageops, imageops::FilterType, ImageBuffer, Rgb};

use crate::error::PipelineError;

/// Channel depth of every frame and tensor in the pipeline.
pub const CHANNELS: usize = 3;

/// Classifier input width used by the trained model.
pub const DEFAULT_INPUT_WIDTH: u32 = 224;

/// Classifier input height used by the trained model.
pub const DEFAULT_INPUT_HEIGHT: u32 = 224;

// ----------------------------------------------------------------------------
// Frame
// ----------------------------------------------------------------------------

/// One decoded RGB24 frame.
///
/// There is no `Clone` and no mutable pixel access: a frame belongs to the
/// iteration step that decoded it and is dropped after inference.
pub struct Frame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    /// Wrap packed RGB24 pixels. Fails when the buffer length does not match.
    pub fn from_rgb(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = rgb_len(width, height)?;
        if data.len() != expected {
            return Err(PipelineError::decode(format!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            ))
            .into());
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// A frame filled with one color.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Result<Self> {
        let len = rgb_len(width, height)?;
        let data = rgb.iter().copied().cycle().take(len).collect();
        Self::from_rgb(data, width, height)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

fn rgb_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(CHANNELS))
        .ok_or_else(|| PipelineError::decode("RGB frame dimensions overflow").into())
}

// ----------------------------------------------------------------------------
// Classifier geometry
// ----------------------------------------------------------------------------

/// Fixed spatial size the classifier expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputGeometry {
    pub width: u32,
    pub height: u32,
}

impl InputGeometry {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let geometry = Self { width, height };
        geometry.validate()?;
        Ok(geometry)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(PipelineError::config(format!(
                "classifier input geometry must be non-zero, got {}x{}",
                self.width, self.height
            ))
            .into());
        }
        Ok(())
    }

    /// Number of `f32` values in one tensor of this geometry.
    pub fn tensor_len(&self) -> usize {
        self.width as usize * self.height as usize * CHANNELS
    }
}

impl Default for InputGeometry {
    fn default() -> Self {
        Self {
            width: DEFAULT_INPUT_WIDTH,
            height: DEFAULT_INPUT_HEIGHT,
        }
    }
}

// ----------------------------------------------------------------------------
// PreprocessedFrame
// ----------------------------------------------------------------------------

/// Resized, rescaled tensor in HWC order with values in [0,1].
#[derive(Clone, Debug, PartialEq)]
pub struct PreprocessedFrame {
    data: Vec<f32>,
    geometry: InputGeometry,
}

impl PreprocessedFrame {
    pub fn geometry(&self) -> InputGeometry {
        self.geometry
    }

    pub fn width(&self) -> u32 {
        self.geometry.width
    }

    pub fn height(&self) -> u32 {
        self.geometry.height
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Value at (`y`, `x`, `channel`).
    pub fn at(&self, y: usize, x: usize, channel: usize) -> f32 {
        self.data[(y * self.geometry.width as usize + x) * CHANNELS + channel]
    }

    /// Mean over every value of the tensor.
    pub fn mean(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.data.iter().map(|&v| v as f64).sum();
        (sum / self.data.len() as f64) as f32
    }
}

/// Resize `frame` to `geometry` (bilinear) and divide every intensity by 255.
///
/// The input frame is only read. The same frame always yields the same tensor.
pub fn preprocess(frame: &Frame, geometry: InputGeometry) -> Result<PreprocessedFrame> {
    geometry.validate()?;
    if frame.width == 0 || frame.height == 0 {
        return Err(PipelineError::decode(format!(
            "cannot preprocess empty frame {}x{}",
            frame.width, frame.height
        ))
        .into());
    }

    let data = if frame.width == geometry.width && frame.height == geometry.height {
        rescale(frame.pixels())
    } else {
        let view: ImageBuffer<Rgb<u8>, &[u8]> =
            ImageBuffer::from_raw(frame.width, frame.height, frame.pixels())
                .ok_or_else(|| PipelineError::decode("frame buffer does not match its size"))?;
        let resized = imageops::resize(
            &view,
            geometry.width,
            geometry.height,
            FilterType::Triangle,
        );
        rescale(resized.as_raw())
    };

    Ok(PreprocessedFrame { data, geometry })
}

fn rescale(pixels: &[u8]) -> Vec<f32> {
    pixels.iter().map(|&p| p as f32 / 255.0).collect()
}
