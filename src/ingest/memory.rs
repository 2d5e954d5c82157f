use std::collections::VecDeque;

use anyhow::Result;

use super::FrameSource;
use crate::error::PipelineError;
use crate::frame::Frame;

/// Source over frames that are already decoded.
///
/// A read failure can be injected after a given number of frames, which is how
/// tests exercise mid-stream decode errors.
pub struct MemorySource {
    frames: VecDeque<Frame>,
    delivered: u64,
    fail_after: Option<u64>,
}

impl MemorySource {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames: frames.into(),
            delivered: 0,
            fail_after: None,
        }
    }

    /// `count` solid frames of one color.
    pub fn uniform(count: usize, width: u32, height: u32, rgb: [u8; 3]) -> Result<Self> {
        let frames = (0..count)
            .map(|_| Frame::solid(width, height, rgb))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(frames))
    }

    /// Fail with a decode error once `frames` frames have been delivered.
    pub fn fail_after(mut self, frames: u64) -> Self {
        self.fail_after = Some(frames);
        self
    }

    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for MemorySource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.fail_after == Some(self.delivered) {
            return Err(PipelineError::decode(format!(
                "read failed after {} frames",
                self.delivered
            ))
            .into());
        }
        let frame = self.frames.pop_front();
        if frame.is_some() {
            self.delivered += 1;
        }
        Ok(frame)
    }
}
