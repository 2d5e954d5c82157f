//! Frame sources.
//!
//! - Local video files (FFmpeg, feature: ingest-file-ffmpeg)
//! - Synthetic `stub://` clips (testing, demos)
//! - In-memory frame lists
//!
//! Every source yields frames in decode order and signals end of stream with
//! `Ok(None)`. A source is forward-only: once exhausted it stays exhausted, and
//! replaying a clip means opening a new source. Decode handles are released
//! when the source is dropped.

use anyhow::Result;

use crate::frame::Frame;

pub mod file;
#[cfg(feature = "ingest-file-ffmpeg")]
pub(crate) mod file_ffmpeg;
pub mod memory;

pub use file::{is_supported_container, FileConfig, FileSource, SUPPORTED_CONTAINERS};
pub use memory::MemorySource;

/// Lazy, finite, forward-only sequence of decoded frames.
pub trait FrameSource {
    /// Decode the next frame. `Ok(None)` means the stream is exhausted.
    ///
    /// Open and read failures surface as `ErrorKind::Decode`.
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        (**self).next_frame()
    }
}

impl<S: FrameSource + ?Sized> FrameSource for &mut S {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        (**self).next_frame()
    }
}
