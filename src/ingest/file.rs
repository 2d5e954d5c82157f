//! Local file frame source.
//!
//! `FileSource` decodes frames from a local video file. It:
//! - Reads local paths only (no URL schemes)
//! - Decodes in memory, in order, with no seeking
//! - Produces RGB24 `Frame` instances
//!
//! `stub://` paths select a synthetic finite clip instead of a decoder.

use std::path::Path;

use anyhow::Result;

#[cfg(feature = "ingest-file-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
use super::FrameSource;
use crate::error::PipelineError;
use crate::frame::Frame;

/// Container extensions accepted for batch analysis.
pub const SUPPORTED_CONTAINERS: &[&str] = &["mp4", "avi", "mov", "mkv"];

const STUB_SCHEME: &str = "stub://";
const DEFAULT_STUB_FRAMES: u64 = 50;
const DEFAULT_STUB_WIDTH: u32 = 320;
const DEFAULT_STUB_HEIGHT: u32 = 240;
const DEFAULT_STUB_LEVEL: u8 = 64;

/// Configuration for a local file source.
#[derive(Clone, Debug, Default)]
pub struct FileConfig {
    /// Local file path (e.g., "uploads/crash.mp4") or a `stub://` clip.
    pub path: String,
}

impl FileConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Local file frame source.
pub struct FileSource {
    backend: FileBackend,
    exhausted: bool,
}

enum FileBackend {
    Synthetic(SyntheticFileSource),
    #[cfg(feature = "ingest-file-ffmpeg")]
    Ffmpeg(FfmpegFileSource),
}

impl FileSource {
    /// Open the source. Fails with a decode error when it cannot be opened.
    pub fn open(config: FileConfig) -> Result<Self> {
        if !is_local_file_path(&config.path) {
            return Err(PipelineError::decode(format!(
                "file ingestion only supports local paths (no URL schemes): '{}'",
                config.path
            ))
            .into());
        }
        let backend = if config.path.starts_with(STUB_SCHEME) {
            FileBackend::Synthetic(SyntheticFileSource::new(config)?)
        } else {
            #[cfg(feature = "ingest-file-ffmpeg")]
            {
                FileBackend::Ffmpeg(FfmpegFileSource::new(config)?)
            }
            #[cfg(not(feature = "ingest-file-ffmpeg"))]
            {
                return Err(PipelineError::decode(format!(
                    "cannot open '{}': file decoding requires the ingest-file-ffmpeg feature",
                    config.path
                ))
                .into());
            }
        };
        Ok(Self {
            backend,
            exhausted: false,
        })
    }

    /// Get frame statistics.
    pub fn stats(&self) -> FileStats {
        match &self.backend {
            FileBackend::Synthetic(source) => source.stats(),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.stats(),
        }
    }
}

impl FrameSource for FileSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.exhausted {
            return Ok(None);
        }
        let frame = match &mut self.backend {
            FileBackend::Synthetic(source) => source.next_frame()?,
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.next_frame()?,
        };
        if frame.is_none() {
            self.exhausted = true;
            let stats = self.stats();
            log::debug!(
                "FileSource: end of stream for {} after {} frames",
                stats.path,
                stats.frames_decoded
            );
        }
        Ok(frame)
    }
}

impl Drop for FileSource {
    fn drop(&mut self) {
        log::debug!("FileSource: released {}", self.stats().path);
    }
}

/// Statistics for a file source.
#[derive(Clone, Debug)]
pub struct FileStats {
    pub frames_decoded: u64,
    pub path: String,
}

/// True when `path` ends in one of `SUPPORTED_CONTAINERS` (case-insensitive).
pub fn is_supported_container(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_CONTAINERS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

fn is_local_file_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    if path.starts_with(STUB_SCHEME) {
        return true;
    }
    !path.contains("://")
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests
// ----------------------------------------------------------------------------

/// `stub://<name>?frames=N&width=W&height=H&level=L`
///
/// Produces `frames` gradient frames whose mean intensity sits near `level`.
struct SyntheticFileSource {
    config: FileConfig,
    total: u64,
    width: u32,
    height: u32,
    level: u8,
    frame_count: u64,
}

impl SyntheticFileSource {
    fn new(config: FileConfig) -> Result<Self> {
        let mut source = Self {
            config,
            total: DEFAULT_STUB_FRAMES,
            width: DEFAULT_STUB_WIDTH,
            height: DEFAULT_STUB_HEIGHT,
            level: DEFAULT_STUB_LEVEL,
            frame_count: 0,
        };
        let query = source
            .config
            .path
            .split_once('?')
            .map(|(_, q)| q.to_string())
            .unwrap_or_default();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                PipelineError::decode(format!("malformed stub parameter '{}'", pair))
            })?;
            match key {
                "frames" => source.total = parse_stub_value(key, value)?,
                "width" => source.width = parse_stub_value(key, value)?,
                "height" => source.height = parse_stub_value(key, value)?,
                "level" => source.level = parse_stub_value(key, value)?,
                other => {
                    return Err(PipelineError::decode(format!(
                        "unknown stub parameter '{}'",
                        other
                    ))
                    .into())
                }
            }
        }
        if source.width == 0 || source.height == 0 {
            return Err(PipelineError::decode("stub frame size must be non-zero").into());
        }
        log::info!(
            "FileSource: opened {} (synthetic, {} frames)",
            source.config.path,
            source.total
        );
        Ok(source)
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.frame_count >= self.total {
            return Ok(None);
        }
        let pixels = self.generate_synthetic_pixels();
        self.frame_count += 1;
        Frame::from_rgb(pixels, self.width, self.height).map(Some)
    }

    fn generate_synthetic_pixels(&self) -> Vec<u8> {
        let pixel_count = self.width as usize * self.height as usize * 3;
        (0..pixel_count)
            .map(|i| {
                let wobble = ((i as u64 + self.frame_count) % 8) as u8;
                self.level.saturating_add(wobble)
            })
            .collect()
    }

    fn stats(&self) -> FileStats {
        FileStats {
            frames_decoded: self.frame_count,
            path: self.config.path.clone(),
        }
    }
}

fn parse_stub_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        PipelineError::decode(format!("invalid stub parameter {}={}", key, value)).into()
    })
}
