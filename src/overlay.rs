//! Live overlay mode.
//!
//! Every decoded frame is scored and labeled on its own: no sampling, no
//! aggregation, no verdict. Labels go to an `OverlaySink` as soon as they exist.
//!
//! Cancellation is cooperative. The flag is checked once per frame, before the
//! next read; a frame that has started preprocessing always finishes.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use image::{Rgb, RgbImage};

use crate::classify::{score_frame, Classifier};
use crate::frame::{preprocess, Frame, InputGeometry};
use crate::ingest::FrameSource;
use crate::report::Label;

/// Per-frame result handed to the sink.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameLabel {
    /// 0-based decode index.
    pub index: u64,
    pub score: f32,
    pub label: Label,
    /// RGB caption color.
    pub color: [u8; 3],
}

impl FrameLabel {
    pub fn from_score(index: u64, score: f32) -> Self {
        let label = Label::from_score(score);
        Self {
            index,
            score,
            label,
            color: label.color(),
        }
    }

    pub fn text(&self) -> &'static str {
        self.label.overlay_text()
    }
}

/// Consumer of labeled frames.
pub trait OverlaySink {
    fn render(&mut self, frame: &Frame, label: &FrameLabel) -> Result<()>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LiveOptions {
    pub geometry: InputGeometry,
    /// Stop after this many frames even if the stream continues.
    pub max_frames: Option<u64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LiveSummary {
    pub frames_rendered: u64,
    pub accident_frames: u64,
    pub cancelled: bool,
}

/// Label every frame of `source` until it ends, `cancel` is set, or
/// `max_frames` is reached.
pub fn run_live<S: FrameSource>(
    mut source: S,
    classifier: &dyn Classifier,
    options: &LiveOptions,
    cancel: &AtomicBool,
    sink: &mut dyn OverlaySink,
) -> Result<LiveSummary> {
    options.geometry.validate()?;
    let mut summary = LiveSummary::default();

    loop {
        if cancel.load(Ordering::SeqCst) {
            log::info!("live overlay: stop requested");
            summary.cancelled = true;
            break;
        }
        if options
            .max_frames
            .is_some_and(|max| summary.frames_rendered >= max)
        {
            break;
        }
        let Some(frame) = source.next_frame()? else {
            break;
        };

        let tensor = preprocess(&frame, options.geometry)?;
        let score = score_frame(classifier, &tensor)?;
        let label = FrameLabel::from_score(summary.frames_rendered, score);
        sink.render(&frame, &label)?;

        summary.frames_rendered += 1;
        if label.label == Label::Accident {
            summary.accident_frames += 1;
        }
    }

    log::info!(
        "live overlay finished: frames={} accident={} cancelled={}",
        summary.frames_rendered,
        summary.accident_frames,
        summary.cancelled
    );
    Ok(summary)
}

// ----------------------------------------------------------------------------
// Sinks
// ----------------------------------------------------------------------------

/// Writes one log line per frame.
#[derive(Debug, Default)]
pub struct LogSink;

impl OverlaySink for LogSink {
    fn render(&mut self, frame: &Frame, label: &FrameLabel) -> Result<()> {
        log::info!(
            "frame {} ({}x{}): {} score={:.3} color={:?}",
            label.index,
            frame.width,
            frame.height,
            label.text(),
            label.score,
            label.color
        );
        Ok(())
    }
}

/// Writes each frame as a PNG with a banner in the label color across the top.
pub struct SnapshotSink {
    dir: PathBuf,
    written: u64,
}

impl SnapshotSink {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create snapshot directory {}", dir.display()))?;
        Ok(Self { dir, written: 0 })
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn path_for(&self, index: u64) -> PathBuf {
        self.dir.join(format!("frame_{:06}.png", index))
    }
}

impl OverlaySink for SnapshotSink {
    fn render(&mut self, frame: &Frame, label: &FrameLabel) -> Result<()> {
        let image = annotate(frame, label)?;
        let path = self.path_for(label.index);
        log::debug!("frame {}: {} -> {}", label.index, label.text(), path.display());
        image
            .save(&path)
            .with_context(|| format!("write snapshot {}", path.display()))?;
        self.written += 1;
        Ok(())
    }
}

/// Copy of `frame` with a banner in the label color over the top tenth.
///
/// No caption text is drawn: the banner color alone carries the label (red for
/// `Accident`, green for `Non-Accident`), and the text goes to the log.
pub fn annotate(frame: &Frame, label: &FrameLabel) -> Result<RgbImage> {
    let mut image = RgbImage::from_raw(frame.width, frame.height, frame.pixels().to_vec())
        .context("frame buffer does not match its size")?;
    let banner = (frame.height / 10).max(1).min(frame.height);
    let color = Rgb(label.color);
    for y in 0..banner {
        for x in 0..frame.width {
            image.put_pixel(x, y, color);
        }
    }
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::StubClassifier;
    use crate::ingest::MemorySource;

    #[derive(Default)]
    struct CollectSink {
        labels: Vec<FrameLabel>,
    }

    impl OverlaySink for CollectSink {
        fn render(&mut self, _frame: &Frame, label: &FrameLabel) -> Result<()> {
            self.labels.push(*label);
            Ok(())
        }
    }

    struct CancelAfter<'a> {
        after: usize,
        seen: usize,
        flag: &'a AtomicBool,
    }

    impl OverlaySink for CancelAfter<'_> {
        fn render(&mut self, _frame: &Frame, _label: &FrameLabel) -> Result<()> {
            self.seen += 1;
            if self.seen == self.after {
                self.flag.store(true, Ordering::SeqCst);
            }
            Ok(())
        }
    }

    struct TrackedSource<'a> {
        inner: MemorySource,
        released: &'a AtomicBool,
    }

    impl FrameSource for TrackedSource<'_> {
        fn next_frame(&mut self) -> Result<Option<Frame>> {
            self.inner.next_frame()
        }
    }

    impl Drop for TrackedSource<'_> {
        fn drop(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    fn options() -> LiveOptions {
        LiveOptions {
            geometry: InputGeometry::new(4, 4).unwrap(),
            max_frames: None,
        }
    }

    #[test]
    fn every_frame_is_labeled() -> Result<()> {
        let frames = [0u8, 255, 10, 240]
            .iter()
            .map(|&v| Frame::solid(6, 6, [v, v, v]))
            .collect::<Result<Vec<_>>>()?;
        let mut sink = CollectSink::default();
        let cancel = AtomicBool::new(false);

        let summary = run_live(
            MemorySource::new(frames),
            &StubClassifier,
            &options(),
            &cancel,
            &mut sink,
        )?;

        let labels: Vec<Label> = sink.labels.iter().map(|l| l.label).collect();
        assert_eq!(
            labels,
            vec![Label::NoAccident, Label::Accident, Label::NoAccident, Label::Accident]
        );
        assert_eq!(sink.labels[1].color, [255, 0, 0]);
        assert_eq!(summary.frames_rendered, 4);
        assert_eq!(summary.accident_frames, 2);
        assert!(!summary.cancelled);
        Ok(())
    }

    #[test]
    fn cancellation_stops_before_next_frame() -> Result<()> {
        let source = MemorySource::uniform(10, 4, 4, [0, 0, 0])?;
        let cancel = AtomicBool::new(false);
        let mut sink = CancelAfter {
            after: 3,
            seen: 0,
            flag: &cancel,
        };

        let summary = run_live(source, &StubClassifier, &options(), &cancel, &mut sink)?;

        assert_eq!(summary.frames_rendered, 3);
        assert!(summary.cancelled);
        Ok(())
    }

    #[test]
    fn cancelled_run_releases_the_source() -> Result<()> {
        let released = AtomicBool::new(false);
        let source = TrackedSource {
            inner: MemorySource::uniform(10, 4, 4, [0, 0, 0])?,
            released: &released,
        };
        let cancel = AtomicBool::new(false);
        let mut sink = CancelAfter {
            after: 2,
            seen: 0,
            flag: &cancel,
        };

        let summary = run_live(source, &StubClassifier, &options(), &cancel, &mut sink)?;

        assert!(summary.cancelled);
        assert!(released.load(Ordering::SeqCst));
        Ok(())
    }

    #[test]
    fn max_frames_caps_the_run() -> Result<()> {
        let source = MemorySource::uniform(10, 4, 4, [0, 0, 0])?;
        let cancel = AtomicBool::new(false);
        let opts = LiveOptions {
            max_frames: Some(4),
            ..options()
        };
        let summary = run_live(source, &StubClassifier, &opts, &cancel, &mut LogSink)?;
        assert_eq!(summary.frames_rendered, 4);
        assert!(!summary.cancelled);
        Ok(())
    }

    #[test]
    fn annotate_paints_banner_and_keeps_body() -> Result<()> {
        let frame = Frame::solid(20, 20, [9, 9, 9])?;
        let label = FrameLabel::from_score(0, 0.9);
        let image = annotate(&frame, &label)?;

        assert_eq!(image.get_pixel(5, 0), &Rgb([255, 0, 0]));
        assert_eq!(image.get_pixel(5, 1), &Rgb([255, 0, 0]));
        assert_eq!(image.get_pixel(5, 2), &Rgb([9, 9, 9]));
        assert_eq!(frame.pixels()[0], 9);

        let calm = annotate(&frame, &FrameLabel::from_score(1, 0.1))?;
        assert_eq!(calm.get_pixel(5, 0), &Rgb([0, 255, 0]));
        Ok(())
    }

    #[test]
    fn snapshot_sink_writes_png_per_frame() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut sink = SnapshotSink::new(dir.path().join("snaps"))?;
        let source = MemorySource::uniform(2, 8, 8, [200, 200, 200])?;
        let cancel = AtomicBool::new(false);

        run_live(source, &StubClassifier, &options(), &cancel, &mut sink)?;

        assert_eq!(sink.written(), 2);
        assert!(sink.path_for(0).exists());
        assert!(sink.path_for(1).exists());
        Ok(())
    }
}
