//! Batch analysis: sample, score, aggregate, finalize.
//!
//! One call analyzes one clip on the calling thread. Decode, preprocessing and
//! inference run strictly in sequence, so scores are folded in decode order.
//! Each run owns its own `Aggregator`; only the classifier is shared.

use std::time::Instant;

use anyhow::Result;

use crate::aggregate::{Aggregator, Verdict};
use crate::classify::{score_frame, Classifier};
use crate::frame::{preprocess, InputGeometry};
use crate::ingest::FrameSource;
use crate::sampler::Sampler;

/// Per-run settings, validated before the first frame is read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineSettings {
    pub sampler: Sampler,
    pub geometry: InputGeometry,
}

impl PipelineSettings {
    pub fn new(cadence: u32, geometry: InputGeometry) -> Result<Self> {
        geometry.validate()?;
        Ok(Self {
            sampler: Sampler::new(cadence)?,
            geometry,
        })
    }
}

/// Analyze a clip to exhaustion and return its verdict.
///
/// The source is consumed and dropped on every exit path. Any decode or
/// inference failure aborts the run; no partial verdict is produced.
pub fn analyze<S: FrameSource>(
    mut source: S,
    classifier: &dyn Classifier,
    settings: &PipelineSettings,
) -> Result<Verdict> {
    settings.geometry.validate()?;

    let mut aggregator = Aggregator::new();
    let started = Instant::now();
    let mut index: u64 = 0;

    while let Some(frame) = source.next_frame()? {
        aggregator.record_frame();
        if settings.sampler.is_eligible(index) {
            let tensor = preprocess(&frame, settings.geometry)?;
            let score = score_frame(classifier, &tensor)?;
            log::debug!("frame {}: score={:.4}", index, score);
            aggregator.update(score);
        }
        index += 1;
    }

    let elapsed = started.elapsed();
    drop(source);

    let verdict = aggregator.finalize(elapsed);
    if verdict.is_inconclusive() {
        log::warn!(
            "no frames were scored ({} decoded, cadence {}); reporting a negative verdict",
            verdict.state.total_frames,
            settings.sampler.cadence()
        );
    }
    log::info!(
        "analysis complete: detected={} confidence={:.2}% frames={} sampled={} accident={} elapsed={:.2}s",
        verdict.detected,
        verdict.confidence_percent,
        verdict.state.total_frames,
        verdict.state.sampled_frames,
        verdict.state.accident_frames,
        verdict.state.elapsed.as_secs_f64()
    );
    Ok(verdict)
}
