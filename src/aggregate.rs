//! Per-frame score aggregation and verdict derivation.
//!
//! `Aggregator` accumulates counters and the running maximum score for one clip.
//! `Aggregator::finalize` consumes it, so a verdict is produced exactly once
//! per run and no further scores can be folded in afterwards.

use std::time::Duration;

use serde::Serialize;

/// A sampled frame with a score above this counts as an accident frame.
pub const DECISION_THRESHOLD: f32 = 0.5;

/// Running statistics for one analysis run.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AggregateState {
    /// Every decoded frame, sampled or not.
    pub total_frames: u64,
    /// Frames that were actually scored.
    pub sampled_frames: u64,
    /// Sampled frames with a score above `DECISION_THRESHOLD`.
    pub accident_frames: u64,
    /// Highest score seen on a sampled frame. Never decreases.
    pub max_confidence: f32,
    /// Wall clock from the first read to stream exhaustion.
    pub elapsed: Duration,
}

#[derive(Clone, Debug, Default)]
pub struct Aggregator {
    state: AggregateState,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one decoded frame.
    pub fn record_frame(&mut self) {
        self.state.total_frames += 1;
    }

    /// Fold in the score of one sampled frame.
    ///
    /// A score with no matching `record_frame` counts its frame as well, so
    /// `sampled_frames <= total_frames` always holds.
    pub fn update(&mut self, score: f32) {
        if self.state.sampled_frames == self.state.total_frames {
            self.state.total_frames += 1;
        }
        self.state.sampled_frames += 1;
        if score > self.state.max_confidence {
            self.state.max_confidence = score;
        }
        if score > DECISION_THRESHOLD {
            self.state.accident_frames += 1;
        }
    }

    pub fn state(&self) -> &AggregateState {
        &self.state
    }

    /// Close the run. Call only after the source is exhausted.
    pub fn finalize(mut self, elapsed: Duration) -> Verdict {
        self.state.elapsed = elapsed;
        let detected = self.state.max_confidence > DECISION_THRESHOLD;
        let max = self.state.max_confidence as f64;
        let confidence_percent = if detected {
            round2(max * 100.0)
        } else {
            round2((1.0 - max) * 100.0)
        };
        Verdict {
            detected,
            confidence_percent,
            state: self.state,
        }
    }
}

/// Final outcome of one clip.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Verdict {
    pub detected: bool,
    /// Confidence in the reported outcome: the best score when an accident was
    /// detected, otherwise how far the best score stayed below certainty.
    pub confidence_percent: f64,
    pub state: AggregateState,
}

impl Verdict {
    /// No frame was scored, so the negative verdict carries no evidence.
    pub fn is_inconclusive(&self) -> bool {
        self.state.sampled_frames == 0
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
