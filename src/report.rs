//! Outward-facing summary of a verdict.

use serde::{Deserialize, Serialize};

use crate::aggregate::{round2, Verdict, DECISION_THRESHOLD};

/// Binary outcome tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Accident,
    NoAccident,
}

impl Label {
    pub fn from_detected(detected: bool) -> Self {
        if detected {
            Label::Accident
        } else {
            Label::NoAccident
        }
    }

    /// Per-frame label from a raw score, as used by live overlay.
    pub fn from_score(score: f32) -> Self {
        Self::from_detected(score > DECISION_THRESHOLD)
    }

    /// Clip-level result text.
    pub fn verdict_text(self) -> &'static str {
        match self {
            Label::Accident => "Accident Detected",
            Label::NoAccident => "No Accident Detected",
        }
    }

    /// Short per-frame caption.
    pub fn overlay_text(self) -> &'static str {
        match self {
            Label::Accident => "Accident",
            Label::NoAccident => "Non-Accident",
        }
    }

    /// RGB caption color: red for accidents, green otherwise.
    pub fn color(self) -> [u8; 3] {
        match self {
            Label::Accident => [255, 0, 0],
            Label::NoAccident => [0, 255, 0],
        }
    }
}

/// Flat record handed to presentation and storage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub label: Label,
    pub result: String,
    pub confidence_percent: f64,
    pub total_frames: u64,
    pub sampled_frames: u64,
    /// Sampled frames scored as accidents.
    pub accident_frames: u64,
    /// Elapsed wall clock in seconds, two decimals. See `AggregateState::elapsed`
    /// for the exact value.
    pub processing_time_secs: f64,
    pub inconclusive: bool,
}

impl Report {
    pub fn from_verdict(verdict: &Verdict) -> Self {
        let label = Label::from_detected(verdict.detected);
        Self {
            label,
            result: label.verdict_text().to_string(),
            confidence_percent: verdict.confidence_percent,
            total_frames: verdict.state.total_frames,
            sampled_frames: verdict.state.sampled_frames,
            accident_frames: verdict.state.accident_frames,
            processing_time_secs: round2(verdict.state.elapsed.as_secs_f64()),
            inconclusive: verdict.is_inconclusive(),
        }
    }

    /// Multi-line text for terminals.
    pub fn to_text(&self) -> String {
        let mut out = format!(
            "result: {}\nconfidence: {:.2}%\ntotal frames: {}\nsampled frames: {}\naccident frames: {}\nprocessing time: {:.2}s",
            self.result,
            self.confidence_percent,
            self.total_frames,
            self.sampled_frames,
            self.accident_frames,
            self.processing_time_secs
        );
        if self.inconclusive {
            out.push_str("\nnote: no frames were scored; the verdict is not backed by inference");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregator;
    use std::time::Duration;

    #[test]
    fn report_passes_counters_through() {
        let mut agg = Aggregator::new();
        for _ in 0..7 {
            agg.record_frame();
        }
        agg.update(0.2);
        agg.update(0.8);
        let verdict = agg.finalize(Duration::from_millis(1234));

        let report = Report::from_verdict(&verdict);
        assert_eq!(report.label, Label::Accident);
        assert_eq!(report.result, "Accident Detected");
        assert_eq!(report.total_frames, 7);
        assert_eq!(report.sampled_frames, 2);
        assert_eq!(report.accident_frames, 1);
        assert_eq!(report.processing_time_secs, 1.23);
        assert_eq!(verdict.state.elapsed, Duration::from_millis(1234));
        assert!(!report.inconclusive);
    }

    #[test]
    fn overlay_labels_use_raw_threshold() {
        assert_eq!(Label::from_score(0.51), Label::Accident);
        assert_eq!(Label::from_score(0.5), Label::NoAccident);
        assert_eq!(Label::Accident.overlay_text(), "Accident");
        assert_eq!(Label::NoAccident.color(), [0, 255, 0]);
    }

    #[test]
    fn json_shape_is_flat() {
        let verdict = Aggregator::new().finalize(Duration::ZERO);
        let json = serde_json::to_value(Report::from_verdict(&verdict)).unwrap();
        assert_eq!(json["label"], "no_accident");
        assert_eq!(json["confidence_percent"], 100.0);
        assert_eq!(json["inconclusive"], true);
    }
}
