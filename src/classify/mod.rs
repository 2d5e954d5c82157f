//! Classifier port and backends.
//!
//! The classifier is an external capability: a preprocessed frame goes in, an
//! accident probability comes out. Callers construct one instance up front and
//! pass it into every pipeline run.

mod backend;
mod backends;

use std::sync::Arc;

use anyhow::Result;

pub use backend::Classifier;
pub use backends::StubClassifier;
#[cfg(feature = "backend-tract")]
pub use backends::TractClassifier;

use crate::config::ClassifierSettings;
use crate::error::{error_kind, PipelineError};
use crate::frame::{InputGeometry, PreprocessedFrame};

/// Names accepted by `open_classifier`.
pub const BACKEND_NAMES: &[&str] = &["stub", "tract"];

/// Construct the configured backend.
pub fn open_classifier(
    settings: &ClassifierSettings,
    geometry: InputGeometry,
) -> Result<Arc<dyn Classifier>> {
    let classifier: Arc<dyn Classifier> = match settings.backend.as_str() {
        "stub" => Arc::new(StubClassifier::new()),
        "tract" => open_tract(settings, geometry)?,
        other => {
            return Err(PipelineError::config(format!(
                "unknown classifier backend '{}' (expected one of {:?})",
                other, BACKEND_NAMES
            ))
            .into())
        }
    };
    classifier.warm_up().map_err(|e| as_inference_error(classifier.name(), e))?;
    log::info!("classifier backend: {}", classifier.name());
    Ok(classifier)
}

#[cfg(feature = "backend-tract")]
fn open_tract(
    settings: &ClassifierSettings,
    geometry: InputGeometry,
) -> Result<Arc<dyn Classifier>> {
    let path = settings.model_path.as_ref().ok_or_else(|| {
        PipelineError::config("the tract backend requires a model path")
    })?;
    Ok(Arc::new(TractClassifier::new(path, geometry)?))
}

#[cfg(not(feature = "backend-tract"))]
fn open_tract(
    _settings: &ClassifierSettings,
    _geometry: InputGeometry,
) -> Result<Arc<dyn Classifier>> {
    Err(PipelineError::config("the tract backend requires the backend-tract feature").into())
}

/// Run the classifier on one frame and check the result is a probability.
///
/// Every failure comes back as `ErrorKind::Inference`.
pub fn score_frame(classifier: &dyn Classifier, frame: &PreprocessedFrame) -> Result<f32> {
    let score = classifier
        .classify(frame)
        .map_err(|e| as_inference_error(classifier.name(), e))?;
    if !score.is_finite() || !(0.0..=1.0).contains(&score) {
        return Err(PipelineError::inference(format!(
            "{} classifier returned {} (expected a probability in [0,1])",
            classifier.name(),
            score
        ))
        .into());
    }
    Ok(score)
}

fn as_inference_error(backend: &str, err: anyhow::Error) -> anyhow::Error {
    if error_kind(&err).is_some() {
        return err;
    }
    PipelineError::inference(format!("{} classifier failed: {:#}", backend, err)).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::frame::{preprocess, Frame};

    struct FixedClassifier(f32);

    impl Classifier for FixedClassifier {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn classify(&self, _frame: &PreprocessedFrame) -> Result<f32> {
            Ok(self.0)
        }
    }

    struct BrokenClassifier;

    impl Classifier for BrokenClassifier {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn classify(&self, _frame: &PreprocessedFrame) -> Result<f32> {
            anyhow::bail!("model session closed")
        }
    }

    fn tensor() -> PreprocessedFrame {
        let frame = Frame::solid(4, 4, [10, 20, 30]).unwrap();
        preprocess(&frame, InputGeometry::new(2, 2).unwrap()).unwrap()
    }

    #[test]
    fn valid_probabilities_pass_through() {
        assert_eq!(score_frame(&FixedClassifier(0.75), &tensor()).unwrap(), 0.75);
        assert_eq!(score_frame(&FixedClassifier(0.0), &tensor()).unwrap(), 0.0);
        assert_eq!(score_frame(&FixedClassifier(1.0), &tensor()).unwrap(), 1.0);
    }

    #[test]
    fn malformed_scores_are_inference_errors() {
        for bad in [f32::NAN, f32::INFINITY, -0.1, 1.5] {
            let err = score_frame(&FixedClassifier(bad), &tensor()).unwrap_err();
            assert_eq!(error_kind(&err), Some(ErrorKind::Inference), "{bad}");
        }
    }

    #[test]
    fn backend_failures_are_inference_errors() {
        let err = score_frame(&BrokenClassifier, &tensor()).unwrap_err();
        assert_eq!(error_kind(&err), Some(ErrorKind::Inference));
        assert!(err.to_string().contains("model session closed"));
    }

    #[test]
    fn unknown_backend_is_a_config_error() {
        let settings = ClassifierSettings {
            backend: "keras".to_string(),
            model_path: None,
        };
        let err = open_classifier(&settings, InputGeometry::default())
            .err()
            .unwrap();
        assert_eq!(error_kind(&err), Some(ErrorKind::Config));
    }

    #[test]
    fn stub_backend_opens() {
        let settings = ClassifierSettings::default();
        let classifier = open_classifier(&settings, InputGeometry::default()).unwrap();
        assert_eq!(classifier.name(), "stub");
    }
}
