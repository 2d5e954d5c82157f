use anyhow::Result;

use crate::frame::PreprocessedFrame;

/// Binary accident classifier.
///
/// # Contract
///
/// Given one preprocessed frame, return the probability in [0,1] that it shows
/// an accident. Implementations are stateless per call: `classify` takes `&self`
/// so a single instance can be shared read-only by concurrent pipelines.
///
/// Backends must not retain the tensor beyond the call.
pub trait Classifier: Send + Sync {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Score one frame. The input is treated as a batch of size one.
    fn classify(&self, frame: &PreprocessedFrame) -> Result<f32>;

    /// Optional warm-up hook.
    fn warm_up(&self) -> Result<()> {
        Ok(())
    }
}
