//! Error taxonomy for analysis runs.
//!
//! Failures travel through `anyhow::Result` like everything else in the crate.
//! The kind is carried by a `PipelineError` so callers can recover it with
//! `err.downcast_ref::<PipelineError>()` and branch on `ErrorKind`.

use std::fmt;

/// Broad failure class of an analysis run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The source could not be opened, or a read failed before stream end.
    Decode,
    /// The classifier was unavailable or returned malformed output.
    Inference,
    /// Caller setup error, detected before any frame is processed.
    Config,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Decode => "DECODE_ERROR",
            ErrorKind::Inference => "INFERENCE_ERROR",
            ErrorKind::Config => "CONFIG_ERROR",
        }
    }
}

#[derive(Clone, Debug)]
pub struct PipelineError {
    pub kind: ErrorKind,
    pub message: String,
}

impl PipelineError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Decode, message)
    }

    pub fn inference(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Inference, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.code(), self.message)
    }
}

impl std::error::Error for PipelineError {}

/// Returns the `ErrorKind` of the first `PipelineError` in the chain, if any.
///
/// Context layers added with `anyhow::Context` are skipped.
pub fn error_kind(err: &anyhow::Error) -> Option<ErrorKind> {
    err.downcast_ref::<PipelineError>()
        .or_else(|| {
            err.chain()
                .find_map(|cause| cause.downcast_ref::<PipelineError>())
        })
        .map(|e| e.kind)
}
