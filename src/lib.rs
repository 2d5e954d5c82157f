//! Accident Kernel
//!
//! Classifies short video clips as showing a vehicular accident or not.
//!
//! # Architecture
//!
//! Batch analysis runs one clip through a fixed chain:
//!
//! 1. **Frame source** decodes frames in order (`ingest`).
//! 2. **Sampler** picks every `cadence`-th decoded frame (`sampler`).
//! 3. **Preprocessor** resizes to 224×224×3 and scales to [0,1] (`frame`).
//! 4. **Classifier** returns an accident probability per frame (`classify`).
//! 5. **Aggregator** tracks counters and the running maximum, then finalizes
//!    into a `Verdict` (`aggregate`).
//! 6. **Report** turns the verdict into a flat record (`report`).
//!
//! Live overlay (`overlay`) reuses steps 1, 3 and 4 on every frame and hands
//! each label to a sink instead of aggregating.
//!
//! # Module Structure
//!
//! - `frame`: `Frame`, `PreprocessedFrame`, `preprocess`
//! - `ingest`: `FrameSource`, `FileSource`, `MemorySource`
//! - `classify`: `Classifier` port and backends
//! - `pipeline`: `analyze`
//! - `overlay`: `run_live` and sinks
//! - `storage`: analysis history
//! - `config`: file + environment configuration
//! - `error`: `ErrorKind` taxonomy

pub mod aggregate;
pub mod classify;
pub mod config;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod overlay;
pub mod pipeline;
pub mod report;
pub mod sampler;
pub mod storage;

pub use aggregate::{AggregateState, Aggregator, Verdict, DECISION_THRESHOLD};
pub use classify::{open_classifier, score_frame, Classifier, StubClassifier};
#[cfg(feature = "backend-tract")]
pub use classify::TractClassifier;
pub use config::{AppConfig, ClassifierSettings};
pub use error::{error_kind, ErrorKind, PipelineError};
pub use frame::{preprocess, Frame, InputGeometry, PreprocessedFrame};
pub use ingest::{FileConfig, FileSource, FrameSource, MemorySource};
pub use overlay::{run_live, FrameLabel, LiveOptions, LiveSummary, LogSink, OverlaySink, SnapshotSink};
pub use pipeline::{analyze, PipelineSettings};
pub use report::{Label, Report};
pub use sampler::{Sampler, DEFAULT_CADENCE};
pub use storage::{
    HistoryRecord, HistoryStore, InMemoryHistoryStore, NewHistoryRecord, SqliteHistoryStore,
};

/// Unique shared in-memory SQLite URI, for tests and throwaway runs.
pub fn shared_memory_uri() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static NEXT: AtomicU64 = AtomicU64::new(0);
    format!(
        "file:accident_kernel_{}_{}?mode=memory&cache=shared",
        std::process::id(),
        NEXT.fetch_add(1, Ordering::Relaxed)
    )
}
