//! Job progress and time estimation.
//!
//! The orchestrator reports stage transitions and completed tiles as
//! [`ProgressEvent`]s. The [`ProgressEstimator`] folds them into immutable
//! [`ProgressSnapshot`]s carrying an overall percentage and an ETA.
//!
//! # Architecture
//!
//! ```text
//! Orchestrator ─────► ProgressEstimator ─────► ProgressSnapshot ─────► Views
//!  (events)           (single update point)    (watch channel)        (CLI, etc.)
//! ```
//!
//! # Example
//!
//! ```
//! use plategen::progress::{PipelineStep, ProgressEstimator, ProgressEvent};
//!
//! let estimator = ProgressEstimator::new();
//! estimator.record(ProgressEvent::StageStarted(PipelineStep::LoadingImage));
//! estimator.record(ProgressEvent::StageCompleted(PipelineStep::LoadingImage));
//!
//! let snapshot = estimator.snapshot();
//! assert!((snapshot.overall_percent - 5.0).abs() < 1e-9);
//! ```

mod estimator;
mod snapshot;

pub use estimator::{ProgressEstimator, ProgressReceiver};
pub use snapshot::{JobState, PipelineStep, ProgressEvent, ProgressSnapshot, StepStatus};
