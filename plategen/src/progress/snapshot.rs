//! Progress states, events and snapshots.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PipelineStep {
    LoadingImage,
    PyramidGeneration,
    PlateFileGeneration,
    ThumbnailGeneration,
    WtmlGeneration,
}

impl PipelineStep {
    /// Every stage, in order.
    pub const ALL: [PipelineStep; 5] = [
        PipelineStep::LoadingImage,
        PipelineStep::PyramidGeneration,
        PipelineStep::PlateFileGeneration,
        PipelineStep::ThumbnailGeneration,
        PipelineStep::WtmlGeneration,
    ];

    /// Share of the overall progress this stage accounts for.
    ///
    /// Tiling dominates the runtime of every non-trivial job, so it carries
    /// most of the weight and is further split per tile.
    pub fn weight(self) -> f64 {
        match self {
            PipelineStep::LoadingImage => 0.05,
            PipelineStep::PyramidGeneration => 0.80,
            PipelineStep::PlateFileGeneration => 0.05,
            PipelineStep::ThumbnailGeneration => 0.05,
            PipelineStep::WtmlGeneration => 0.05,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PipelineStep::LoadingImage => "Loading image",
            PipelineStep::PyramidGeneration => "Generating pyramid",
            PipelineStep::PlateFileGeneration => "Writing plate files",
            PipelineStep::ThumbnailGeneration => "Generating thumbnail",
            PipelineStep::WtmlGeneration => "Writing descriptor",
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sub-status of a running stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepStatus {
    Started,
    Completed,
}

/// State of a generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobState {
    /// A stage is running or has just finished.
    Step(PipelineStep, StepStatus),
    /// Every stage finished and all artifacts are durable.
    Completed,
    /// The job stopped; the output folder has been removed.
    Failed(ErrorKind),
}

impl JobState {
    /// Whether no further transitions can happen.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed(_))
    }
}

impl Default for JobState {
    fn default() -> Self {
        JobState::Step(PipelineStep::LoadingImage, StepStatus::Started)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Step(step, StepStatus::Started) => write!(f, "{}", step),
            JobState::Step(step, StepStatus::Completed) => write!(f, "{} (done)", step),
            JobState::Completed => write!(f, "Completed"),
            JobState::Failed(ErrorKind::Cancelled) => write!(f, "Cancelled"),
            JobState::Failed(kind) => write!(f, "Failed ({:?})", kind),
        }
    }
}

/// Events reported to the estimator by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    StageStarted(PipelineStep),
    StageCompleted(PipelineStep),
    /// The number of tiles the whole pyramid will contain.
    TilesPlanned(u64),
    TileCompleted,
    Completed,
    Failed(ErrorKind),
}

/// Immutable point-in-time view of a job's progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub state: JobState,
    /// 0 to 100; exactly 100 only once the job completed
    pub overall_percent: f64,
    pub estimated_seconds_remaining: Option<f64>,
    pub tiles_completed: u64,
    pub tiles_total: u64,
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
}

impl ProgressSnapshot {
    /// Snapshot of a job that has not reported anything yet.
    pub fn initial() -> Self {
        Self {
            state: JobState::default(),
            overall_percent: 0.0,
            estimated_seconds_remaining: None,
            tiles_completed: 0,
            tiles_total: 0,
            elapsed: Duration::ZERO,
        }
    }
}

/// Serialize durations as fractional seconds.
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs.max(0.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_sum_to_one() {
        let total: f64 = PipelineStep::ALL.iter().map(|s| s.weight()).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_steps_are_ordered() {
        assert!(PipelineStep::LoadingImage < PipelineStep::PyramidGeneration);
        assert!(PipelineStep::ThumbnailGeneration < PipelineStep::WtmlGeneration);
    }

    #[test]
    fn test_terminal_states() {
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed(ErrorKind::Cancelled).is_terminal());
        assert!(!JobState::default().is_terminal());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(JobState::Failed(ErrorKind::Cancelled).to_string(), "Cancelled");
        assert_eq!(
            JobState::Step(PipelineStep::WtmlGeneration, StepStatus::Completed).to_string(),
            "Writing descriptor (done)"
        );
    }

    #[test]
    fn test_snapshot_json_uses_seconds() {
        let mut snapshot = ProgressSnapshot::initial();
        snapshot.elapsed = Duration::from_millis(1500);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["elapsed"], 1.5);
        assert_eq!(json["state"]["Step"][0], "LoadingImage");

        let back: ProgressSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snapshot);
    }
}
