//! Progress aggregation and time estimation.

use std::time::Instant;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::trace;

use super::{JobState, PipelineStep, ProgressEvent, ProgressSnapshot, StepStatus};

/// Progress never reaches 100 before the job is completed.
const MAX_RUNNING_PERCENT: f64 = 99.9;

/// Folds progress events from all workers into immutable snapshots.
///
/// Every update goes through one mutex and yields a new snapshot, which is
/// appended to the history and published to subscribers. Readers never take
/// the lock.
#[derive(Debug)]
pub struct ProgressEstimator {
    state: Mutex<EstimatorState>,
    sender: watch::Sender<ProgressSnapshot>,
}

#[derive(Debug)]
struct EstimatorState {
    started: Instant,
    job_state: JobState,
    completed_weight: f64,
    tiles_completed: u64,
    tiles_total: u64,
    percent: f64,
    history: Vec<ProgressSnapshot>,
}

impl ProgressEstimator {
    /// Create an estimator whose clock starts now.
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Create an estimator whose clock started at `started`.
    pub fn starting_at(started: Instant) -> Self {
        let initial = ProgressSnapshot::initial();
        let (sender, _) = watch::channel(initial.clone());

        Self {
            state: Mutex::new(EstimatorState {
                started,
                job_state: initial.state,
                completed_weight: 0.0,
                tiles_completed: 0,
                tiles_total: 0,
                percent: 0.0,
                history: vec![initial],
            }),
            sender,
        }
    }

    /// Record an event observed now.
    pub fn record(&self, event: ProgressEvent) -> ProgressSnapshot {
        self.record_at(event, Instant::now())
    }

    /// Record an event observed at `now`.
    ///
    /// Events arriving after the job reached a terminal state are ignored.
    pub fn record_at(&self, event: ProgressEvent, now: Instant) -> ProgressSnapshot {
        let mut state = self.state.lock();

        if state.job_state.is_terminal() {
            return state
                .history
                .last()
                .cloned()
                .unwrap_or_else(ProgressSnapshot::initial);
        }

        match event {
            ProgressEvent::StageStarted(step) => {
                state.job_state = JobState::Step(step, StepStatus::Started);
            }
            ProgressEvent::StageCompleted(step) => {
                state.job_state = JobState::Step(step, StepStatus::Completed);
                state.completed_weight += step.weight();
            }
            ProgressEvent::TilesPlanned(total) => {
                state.tiles_total = total;
            }
            ProgressEvent::TileCompleted => {
                state.tiles_completed = (state.tiles_completed + 1).min(state.tiles_total);
            }
            ProgressEvent::Completed => {
                state.job_state = JobState::Completed;
            }
            ProgressEvent::Failed(kind) => {
                state.job_state = JobState::Failed(kind);
            }
        }

        let snapshot = state.next_snapshot(now);
        trace!(
            state = %snapshot.state,
            percent = snapshot.overall_percent,
            "Progress updated"
        );

        state.history.push(snapshot.clone());
        self.sender.send_replace(snapshot.clone());
        snapshot
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.sender.borrow().clone()
    }

    /// Receiver notified on every new snapshot.
    pub fn subscribe(&self) -> ProgressReceiver {
        ProgressReceiver {
            inner: self.sender.subscribe(),
        }
    }

    /// Every snapshot produced so far, oldest first.
    pub fn history(&self) -> Vec<ProgressSnapshot> {
        self.state.lock().history.clone()
    }
}

impl Default for ProgressEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl EstimatorState {
    fn next_snapshot(&mut self, now: Instant) -> ProgressSnapshot {
        let elapsed = now.saturating_duration_since(self.started);

        let percent = match self.job_state {
            JobState::Completed => 100.0,
            JobState::Failed(_) => self.percent,
            JobState::Step(_, _) => {
                let raw = (self.completed_weight + self.tiling_weight()) * 100.0;
                self.percent.max(raw.min(MAX_RUNNING_PERCENT))
            }
        };
        self.percent = percent;

        let estimated_seconds_remaining = match self.job_state {
            JobState::Completed => Some(0.0),
            JobState::Failed(_) => None,
            JobState::Step(_, _) if percent > 0.0 => {
                Some(elapsed.as_secs_f64() * (100.0 - percent) / percent)
            }
            JobState::Step(_, _) => None,
        };

        ProgressSnapshot {
            state: self.job_state,
            overall_percent: percent,
            estimated_seconds_remaining,
            tiles_completed: self.tiles_completed,
            tiles_total: self.tiles_total,
            elapsed,
        }
    }

    /// Weight earned so far by tiles of a pyramid stage still in progress.
    fn tiling_weight(&self) -> f64 {
        let tiling_running = matches!(
            self.job_state,
            JobState::Step(PipelineStep::PyramidGeneration, StepStatus::Started)
        );
        if !tiling_running || self.tiles_total == 0 {
            return 0.0;
        }
        PipelineStep::PyramidGeneration.weight() * self.tiles_completed as f64
            / self.tiles_total as f64
    }
}

/// Subscriber side of a job's progress.
#[derive(Debug, Clone)]
pub struct ProgressReceiver {
    inner: watch::Receiver<ProgressSnapshot>,
}

impl ProgressReceiver {
    /// The latest snapshot, marking it seen.
    pub fn latest(&mut self) -> ProgressSnapshot {
        self.inner.borrow_and_update().clone()
    }

    /// The latest snapshot if it changed since last seen.
    pub fn poll(&mut self) -> Option<ProgressSnapshot> {
        match self.inner.has_changed() {
            Ok(true) => Some(self.latest()),
            _ => None,
        }
    }

    /// Wait for the next snapshot.
    ///
    /// Returns `None` once the job has ended and no more updates will come.
    pub async fn changed(&mut self) -> Option<ProgressSnapshot> {
        self.inner.changed().await.ok()?;
        Some(self.latest())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::time::Duration;

    fn run_until_tiling(estimator: &ProgressEstimator, start: Instant, tiles: u64) {
        estimator.record_at(ProgressEvent::StageStarted(PipelineStep::LoadingImage), start);
        estimator.record_at(ProgressEvent::TilesPlanned(tiles), start);
        estimator.record_at(ProgressEvent::StageCompleted(PipelineStep::LoadingImage), start);
        estimator.record_at(
            ProgressEvent::StageStarted(PipelineStep::PyramidGeneration),
            start,
        );
    }

    #[test]
    fn test_initial_snapshot() {
        let estimator = ProgressEstimator::new();
        let snapshot = estimator.snapshot();
        assert_eq!(snapshot.overall_percent, 0.0);
        assert_eq!(snapshot.estimated_seconds_remaining, None);
        assert_eq!(estimator.history().len(), 1);
    }

    #[test]
    fn test_tiles_split_pyramid_weight() {
        let start = Instant::now();
        let estimator = ProgressEstimator::starting_at(start);
        run_until_tiling(&estimator, start, 4);

        let snapshot = estimator.record_at(ProgressEvent::TileCompleted, start);
        // 5% loading + a quarter of 80% tiling
        assert!((snapshot.overall_percent - 25.0).abs() < 1e-9);
        assert_eq!(snapshot.tiles_completed, 1);
        assert_eq!(snapshot.tiles_total, 4);
    }

    #[test]
    fn test_eta_from_elapsed() {
        let start = Instant::now();
        let estimator = ProgressEstimator::starting_at(start);
        run_until_tiling(&estimator, start, 4);

        let snapshot =
            estimator.record_at(ProgressEvent::TileCompleted, start + Duration::from_secs(10));
        // 25% in 10 s leaves 30 s
        let eta = snapshot.estimated_seconds_remaining.unwrap();
        assert!((eta - 30.0).abs() < 1e-6);
        assert_eq!(snapshot.elapsed, Duration::from_secs(10));
    }

    #[test]
    fn test_hundred_only_when_completed() {
        let start = Instant::now();
        let estimator = ProgressEstimator::starting_at(start);
        run_until_tiling(&estimator, start, 1);
        estimator.record_at(ProgressEvent::TileCompleted, start);

        for step in &PipelineStep::ALL[1..] {
            estimator.record_at(ProgressEvent::StageStarted(*step), start);
            let snapshot = estimator.record_at(ProgressEvent::StageCompleted(*step), start);
            assert!(snapshot.overall_percent < 100.0);
        }

        let snapshot = estimator.record_at(ProgressEvent::Completed, start);
        assert_eq!(snapshot.overall_percent, 100.0);
        assert_eq!(snapshot.state, JobState::Completed);
        assert_eq!(snapshot.estimated_seconds_remaining, Some(0.0));
    }

    #[test]
    fn test_percent_does_not_drop_when_stage_completes() {
        let start = Instant::now();
        let estimator = ProgressEstimator::starting_at(start);
        run_until_tiling(&estimator, start, 2);
        estimator.record_at(ProgressEvent::TileCompleted, start);
        let mid = estimator.record_at(ProgressEvent::TileCompleted, start);

        let done = estimator.record_at(
            ProgressEvent::StageCompleted(PipelineStep::PyramidGeneration),
            start,
        );
        assert!(done.overall_percent >= mid.overall_percent);
    }

    #[test]
    fn test_failure_freezes_percent() {
        let start = Instant::now();
        let estimator = ProgressEstimator::starting_at(start);
        run_until_tiling(&estimator, start, 2);
        let before = estimator.record_at(ProgressEvent::TileCompleted, start);

        let failed = estimator.record_at(ProgressEvent::Failed(ErrorKind::Cancelled), start);
        assert_eq!(failed.state, JobState::Failed(ErrorKind::Cancelled));
        assert_eq!(failed.overall_percent, before.overall_percent);
        assert_eq!(failed.estimated_seconds_remaining, None);

        // Terminal: later events change nothing
        let after = estimator.record_at(ProgressEvent::Completed, start);
        assert_eq!(after, failed);
    }

    #[test]
    fn test_subscriber_sees_latest() {
        let estimator = ProgressEstimator::new();
        let mut receiver = estimator.subscribe();
        assert!(receiver.poll().is_none());

        estimator.record(ProgressEvent::StageStarted(PipelineStep::LoadingImage));
        estimator.record(ProgressEvent::StageCompleted(PipelineStep::LoadingImage));

        let latest = receiver.poll().unwrap();
        assert_eq!(
            latest.state,
            JobState::Step(PipelineStep::LoadingImage, StepStatus::Completed)
        );
        assert!(receiver.poll().is_none());
    }

    #[test]
    fn test_history_is_append_only() {
        let estimator = ProgressEstimator::new();
        estimator.record(ProgressEvent::StageStarted(PipelineStep::LoadingImage));
        estimator.record(ProgressEvent::TilesPlanned(5));

        let history = estimator.history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[2].tiles_total, 5);
    }
}
