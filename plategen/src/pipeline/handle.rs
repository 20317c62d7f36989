//! Handle to a running generation job.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::JobId;
use crate::error::{PyramidError, PyramidResult};
use crate::plate::PlateFileRef;
use crate::progress::{ProgressEstimator, ProgressReceiver, ProgressSnapshot};

/// Artifacts of a completed job.
#[derive(Debug, Clone, Serialize)]
pub struct JobOutput {
    pub job_id: JobId,
    pub output_id: String,
    pub output_dir: PathBuf,
    pub max_level: u8,
    /// One finalized plate file per level, level 0 first
    pub plates: Vec<PlateFileRef>,
    pub thumbnail: PathBuf,
    pub descriptor: PathBuf,
}

/// Handle to a job started with [`PyramidPipeline::start`](super::PyramidPipeline::start).
///
/// Provides progress snapshots, cancellation and the final result.
#[derive(Debug)]
pub struct JobHandle {
    id: JobId,
    cancellation: CancellationToken,
    progress: Arc<ProgressEstimator>,
    thread: JoinHandle<PyramidResult<JobOutput>>,
}

impl JobHandle {
    pub(crate) fn new(
        id: JobId,
        cancellation: CancellationToken,
        progress: Arc<ProgressEstimator>,
        thread: JoinHandle<PyramidResult<JobOutput>>,
    ) -> Self {
        Self {
            id,
            cancellation,
            progress,
            thread,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    /// Request cancellation.
    ///
    /// Cancellation is cooperative: tiles already being rendered finish, then
    /// the job cleans up and fails with [`PyramidError::Cancelled`].
    pub fn cancel(&self) {
        info!(job = %self.id, "Cancellation requested");
        self.cancellation.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Latest progress snapshot.
    pub fn snapshot(&self) -> ProgressSnapshot {
        self.progress.snapshot()
    }

    /// Receiver notified on every progress update.
    pub fn subscribe(&self) -> ProgressReceiver {
        self.progress.subscribe()
    }

    /// Every snapshot produced so far.
    pub fn history(&self) -> Vec<ProgressSnapshot> {
        self.progress.history()
    }

    /// Whether the job has reached a terminal state.
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Block until the job ends and return its result.
    pub fn wait(self) -> PyramidResult<JobOutput> {
        self.thread
            .join()
            .map_err(|_| PyramidError::WorkerPool(format!("coordinator of {} panicked", self.id)))?
    }
}
