//! Pyramid generation pipeline.
//!
//! A [`PyramidPipeline`] owns a worker pool and a registry of running jobs.
//! Each job moves through the stages
//!
//! ```text
//! LoadingImage → PyramidGeneration → PlateFileGeneration
//!              → ThumbnailGeneration → WtmlGeneration → Completed
//! ```
//!
//! and may fail (or be cancelled) from any of them, in which case its output
//! folder is removed. Progress is observed through the [`JobHandle`].
//!
//! # Example
//!
//! ```no_run
//! use plategen::coord::{BoundingBox, Projection};
//! use plategen::pipeline::{JobRequest, PipelineConfig, PyramidPipeline};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = PyramidPipeline::new(PipelineConfig::default())?;
//! let request = JobRequest::new(
//!     "world.png",
//!     BoundingBox::world(),
//!     Projection::EquiRectangular,
//!     "out",
//! );
//!
//! let handle = pipeline.start(request)?;
//! println!("{:.1}%", handle.snapshot().overall_percent);
//! let output = handle.wait()?;
//! println!("Wrote {}", output.descriptor.display());
//! # Ok(())
//! # }
//! ```

mod config;
mod handle;
mod job;
mod orchestrator;
mod reorder;

pub use config::{PipelineConfig, DEFAULT_POLL_INTERVAL};
pub use handle::{JobHandle, JobOutput};
pub use job::{
    create_output_folder, output_folder_name, GenerationJob, JobId, JobRequest, OutputFolder,
    DEFAULT_BASE_NAME, OUTPUT_TIMESTAMP_FORMAT,
};
pub use orchestrator::GeneratorDecorator;
pub use reorder::ReorderBuffer;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{PyramidError, PyramidResult};
use crate::progress::ProgressEstimator;
use crate::tile::{RasterTileGenerator, TileGenerator};
use orchestrator::JobContext;

/// Runs generation jobs on a shared worker pool.
pub struct PyramidPipeline {
    config: PipelineConfig,
    pool: Arc<ThreadPool>,
    jobs: Arc<Mutex<HashMap<JobId, CancellationToken>>>,
    next_id: AtomicU64,
}

impl PyramidPipeline {
    /// Create a pipeline and its worker pool.
    ///
    /// # Errors
    ///
    /// Returns [`PyramidError::WorkerPool`] if the pool cannot be built.
    pub fn new(config: PipelineConfig) -> PyramidResult<Self> {
        let threads = config.worker_threads();
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("plategen-worker-{}", i))
            .build()
            .map_err(|e| PyramidError::WorkerPool(e.to_string()))?;

        info!(
            threads = threads,
            encoding = %config.encoding(),
            "Pipeline ready"
        );

        Ok(Self {
            config,
            pool: Arc::new(pool),
            jobs: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Start a job in the background.
    pub fn start(&self, request: JobRequest) -> PyramidResult<JobHandle> {
        self.spawn(request, None)
    }

    /// Start a job whose tile generator is wrapped by `decorate`.
    pub fn start_with_generator<F>(&self, request: JobRequest, decorate: F) -> PyramidResult<JobHandle>
    where
        F: FnOnce(Arc<RasterTileGenerator>) -> Arc<dyn TileGenerator> + Send + 'static,
    {
        self.spawn(request, Some(Box::new(decorate)))
    }

    /// Run a job to completion on the calling thread's behalf.
    pub fn run(&self, request: JobRequest) -> PyramidResult<JobOutput> {
        self.start(request)?.wait()
    }

    /// Cancel a running job.
    ///
    /// Returns `false` if no job with this id is running.
    pub fn cancel(&self, id: JobId) -> bool {
        match self.jobs.lock().get(&id) {
            Some(token) => {
                info!(job = %id, "Cancellation requested");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Ids of the jobs currently running.
    pub fn active_jobs(&self) -> Vec<JobId> {
        let mut ids: Vec<JobId> = self.jobs.lock().keys().copied().collect();
        ids.sort();
        ids
    }

    fn spawn(
        &self,
        request: JobRequest,
        decorator: Option<GeneratorDecorator>,
    ) -> PyramidResult<JobHandle> {
        let id = JobId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let cancellation = CancellationToken::new();
        let progress = Arc::new(ProgressEstimator::new());

        let context = JobContext::new(
            id,
            request,
            self.config.clone(),
            Arc::clone(&self.pool),
            Arc::clone(&progress),
            cancellation.clone(),
            decorator,
        );

        self.jobs.lock().insert(id, cancellation.clone());
        let jobs = Arc::clone(&self.jobs);

        let thread = thread::Builder::new()
            .name(format!("plategen-{}", id))
            .spawn(move || {
                let result = context.run();
                jobs.lock().remove(&id);
                debug!(job = %id, "Job unregistered");
                result
            });

        match thread {
            Ok(thread) => Ok(JobHandle::new(id, cancellation, progress, thread)),
            Err(e) => {
                self.jobs.lock().remove(&id);
                Err(PyramidError::WorkerPool(format!(
                    "failed to start coordinator: {}",
                    e
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::{BoundingBox, Projection};
    use crate::error::ErrorKind;
    use crate::progress::JobState;
    use tempfile::TempDir;

    fn missing_source_request(temp: &TempDir) -> JobRequest {
        JobRequest::new(
            temp.path().join("missing.png"),
            BoundingBox::world(),
            Projection::EquiRectangular,
            temp.path().join("out"),
        )
    }

    #[test]
    fn test_missing_source_fails_without_output() {
        let temp = TempDir::new().unwrap();
        let pipeline = PyramidPipeline::new(PipelineConfig::default().with_threads(2)).unwrap();

        let handle = pipeline.start(missing_source_request(&temp)).unwrap();
        let mut progress = handle.subscribe();

        let err = handle.wait().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceRasterDecode);
        assert!(!temp.path().join("out").exists());
        assert_eq!(
            progress.latest().state,
            JobState::Failed(ErrorKind::SourceRasterDecode)
        );
    }

    #[test]
    fn test_registry_forgets_finished_jobs() {
        let temp = TempDir::new().unwrap();
        let pipeline = PyramidPipeline::new(PipelineConfig::default().with_threads(1)).unwrap();

        let handle = pipeline.start(missing_source_request(&temp)).unwrap();
        let id = handle.id();
        assert_eq!(id, JobId(1));
        let _ = handle.wait();

        assert!(pipeline.active_jobs().is_empty());
        assert!(!pipeline.cancel(id));
    }

    #[test]
    fn test_job_ids_increase() {
        let temp = TempDir::new().unwrap();
        let pipeline = PyramidPipeline::new(PipelineConfig::default().with_threads(1)).unwrap();

        let first = pipeline.start(missing_source_request(&temp)).unwrap();
        let second = pipeline.start(missing_source_request(&temp)).unwrap();
        assert!(second.id() > first.id());

        let _ = first.wait();
        let _ = second.wait();
    }

    #[test]
    fn test_run_blocks_until_done() {
        let temp = TempDir::new().unwrap();
        let pipeline = PyramidPipeline::new(PipelineConfig::default().with_threads(1)).unwrap();

        let err = pipeline.run(missing_source_request(&temp)).unwrap_err();
        assert!(matches!(err, PyramidError::SourceRasterDecode { .. }));
    }
}
