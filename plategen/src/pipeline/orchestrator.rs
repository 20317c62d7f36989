//! Job coordinator: drives one job through every pipeline stage.
//!
//! The coordinator runs on its own thread and owns all mutable job state.
//! CPU work (tile rendering, encoding, the thumbnail) is handed to the shared
//! rayon pool; results come back over channels and are consumed here, so
//! plate files are only ever touched from this thread.
//!
//! ```text
//!   rayon pool                       coordinator thread
//! ┌─────────────────┐  (tile, bytes)  ┌──────────────────┐
//! │ render + encode │ ──────────────► │ ReorderBuffer    │
//! │ (par_iter)      │                 │   ▼ row-major    │
//! └─────────────────┘                 │ PlateFileWriter  │
//! ┌─────────────────┐   thumbnail     │   ▼              │
//! │ downscale       │ ──────────────► │ ProgressEstimator│
//! └─────────────────┘                 └──────────────────┘
//! ```

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;

use chrono::Local;
use image::RgbaImage;
use rayon::prelude::*;
use rayon::ThreadPool;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::job::create_output_folder;
use super::reorder::ReorderBuffer;
use super::{GenerationJob, JobId, JobOutput, JobRequest, PipelineConfig};
use crate::coord::ProjectionMapper;
use crate::descriptor;
use crate::error::{PyramidError, PyramidResult};
use crate::plate::{PlateFileRef, PlateFileWriter};
use crate::progress::{PipelineStep, ProgressEstimator, ProgressEvent};
use crate::raster::SourceRaster;
use crate::texture::TileEncoder;
use crate::thumbnail::{self, THUMBNAIL_FILE_NAME};
use crate::tile::{
    tile_count, total_tile_count, LevelTiles, RasterTileGenerator, TileGenerator,
    TileGeneratorError, TileId,
};

/// Wraps the production tile generator, e.g. to inject faults in tests.
pub type GeneratorDecorator =
    Box<dyn FnOnce(Arc<RasterTileGenerator>) -> Arc<dyn TileGenerator> + Send>;

/// Tile payload or failure, sent from workers to the coordinator.
type TileResult = (TileId, Result<Vec<u8>, TileGeneratorError>);

/// State of one job, owned by its coordinator thread.
pub(crate) struct JobContext {
    id: JobId,
    request: JobRequest,
    config: PipelineConfig,
    pool: Arc<ThreadPool>,
    progress: Arc<ProgressEstimator>,
    cancellation: CancellationToken,
    decorator: Option<GeneratorDecorator>,
    output_dir: Option<PathBuf>,
}

impl JobContext {
    pub(crate) fn new(
        id: JobId,
        request: JobRequest,
        config: PipelineConfig,
        pool: Arc<ThreadPool>,
        progress: Arc<ProgressEstimator>,
        cancellation: CancellationToken,
        decorator: Option<GeneratorDecorator>,
    ) -> Self {
        Self {
            id,
            request,
            config,
            pool,
            progress,
            cancellation,
            decorator,
            output_dir: None,
        }
    }

    /// Run the job to a terminal state.
    ///
    /// On any failure, cancellation included, the output folder is removed
    /// before the terminal state is published.
    pub(crate) fn run(mut self) -> PyramidResult<JobOutput> {
        info!(
            job = %self.id,
            source = %self.request.source().display(),
            bounds = %self.request.bounds(),
            projection = %self.request.projection(),
            "Generation started"
        );

        let result = self.execute();

        match &result {
            Ok(output) => {
                self.progress.record(ProgressEvent::Completed);
                info!(
                    job = %self.id,
                    output = %output.output_dir.display(),
                    levels = output.plates.len(),
                    "Generation completed"
                );
            }
            Err(e) => {
                self.remove_output_folder();
                self.progress.record(ProgressEvent::Failed(e.kind()));
                if e.is_cancelled() {
                    info!(job = %self.id, "Generation cancelled");
                } else {
                    warn!(job = %self.id, error = %e, "Generation failed");
                }
            }
        }

        result
    }

    fn execute(&mut self) -> PyramidResult<JobOutput> {
        // Loading image
        self.stage_started(PipelineStep::LoadingImage);
        let bounds = *self.request.bounds();
        ProjectionMapper::new(bounds, self.request.projection())?;
        ProjectionMapper::new(bounds, self.request.source_projection())?;
        self.check_cancelled()?;

        let raster = Arc::new(SourceRaster::open(self.request.source())?);
        self.check_cancelled()?;

        let raster_generator = Arc::new(RasterTileGenerator::new(
            Arc::clone(&raster),
            bounds,
            self.request.projection(),
            self.request.source_projection(),
        )?);
        let max_level = raster_generator.max_level();
        let generator: Arc<dyn TileGenerator> = match self.decorator.take() {
            Some(decorate) => decorate(raster_generator),
            None => raster_generator,
        };

        let folder = create_output_folder(
            self.request.output_root(),
            &self.request.base_name(),
            Local::now(),
        )?;
        self.output_dir = Some(folder.path.clone());
        let job = GenerationJob::new(
            self.id,
            &self.request,
            folder,
            max_level,
            self.config.encoding(),
        );

        info!(
            job = %self.id,
            output = %job.output_dir().display(),
            max_level = max_level,
            tiles = total_tile_count(max_level),
            "Pyramid planned"
        );
        self.progress
            .record(ProgressEvent::TilesPlanned(total_tile_count(max_level)));
        self.stage_completed(PipelineStep::LoadingImage);

        let thumbnail_rx = self.spawn_thumbnail(Arc::clone(&raster));

        // Pyramid generation: tile, encode and append every level
        self.stage_started(PipelineStep::PyramidGeneration);
        let encoder = job.encoding().encoder();
        let mut writers = Vec::with_capacity(max_level as usize + 1);
        for level in 0..=max_level {
            self.check_cancelled()?;
            let mut writer = PlateFileWriter::open(job.output_dir(), level, job.encoding())
                .map_err(|cause| PyramidError::PlateFileIo { level, cause })?;
            self.generate_level(level, &generator, &encoder, &mut writer)?;
            writers.push(writer);
        }
        self.stage_completed(PipelineStep::PyramidGeneration);

        // Plate file generation: make every level durable
        self.stage_started(PipelineStep::PlateFileGeneration);
        let mut plates: Vec<PlateFileRef> = Vec::with_capacity(writers.len());
        for writer in writers {
            self.check_cancelled()?;
            let level = writer.level();
            let plate = writer
                .finalize()
                .map_err(|cause| PyramidError::PlateFileIo { level, cause })?;
            plates.push(plate);
        }
        self.stage_completed(PipelineStep::PlateFileGeneration);

        // Thumbnail
        self.stage_started(PipelineStep::ThumbnailGeneration);
        let image = self.await_thumbnail(&thumbnail_rx)?;
        let thumbnail_path = job.output_dir().join(THUMBNAIL_FILE_NAME);
        thumbnail::save(&image, &thumbnail_path).map_err(|cause| PyramidError::ThumbnailWrite {
            path: thumbnail_path.clone(),
            cause,
        })?;
        self.stage_completed(PipelineStep::ThumbnailGeneration);

        // Descriptor
        self.stage_started(PipelineStep::WtmlGeneration);
        self.check_cancelled()?;
        let document = descriptor::emit(&job, &plates, THUMBNAIL_FILE_NAME);
        let descriptor_path = document.write_to(job.output_dir())?;
        self.stage_completed(PipelineStep::WtmlGeneration);

        Ok(JobOutput {
            job_id: self.id,
            output_id: job.output_id().to_string(),
            output_dir: job.output_dir().to_path_buf(),
            max_level,
            plates,
            thumbnail: thumbnail_path,
            descriptor: descriptor_path,
        })
    }

    /// Render one level on the pool and append its tiles in row-major order.
    ///
    /// The level is dispatched in windows of [`PipelineConfig::append_window`]
    /// tiles; the next window starts once every tile of the current one is
    /// appended, so at most one window of payloads is ever held.
    fn generate_level(
        &self,
        level: u8,
        generator: &Arc<dyn TileGenerator>,
        encoder: &Arc<dyn TileEncoder>,
        writer: &mut PlateFileWriter,
    ) -> PyramidResult<()> {
        let count = tile_count(level);
        let window = self.config.append_window().max(1);
        debug!(
            job = %self.id,
            level = level,
            tiles = count,
            window = window,
            "Generating level"
        );

        // Stops the remaining tiles of this level however we leave
        let level_token = self.cancellation.child_token();
        let _stop_workers = level_token.clone().drop_guard();

        let mut reorder = ReorderBuffer::new();
        let mut max_pending = 0;
        let mut start = 0u64;
        while start < count {
            let end = (start + window).min(count);
            let rx = self.spawn_window(
                LevelTiles::window(level, start, end),
                generator,
                encoder,
                &level_token,
            );

            while reorder.next_expected() < end {
                self.check_cancelled()?;

                match rx.recv_timeout(self.config.poll_interval()) {
                    Ok((tile, Ok(payload))) => {
                        for (index, payload) in reorder.push(tile.index_in_level(), payload) {
                            writer
                                .append(TileId::from_index(level, index), &payload)
                                .map_err(|cause| PyramidError::PlateFileIo { level, cause })?;
                            self.progress.record(ProgressEvent::TileCompleted);
                        }
                        max_pending = max_pending.max(reorder.pending());
                    }
                    Ok((tile, Err(cause))) => {
                        return Err(PyramidError::TileGeneration {
                            level: tile.level(),
                            row: tile.row(),
                            col: tile.col(),
                            cause: cause.to_string(),
                        });
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => {
                        // Workers skip their tiles once cancelled
                        self.check_cancelled()?;
                        return Err(PyramidError::WorkerPool(format!(
                            "workers for level {} stopped after {} of {} tiles",
                            level,
                            reorder.next_expected(),
                            count
                        )));
                    }
                }
            }
            start = end;
        }

        debug!(
            job = %self.id,
            level = level,
            tiles = reorder.next_expected(),
            max_pending = max_pending,
            "Level complete"
        );
        Ok(())
    }

    /// Render and encode one window of tiles on the pool.
    fn spawn_window(
        &self,
        tiles: LevelTiles,
        generator: &Arc<dyn TileGenerator>,
        encoder: &Arc<dyn TileEncoder>,
        token: &CancellationToken,
    ) -> Receiver<TileResult> {
        let (tx, rx) = mpsc::channel();
        let tiles: Vec<TileId> = tiles.collect();
        let generator = Arc::clone(generator);
        let encoder = Arc::clone(encoder);
        let token = token.clone();

        self.pool.spawn(move || {
            tiles.into_par_iter().for_each_with(tx, |tx, tile| {
                if token.is_cancelled() {
                    return;
                }
                let result = generator
                    .generate(tile)
                    .and_then(|image| encoder.encode(&image).map_err(Into::into));
                // The coordinator may already have given up on this level
                let _ = tx.send((tile, result));
            });
        });
        rx
    }

    /// Start the thumbnail on the pool; it runs alongside tiling.
    fn spawn_thumbnail(&self, raster: Arc<SourceRaster>) -> Receiver<RgbaImage> {
        let (tx, rx) = mpsc::channel();
        let max_edge = self.config.thumbnail_max_edge();
        let token = self.cancellation.clone();

        self.pool.spawn(move || {
            if token.is_cancelled() {
                return;
            }
            let _ = tx.send(thumbnail::generate(&raster, max_edge));
        });
        rx
    }

    fn await_thumbnail(&self, rx: &Receiver<RgbaImage>) -> PyramidResult<RgbaImage> {
        loop {
            self.check_cancelled()?;
            match rx.recv_timeout(self.config.poll_interval()) {
                Ok(image) => return Ok(image),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    // A cancelled worker drops its sender without sending
                    self.check_cancelled()?;
                    return Err(PyramidError::WorkerPool(
                        "thumbnail worker exited without a result".to_string(),
                    ));
                }
            }
        }
    }

    fn check_cancelled(&self) -> PyramidResult<()> {
        if self.cancellation.is_cancelled() {
            return Err(PyramidError::Cancelled);
        }
        Ok(())
    }

    fn stage_started(&self, step: PipelineStep) {
        debug!(job = %self.id, step = %step, "Stage started");
        self.progress.record(ProgressEvent::StageStarted(step));
    }

    fn stage_completed(&self, step: PipelineStep) {
        debug!(job = %self.id, step = %step, "Stage completed");
        self.progress.record(ProgressEvent::StageCompleted(step));
    }

    fn remove_output_folder(&mut self) {
        let Some(dir) = self.output_dir.take() else {
            return;
        };
        match fs::remove_dir_all(&dir) {
            Ok(()) => debug!(job = %self.id, path = %dir.display(), "Removed output folder"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                job = %self.id,
                path = %dir.display(),
                error = %e,
                "Failed to remove output folder"
            ),
        }
    }
}
