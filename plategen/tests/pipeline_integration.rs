//! Integration tests for the pyramid generation pipeline.
//!
//! These tests run complete jobs against real files:
//! - Source raster → plate files, thumbnail and descriptor
//! - Cancellation and tile failures leave no output behind
//! - Progress snapshots over the lifetime of a job
//!
//! Run with: `cargo test --test pipeline_integration`

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

use image::{Rgba, RgbaImage};
use tempfile::TempDir;

use plategen::coord::{BoundingBox, Projection};
use plategen::error::{ErrorKind, PyramidError};
use plategen::pipeline::{JobHandle, JobRequest, PipelineConfig, PyramidPipeline};
use plategen::plate::PlateFileReader;
use plategen::progress::{JobState, ProgressReceiver};
use plategen::texture::TileEncoding;
use plategen::tile::{RasterTileGenerator, TileGenerator, TileGeneratorError, TileId};

// ============================================================================
// Helper Functions
// ============================================================================

/// Write a `width × height` PNG with a colour gradient and return its path.
fn write_source(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
            255,
        ])
    })
    .save(&path)
    .unwrap();
    path
}

fn pipeline() -> PyramidPipeline {
    PyramidPipeline::new(PipelineConfig::default().with_threads(2)).unwrap()
}

fn world_request(source: &Path, output_root: &Path) -> JobRequest {
    JobRequest::new(
        source,
        BoundingBox::world(),
        Projection::EquiRectangular,
        output_root,
    )
}

/// Number of entries in a directory; a missing directory counts as empty.
fn entry_count(dir: &Path) -> usize {
    fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

/// Block until the job has appended at least `tiles` tiles.
fn wait_for_tiles(handle: &JobHandle, tiles: u64) {
    let deadline = Instant::now() + Duration::from_secs(30);
    while handle.snapshot().tiles_completed < tiles {
        assert!(Instant::now() < deadline, "job made no progress");
        assert!(!handle.is_finished(), "job finished early");
        thread::sleep(Duration::from_millis(5));
    }
}

/// Renders tiles slowly so a test can act mid-job.
struct SlowGenerator {
    inner: Arc<RasterTileGenerator>,
    delay: Duration,
}

impl TileGenerator for SlowGenerator {
    fn generate(&self, tile: TileId) -> Result<RgbaImage, TileGeneratorError> {
        thread::sleep(self.delay);
        self.inner.generate(tile)
    }

    fn max_level(&self) -> u8 {
        self.inner.max_level()
    }
}

/// Fails on exactly one tile.
struct FailingGenerator {
    inner: Arc<RasterTileGenerator>,
    fail_at: TileId,
}

impl TileGenerator for FailingGenerator {
    fn generate(&self, tile: TileId) -> Result<RgbaImage, TileGeneratorError> {
        if tile == self.fail_at {
            return Err(TileGeneratorError::Internal("injected fault".to_string()));
        }
        self.inner.generate(tile)
    }

    fn max_level(&self) -> u8 {
        self.inner.max_level()
    }
}

/// Tracks how many tiles have been rendered ahead of the plate append.
struct CountingGenerator {
    inner: Arc<RasterTileGenerator>,
    progress: Arc<OnceLock<ProgressReceiver>>,
    started: AtomicU64,
    max_ahead: Arc<AtomicU64>,
}

impl TileGenerator for CountingGenerator {
    fn generate(&self, tile: TileId) -> Result<RgbaImage, TileGeneratorError> {
        let started = self.started.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(progress) = self.progress.get() {
            let appended = progress.clone().latest().tiles_completed;
            self.max_ahead
                .fetch_max(started.saturating_sub(appended), Ordering::SeqCst);
        }
        thread::sleep(Duration::from_millis(1));
        self.inner.generate(tile)
    }

    fn max_level(&self) -> u8 {
        self.inner.max_level()
    }
}

// ============================================================================
// End-to-end
// ============================================================================

#[test]
fn test_world_raster_produces_three_levels() {
    let temp = TempDir::new().unwrap();
    let source = write_source(temp.path(), "world.png", 1024, 512);
    let root = temp.path().join("out");

    let output = pipeline().run(world_request(&source, &root)).unwrap();

    assert_eq!(output.max_level, 2);
    assert_eq!(output.plates.len(), 3);
    assert!(output.output_id.starts_with("world_"));
    assert!(output.output_id.ends_with("_1"));
    assert_eq!(entry_count(&root), 1);

    // Exactly: three plates, one thumbnail, one descriptor
    let mut names: Vec<String> = fs::read_dir(&output.output_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    let descriptor_name = format!("{}.wtml", output.output_id);
    let mut expected = vec![
        descriptor_name.clone(),
        "level_0.plate".to_string(),
        "level_1.plate".to_string(),
        "level_2.plate".to_string(),
        "thumbnail.png".to_string(),
    ];
    expected.sort();
    assert_eq!(names, expected);

    for (level, plate) in output.plates.iter().enumerate() {
        let reader = PlateFileReader::open(&plate.path).unwrap();
        assert_eq!(reader.header().level as usize, level);
        assert_eq!(reader.index().slots.len(), 1 << (2 * level));

        let tile = reader.decode_tile(0, 0).unwrap();
        assert_eq!(tile.dimensions(), (256, 256));
    }

    let thumbnail = image::open(&output.thumbnail).unwrap();
    assert_eq!((thumbnail.width(), thumbnail.height()), (96, 48));

    let xml = fs::read_to_string(&output.descriptor).unwrap();
    for level in 0..=2 {
        assert!(xml.contains(&format!("Path=\"level_{}.plate\"", level)));
    }
    assert!(xml.contains("thumbnail.png"));
}

#[test]
fn test_level_two_tile_matches_source_pixels() {
    let temp = TempDir::new().unwrap();
    let source = write_source(temp.path(), "grad.png", 1024, 1024);
    let root = temp.path().join("out");

    let output = pipeline().run(world_request(&source, &root)).unwrap();
    let reader = PlateFileReader::open(&output.plates[2].path).unwrap();

    // At the deepest level a 1024 px source maps pixel for pixel
    let tile = reader.decode_tile(1, 2).unwrap();
    let expected_x = 2 * 256 + 10;
    let expected_y = 256 + 20;
    assert_eq!(
        *tile.get_pixel(10, 20),
        Rgba([
            (expected_x * 255 / 1024) as u8,
            (expected_y * 255 / 1024) as u8,
            128,
            255
        ])
    );
}

#[test]
fn test_deflate_encoding_and_mercator_output() {
    let temp = TempDir::new().unwrap();
    let source = write_source(temp.path(), "merc.png", 512, 256);
    let root = temp.path().join("out");

    let pipeline = PyramidPipeline::new(
        PipelineConfig::default()
            .with_threads(2)
            .with_encoding(TileEncoding::Deflate)
            .with_thumbnail_max_edge(64),
    )
    .unwrap();
    let request = JobRequest::new(
        &source,
        BoundingBox::new(80.0, -180.0, -80.0, 180.0).unwrap(),
        Projection::Mercator,
        &root,
    )
    .with_source_projection(Projection::EquiRectangular)
    .with_base_name("reprojected");

    let output = pipeline.run(request).unwrap();
    assert_eq!(output.max_level, 1);
    assert!(output.output_id.starts_with("reprojected_"));

    let reader = PlateFileReader::open(&output.plates[1].path).unwrap();
    assert_eq!(reader.header().encoding, TileEncoding::Deflate);
    assert_eq!(reader.decode_tile(1, 1).unwrap().dimensions(), (256, 256));

    let xml = fs::read_to_string(&output.descriptor).unwrap();
    assert!(xml.contains("Projection=\"Mercator\""));

    let thumbnail = image::open(&output.thumbnail).unwrap();
    assert_eq!((thumbnail.width(), thumbnail.height()), (64, 32));
}

#[test]
fn test_concurrent_jobs_get_separate_folders() {
    let temp = TempDir::new().unwrap();
    let source = write_source(temp.path(), "same.png", 256, 256);
    let root = temp.path().join("out");
    let pipeline = pipeline();

    let first = pipeline.start(world_request(&source, &root)).unwrap();
    let second = pipeline.start(world_request(&source, &root)).unwrap();

    let a = first.wait().unwrap();
    let b = second.wait().unwrap();
    assert_ne!(a.output_dir, b.output_dir);
    assert_eq!(entry_count(&root), 2);
}

#[test]
fn test_tiles_ahead_of_append_stay_within_window() {
    let temp = TempDir::new().unwrap();
    let source = write_source(temp.path(), "deep.png", 4096, 4096);
    let root = temp.path().join("out");
    let pipeline = PyramidPipeline::new(PipelineConfig::default().with_threads(4)).unwrap();

    let progress = Arc::new(OnceLock::new());
    let max_ahead = Arc::new(AtomicU64::new(0));
    let handle = {
        let progress = Arc::clone(&progress);
        let max_ahead = Arc::clone(&max_ahead);
        pipeline
            .start_with_generator(world_request(&source, &root), move |inner| {
                Arc::new(CountingGenerator {
                    inner,
                    progress,
                    started: AtomicU64::new(0),
                    max_ahead,
                })
            })
            .unwrap()
    };
    progress.set(handle.subscribe()).unwrap();

    let output = handle.wait().unwrap();
    // Level 4 alone has 256 tiles
    assert_eq!(output.max_level, 4);

    let window = pipeline.config().append_window();
    let observed = max_ahead.load(Ordering::SeqCst);
    assert!(observed >= 1);
    assert!(
        observed <= window,
        "{} tiles rendered ahead of the append, window is {}",
        observed,
        window
    );
}

// ============================================================================
// Failure and cancellation
// ============================================================================

#[test]
fn test_cancel_mid_job_leaves_nothing() {
    let temp = TempDir::new().unwrap();
    let source = write_source(temp.path(), "big.png", 2048, 2048);
    let root = temp.path().join("out");
    let pipeline = pipeline();

    let handle = pipeline
        .start_with_generator(world_request(&source, &root), |inner| {
            Arc::new(SlowGenerator {
                inner,
                delay: Duration::from_millis(20),
            })
        })
        .unwrap();
    let mut progress = handle.subscribe();

    wait_for_tiles(&handle, 2);
    assert!(pipeline.cancel(handle.id()));

    let err = handle.wait().unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(entry_count(&root), 0);
    assert_eq!(
        progress.latest().state,
        JobState::Failed(ErrorKind::Cancelled)
    );
    assert!(pipeline.active_jobs().is_empty());
}

#[test]
fn test_cancel_through_handle() {
    let temp = TempDir::new().unwrap();
    let source = write_source(temp.path(), "big.png", 1024, 1024);
    let root = temp.path().join("out");

    let handle = pipeline()
        .start_with_generator(world_request(&source, &root), |inner| {
            Arc::new(SlowGenerator {
                inner,
                delay: Duration::from_millis(20),
            })
        })
        .unwrap();

    wait_for_tiles(&handle, 1);
    handle.cancel();

    assert!(matches!(handle.wait(), Err(PyramidError::Cancelled)));
    assert_eq!(entry_count(&root), 0);
}

#[test]
fn test_tile_failure_aborts_with_position() {
    let temp = TempDir::new().unwrap();
    let source = write_source(temp.path(), "fail.png", 1024, 1024);
    let root = temp.path().join("out");

    let handle = pipeline()
        .start_with_generator(world_request(&source, &root), |inner| {
            Arc::new(FailingGenerator {
                inner,
                fail_at: TileId::new(2, 1, 3),
            })
        })
        .unwrap();
    let mut progress = handle.subscribe();

    match handle.wait() {
        Err(PyramidError::TileGeneration {
            level, row, col, ..
        }) => {
            assert_eq!((level, row, col), (2, 1, 3));
        }
        other => panic!("expected tile failure, got {:?}", other.map(|o| o.output_dir)),
    }

    assert_eq!(entry_count(&root), 0);
    assert_eq!(
        progress.latest().state,
        JobState::Failed(ErrorKind::TileGeneration)
    );
}

#[test]
fn test_bounds_beyond_mercator_range_are_rejected() {
    let temp = TempDir::new().unwrap();
    let source = write_source(temp.path(), "polar.png", 256, 256);
    let root = temp.path().join("out");

    let request = JobRequest::new(
        &source,
        BoundingBox::new(89.9, -10.0, 86.0, 10.0).unwrap(),
        Projection::Mercator,
        &root,
    );

    let err = pipeline().run(request).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidBounds);
    assert!(!root.exists());
}

// ============================================================================
// Progress
// ============================================================================

#[test]
fn test_progress_is_monotonic_and_completes_at_hundred() {
    let temp = TempDir::new().unwrap();
    let source = write_source(temp.path(), "progress.png", 1024, 512);
    let root = temp.path().join("out");

    let handle = pipeline().start(world_request(&source, &root)).unwrap();

    let deadline = Instant::now() + Duration::from_secs(60);
    while !handle.is_finished() {
        assert!(Instant::now() < deadline, "job did not finish");
        thread::sleep(Duration::from_millis(5));
    }
    let history = handle.history();
    handle.wait().unwrap();

    for pair in history.windows(2) {
        assert!(
            pair[1].overall_percent >= pair[0].overall_percent,
            "progress dropped from {} to {}",
            pair[0].overall_percent,
            pair[1].overall_percent
        );
    }
    for snapshot in &history {
        if snapshot.overall_percent >= 100.0 {
            assert_eq!(snapshot.state, JobState::Completed);
        }
    }

    let last = history.last().unwrap();
    assert_eq!(last.state, JobState::Completed);
    assert_eq!(last.overall_percent, 100.0);
    assert_eq!(last.tiles_completed, 21);
    assert_eq!(last.tiles_total, 21);
}
