//! Pipeline tuning knobs.

use std::time::Duration;

use crate::texture::TileEncoding;
use crate::thumbnail::DEFAULT_THUMBNAIL_MAX_EDGE;

/// Default interval at which the coordinator checks for cancellation while
/// waiting on workers.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Tiles each worker may have rendered ahead of the ordered append.
pub const TILES_IN_FLIGHT_PER_WORKER: usize = 4;

/// Configuration shared by every job of a [`PyramidPipeline`](super::PyramidPipeline).
///
/// # Example
///
/// ```
/// use plategen::pipeline::PipelineConfig;
/// use plategen::texture::TileEncoding;
///
/// let config = PipelineConfig::default()
///     .with_threads(4)
///     .with_encoding(TileEncoding::Deflate);
/// assert_eq!(config.worker_threads(), 4);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    threads: usize,
    thumbnail_max_edge: u32,
    encoding: TileEncoding,
    poll_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            thumbnail_max_edge: DEFAULT_THUMBNAIL_MAX_EDGE,
            encoding: TileEncoding::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl PipelineConfig {
    /// Number of worker threads; 0 uses every available core.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Longer edge of the thumbnail in pixels.
    pub fn with_thumbnail_max_edge(mut self, edge: u32) -> Self {
        self.thumbnail_max_edge = edge.max(1);
        self
    }

    pub fn with_encoding(mut self, encoding: TileEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Upper bound on how long the coordinator waits before re-checking
    /// cancellation.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Configured thread count (0 = auto).
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Thread count actually used for the worker pool.
    pub fn worker_threads(&self) -> usize {
        if self.threads > 0 {
            return self.threads;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    /// Most tiles of a level rendered but not yet appended at any time.
    pub fn append_window(&self) -> u64 {
        (self.worker_threads() * TILES_IN_FLIGHT_PER_WORKER) as u64
    }

    pub fn thumbnail_max_edge(&self) -> u32 {
        self.thumbnail_max_edge
    }

    pub fn encoding(&self) -> TileEncoding {
        self.encoding
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}
