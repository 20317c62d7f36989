//! Job requests, the generation job aggregate and output folder naming.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::coord::{BoundingBox, Projection};
use crate::error::{PyramidError, PyramidResult};
use crate::texture::TileEncoding;

/// Base name used when the source path has no usable file stem.
pub const DEFAULT_BASE_NAME: &str = "pyramid";

/// Timestamp layout of output folder names (year, day, month).
pub const OUTPUT_TIMESTAMP_FORMAT: &str = "%Y%d%m-%H%M%S";

/// Identifier of a job within one pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// What to generate and where.
#[derive(Debug, Clone)]
pub struct JobRequest {
    source: PathBuf,
    bounds: BoundingBox,
    projection: Projection,
    source_projection: Option<Projection>,
    output_root: PathBuf,
    base_name: Option<String>,
}

impl JobRequest {
    /// Create a request for `source` covering `bounds`.
    ///
    /// # Arguments
    ///
    /// * `source` - Path of the source raster
    /// * `bounds` - Geographic extent of the source raster
    /// * `projection` - Projection of the generated pyramid
    /// * `output_root` - Folder the job's output folder is created in
    pub fn new(
        source: impl Into<PathBuf>,
        bounds: BoundingBox,
        projection: Projection,
        output_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source: source.into(),
            bounds,
            projection,
            source_projection: None,
            output_root: output_root.into(),
            base_name: None,
        }
    }

    /// Declare the projection the source raster is in.
    ///
    /// Defaults to the pyramid projection.
    pub fn with_source_projection(mut self, projection: Projection) -> Self {
        self.source_projection = Some(projection);
        self
    }

    /// Override the output folder base name.
    pub fn with_base_name(mut self, name: impl Into<String>) -> Self {
        self.base_name = Some(name.into());
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    pub fn source_projection(&self) -> Projection {
        self.source_projection.unwrap_or(self.projection)
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Output folder base name: the explicit one, else the source file stem.
    pub fn base_name(&self) -> String {
        self.base_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .or_else(|| {
                self.source
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .filter(|stem| !stem.is_empty())
            })
            .unwrap_or_else(|| DEFAULT_BASE_NAME.to_string())
    }
}

/// A job after its source raster was loaded and its output folder created.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    id: JobId,
    output_id: String,
    output_dir: PathBuf,
    bounds: BoundingBox,
    projection: Projection,
    source_projection: Projection,
    source: PathBuf,
    max_level: u8,
    encoding: TileEncoding,
    created_at: DateTime<Local>,
}

impl GenerationJob {
    pub(crate) fn new(
        id: JobId,
        request: &JobRequest,
        output: OutputFolder,
        max_level: u8,
        encoding: TileEncoding,
    ) -> Self {
        Self {
            id,
            output_id: output.id,
            output_dir: output.path,
            bounds: *request.bounds(),
            projection: request.projection(),
            source_projection: request.source_projection(),
            source: request.source().to_path_buf(),
            max_level,
            encoding,
            created_at: output.created_at,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    /// Name of the output folder, also used for the descriptor file.
    pub fn output_id(&self) -> &str {
        &self.output_id
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    pub fn source_projection(&self) -> Projection {
        self.source_projection
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn max_level(&self) -> u8 {
        self.max_level
    }

    pub fn encoding(&self) -> TileEncoding {
        self.encoding
    }

    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }
}

/// A freshly created, empty output folder.
#[derive(Debug, Clone)]
pub struct OutputFolder {
    pub id: String,
    pub path: PathBuf,
    pub created_at: DateTime<Local>,
}

/// Output folder name for a base name, timestamp and sequence number.
pub fn output_folder_name(base: &str, timestamp: &DateTime<Local>, sequence: u32) -> String {
    format!(
        "{}_{}_{}",
        base,
        timestamp.format(OUTPUT_TIMESTAMP_FORMAT),
        sequence
    )
}

/// Create a new, uniquely named output folder under `root`.
///
/// Sequence numbers start at 1 and increase until a folder can be created;
/// creation itself is the uniqueness check, so concurrent jobs never share a
/// folder.
pub fn create_output_folder(
    root: &Path,
    base: &str,
    timestamp: DateTime<Local>,
) -> PyramidResult<OutputFolder> {
    fs::create_dir_all(root).map_err(|cause| PyramidError::OutputFolder {
        path: root.to_path_buf(),
        cause,
    })?;

    let mut sequence = 1u32;
    loop {
        let id = output_folder_name(base, &timestamp, sequence);
        let path = root.join(&id);

        match fs::create_dir(&path) {
            Ok(()) => {
                return Ok(OutputFolder {
                    id,
                    path,
                    created_at: timestamp,
                })
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && sequence < u32::MAX => {
                sequence += 1;
            }
            Err(cause) => return Err(PyramidError::OutputFolder { path, cause }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn timestamp() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 7, 14, 5, 9).unwrap()
    }

    #[test]
    fn test_folder_name_puts_day_before_month() {
        assert_eq!(
            output_folder_name("earth", &timestamp(), 1),
            "earth_20260703-140509_1"
        );
    }

    #[test]
    fn test_sequence_increments_on_collision() {
        let temp = TempDir::new().unwrap();

        let first = create_output_folder(temp.path(), "earth", timestamp()).unwrap();
        let second = create_output_folder(temp.path(), "earth", timestamp()).unwrap();

        assert_eq!(first.id, "earth_20260703-140509_1");
        assert_eq!(second.id, "earth_20260703-140509_2");
        assert!(first.path.is_dir());
        assert!(second.path.is_dir());
    }

    #[test]
    fn test_creates_missing_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("nested").join("out");

        let folder = create_output_folder(&root, "x", timestamp()).unwrap();
        assert!(folder.path.starts_with(&root));
    }

    #[test]
    fn test_base_name_defaults_to_file_stem() {
        let request = JobRequest::new(
            "/data/blue_marble.tif",
            BoundingBox::world(),
            Projection::EquiRectangular,
            "/out",
        );
        assert_eq!(request.base_name(), "blue_marble");
        assert_eq!(request.with_base_name("  ").base_name(), "blue_marble");
    }

    #[test]
    fn test_base_name_override_and_fallback() {
        let request = JobRequest::new("/", BoundingBox::world(), Projection::Mercator, "/out");
        assert_eq!(request.base_name(), DEFAULT_BASE_NAME);
        assert_eq!(request.with_base_name("moon").base_name(), "moon");
    }

    #[test]
    fn test_source_projection_defaults_to_projection() {
        let request = JobRequest::new("a.png", BoundingBox::world(), Projection::Mercator, "/out");
        assert_eq!(request.source_projection(), Projection::Mercator);

        let request = request.with_source_projection(Projection::EquiRectangular);
        assert_eq!(request.source_projection(), Projection::EquiRectangular);
        assert_eq!(request.projection(), Projection::Mercator);
    }

    #[test]
    fn test_job_id_display() {
        assert_eq!(JobId(7).to_string(), "job-7");
    }
}
