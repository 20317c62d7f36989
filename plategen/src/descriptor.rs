//! WTML descriptor emission.
//!
//! The descriptor is the entry point a viewer loads: it declares the extent
//! and projection of the pyramid and points at every level's plate file and
//! at the thumbnail, all by paths relative to the output folder.
//!
//! ```xml
//! <?xml version="1.0" encoding="utf-8"?>
//! <Folder Name="earth_20261810-120000_1" Group="Explorer">
//!   <ImageSet Name="earth_20261810-120000_1" DataSetType="Earth" ...>
//!     <Bounds North="90" West="-180" South="-90" East="180"/>
//!     <PlateFile Level="0" Path="level_0.plate" Tiles="1"/>
//!     <PlateFile Level="1" Path="level_1.plate" Tiles="4"/>
//!     <ThumbnailUrl>thumbnail.png</ThumbnailUrl>
//!   </ImageSet>
//! </Folder>
//! ```

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use tracing::info;

use crate::coord::{BoundingBox, Projection, TILE_SIZE};
use crate::error::{PyramidError, PyramidResult};
use crate::pipeline::GenerationJob;
use crate::plate::PlateFileRef;
use crate::texture::TileEncoding;

/// One `PlateFile` entry of the descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlateEntry {
    pub level: u8,
    /// Path relative to the output folder
    pub path: String,
    pub tile_count: usize,
}

/// Metadata describing one generated pyramid.
#[derive(Debug, Clone)]
pub struct DescriptorDocument {
    pub output_id: String,
    pub bounds: BoundingBox,
    pub projection: Projection,
    pub tile_size: u32,
    pub max_level: u8,
    pub encoding: TileEncoding,
    pub plates: Vec<PlateEntry>,
    /// Path relative to the output folder
    pub thumbnail: String,
    pub generated_at: DateTime<Local>,
}

/// Build the descriptor for a finished job.
///
/// Plate entries are ordered by level regardless of the order of `plates`.
pub fn emit(job: &GenerationJob, plates: &[PlateFileRef], thumbnail: &str) -> DescriptorDocument {
    let mut entries: Vec<PlateEntry> = plates
        .iter()
        .map(|plate| PlateEntry {
            level: plate.level,
            path: plate.file_name.clone(),
            tile_count: plate.tile_count,
        })
        .collect();
    entries.sort_by_key(|entry| entry.level);

    DescriptorDocument {
        output_id: job.output_id().to_string(),
        bounds: *job.bounds(),
        projection: job.projection(),
        tile_size: TILE_SIZE,
        max_level: job.max_level(),
        encoding: job.encoding(),
        plates: entries,
        thumbnail: thumbnail.to_string(),
        generated_at: Local::now(),
    }
}

impl DescriptorDocument {
    /// File name of the descriptor inside the output folder.
    pub fn file_name(&self) -> String {
        format!("{}.wtml", self.output_id)
    }

    /// Render the WTML document.
    pub fn to_xml(&self) -> PyramidResult<String> {
        let bytes = self
            .render()
            .map_err(|e| PyramidError::DescriptorWrite(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| PyramidError::DescriptorWrite(e.to_string()))
    }

    /// Render and write the document into `dir`.
    pub fn write_to(&self, dir: &Path) -> PyramidResult<PathBuf> {
        let xml = self.to_xml()?;
        let path = dir.join(self.file_name());
        fs::write(&path, xml).map_err(|e| {
            PyramidError::DescriptorWrite(format!("{}: {}", path.display(), e))
        })?;

        info!(path = %path.display(), levels = self.plates.len(), "Descriptor written");
        Ok(path)
    }

    fn render(&self) -> Result<Vec<u8>, quick_xml::Error> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

        let mut folder = BytesStart::new("Folder");
        folder.push_attribute(("Name", self.output_id.as_str()));
        folder.push_attribute(("Group", "Explorer"));
        writer.write_event(Event::Start(folder))?;

        let tile_levels = self.max_level.to_string();
        let tile_size = self.tile_size.to_string();
        let degrees = self.bounds.width().to_string();
        let file_type = format!(".{}", self.encoding.encoder().extension());
        let generated = self.generated_at.to_rfc3339();

        let mut image_set = BytesStart::new("ImageSet");
        image_set.push_attribute(("Name", self.output_id.as_str()));
        image_set.push_attribute(("DataSetType", "Earth"));
        image_set.push_attribute(("BandPass", "Visible"));
        image_set.push_attribute(("Projection", self.projection.name()));
        image_set.push_attribute(("TileSize", tile_size.as_str()));
        image_set.push_attribute(("BaseTileLevel", "0"));
        image_set.push_attribute(("TileLevels", tile_levels.as_str()));
        image_set.push_attribute(("BaseDegreesPerTile", degrees.as_str()));
        image_set.push_attribute(("FileType", file_type.as_str()));
        image_set.push_attribute(("Generated", generated.as_str()));
        writer.write_event(Event::Start(image_set))?;

        writer
            .create_element("Bounds")
            .with_attribute(("North", self.bounds.top().to_string().as_str()))
            .with_attribute(("West", self.bounds.left().to_string().as_str()))
            .with_attribute(("South", self.bounds.bottom().to_string().as_str()))
            .with_attribute(("East", self.bounds.right().to_string().as_str()))
            .write_empty()?;

        for plate in &self.plates {
            writer
                .create_element("PlateFile")
                .with_attribute(("Level", plate.level.to_string().as_str()))
                .with_attribute(("Path", plate.path.as_str()))
                .with_attribute(("Tiles", plate.tile_count.to_string().as_str()))
                .write_empty()?;
        }

        writer
            .create_element("ThumbnailUrl")
            .write_text_content(BytesText::new(&self.thumbnail))?;

        writer.write_event(Event::End(BytesEnd::new("ImageSet")))?;
        writer.write_event(Event::End(BytesEnd::new("Folder")))?;

        Ok(writer.into_inner().into_inner())
    }
}
