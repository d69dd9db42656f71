//! Image processor - dimensions, format and EXIF enrichment

use async_trait::async_trait;
use image::ImageReader;
use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use super::exif_tags::read_exif;
use crate::error::ExtractionResult;
use crate::metadata::ImageMetadata;
use crate::traits::MediaProcessor;

pub struct ImageProcessor;

impl ImageProcessor {
    /// Synchronous probe. Reads the header for dimensions without decoding pixels, then
    /// rewinds for the EXIF block. Only the parts of the file it needs are read.
    pub fn probe(path: &Path) -> ExtractionResult<ImageMetadata> {
        let mut reader = BufReader::new(File::open(path)?);

        let image_reader = ImageReader::new(&mut reader).with_guessed_format()?;
        let format = image_reader
            .format()
            .map(|f| format!("{:?}", f))
            .unwrap_or_else(|| "unknown".to_string());
        let (width, height) = image_reader.into_dimensions()?;

        reader.seek(SeekFrom::Start(0))?;
        let exif = read_exif(&mut reader);

        Ok(ImageMetadata {
            width,
            height,
            format,
            exif_orientation: exif.orientation.filter(|o| *o != 1),
            taken_at: exif.taken_at,
            location: exif.location,
        })
    }
}

#[async_trait]
impl MediaProcessor for ImageProcessor {
    type Metadata = ImageMetadata;

    async fn extract_metadata(&self, path: &Path) -> ExtractionResult<ImageMetadata> {
        let path: PathBuf = path.to_path_buf();
        // Header parsing is blocking IO; run off the async pool.
        tokio::task::spawn_blocking(move || Self::probe(&path)).await?
    }
}
