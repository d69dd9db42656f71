use async_trait::async_trait;
use folio_core::MediaType;
use std::path::Path;
use std::time::Instant;

use crate::error::{ExtractionError, ExtractionResult};
#[cfg(feature = "image")]
use crate::image::ImageProcessor;
use crate::metadata::MediaMetadata;
#[cfg(any(feature = "image", feature = "video"))]
use crate::traits::MediaProcessor;
use crate::traits::MetadataExtractor;
#[cfg(feature = "video")]
use crate::video::VideoProcessor;

/// Default extractor: EXIF probe for images, ffprobe for videos.
pub struct MediaProbe {
    #[cfg(feature = "video")]
    video: VideoProcessor,
}

impl MediaProbe {
    pub fn new(ffprobe_path: String) -> Self {
        #[cfg(not(feature = "video"))]
        let _ = ffprobe_path;
        Self {
            #[cfg(feature = "video")]
            video: VideoProcessor::new(ffprobe_path),
        }
    }
}

#[async_trait]
impl MetadataExtractor for MediaProbe {
    #[tracing::instrument(skip(self, path), fields(path = %path.display()))]
    async fn extract(
        &self,
        media_type: MediaType,
        path: &Path,
    ) -> ExtractionResult<MediaMetadata> {
        let start = Instant::now();
        let metadata = match media_type {
            #[cfg(feature = "image")]
            MediaType::Image => MediaMetadata::Image(ImageProcessor.extract_metadata(path).await?),
            #[cfg(feature = "video")]
            MediaType::Video => MediaMetadata::Video(self.video.extract_metadata(path).await?),
            #[allow(unreachable_patterns)]
            other => return Err(ExtractionError::Unsupported(other)),
        };

        tracing::debug!(
            media_type = %media_type,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Media metadata extracted"
        );

        Ok(metadata)
    }
}

#[cfg(all(test, feature = "image"))]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_dispatches_images_to_image_probe() {
        let file = NamedTempFile::new().unwrap();
        RgbaImage::from_pixel(16, 9, Rgba([0, 0, 255, 255]))
            .save_with_format(file.path(), ImageFormat::Png)
            .unwrap();

        let probe = MediaProbe::new("ffprobe".to_string());
        let metadata = probe.extract(MediaType::Image, file.path()).await.unwrap();

        match metadata {
            MediaMetadata::Image(image) => assert_eq!((image.width, image.height), (16, 9)),
            other => panic!("Expected image metadata, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_corrupt_image_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"garbage").unwrap();

        let probe = MediaProbe::new("ffprobe".to_string());
        let result = probe.extract(MediaType::Image, file.path()).await;
        assert!(result.is_err());
    }
}
