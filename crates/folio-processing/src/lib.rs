//! Folio Processing Library
//!
//! Metadata extraction for committed uploads: image dimensions and EXIF tags
//! (orientation, capture time, GPS), and video stream info through `ffprobe`.
//! Extraction only enriches a file; callers treat every error here as non-fatal.

pub mod error;
pub mod extractor;
#[cfg(feature = "image")]
pub mod image;
pub mod metadata;
pub mod traits;
#[cfg(feature = "video")]
pub mod video;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

// Re-export commonly used types
pub use error::{ExtractionError, ExtractionResult};
pub use extractor::MediaProbe;
#[cfg(feature = "image")]
pub use self::image::ImageProcessor;
pub use metadata::{GeoPoint, ImageMetadata, MediaMetadata, VideoMetadata};
pub use traits::{MediaProcessor, MetadataExtractor};
#[cfg(feature = "video")]
pub use self::video::VideoProcessor;
