//! Unified media metadata types

use chrono::{DateTime, Utc};
use folio_core::models::FileEnrichment;
use serde::{Deserialize, Serialize};

/// Metadata extracted from a committed upload, by media family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MediaMetadata {
    Image(ImageMetadata),
    Video(VideoMetadata),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Accepts only coordinates inside the WGS84 range.
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        valid.then_some(GeoPoint {
            latitude,
            longitude,
        })
    }
}

/// Image metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub exif_orientation: Option<u8>,
    pub taken_at: Option<DateTime<Utc>>,
    pub location: Option<GeoPoint>,
}

/// Video metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub duration: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub codec: Option<String>,
}

fn to_i32(value: u32) -> Option<i32> {
    i32::try_from(value).ok()
}

impl From<MediaMetadata> for FileEnrichment {
    fn from(metadata: MediaMetadata) -> Self {
        match metadata {
            MediaMetadata::Image(image) => FileEnrichment {
                width: to_i32(image.width),
                height: to_i32(image.height),
                orientation: image.exif_orientation.map(i16::from),
                taken_at: image.taken_at,
                latitude: image.location.map(|p| p.latitude),
                longitude: image.location.map(|p| p.longitude),
                ..Default::default()
            },
            MediaMetadata::Video(video) => FileEnrichment {
                width: video.width.and_then(to_i32),
                height: video.height.and_then(to_i32),
                duration_secs: video.duration,
                codec: video.codec,
                ..Default::default()
            },
        }
    }
}
